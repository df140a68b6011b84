/// Chartdeck TUI - terminal front end for the chart API
///
/// The library holds everything the `chartdeck` binary draws and routes:
/// - `app`: the orchestrator owning settings, chart view, KPI preferences and the KPI tooltip
/// - `sidebar`: the settings form and its unsaved-changes draft
/// - `ui`: ratatui rendering of every panel
pub mod app;
pub mod sidebar;
pub mod ui;

pub use app::{App, CardHit, Focus};
pub use sidebar::{Field, Sidebar, SidebarAction};
