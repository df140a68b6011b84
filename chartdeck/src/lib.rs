//! # Chartdeck
//! Core of a stock-charting dashboard: indicator configuration, KPI models, tooltip placement
//! and the debounced chart refresh pipeline. Rendering lives in `chartdeck-tui`.
//!
//! The crate provides:
//! - [`Settings`](settings::Settings): ticker/interval/chart-type plus the indicator selection,
//!   its parameter map and its panel map, kept mutually consistent.
//! - [`compute_position`](placement::compute_position): viewport-aware tooltip placement with
//!   fallback directions and on-screen clamping.
//! - [`Tooltip`](tooltip::Tooltip): the open/positioning/visible dismissal state machine.
//! - [`spawn_refresh`](refresh::spawn_refresh): debounced, sequence-tagged chart fetching.

/// Runtime configuration read from the environment.
pub mod config;

/// All errors generated in `chartdeck`, plus the user facing error classification.
pub mod error;

/// Chart request/response contract and the [`ChartSource`](fetch::ChartSource) abstraction.
pub mod fetch;

/// Static indicator catalog and the [`IndicatorEntry`](indicator::IndicatorEntry) variant.
pub mod indicator;

/// KPI records, value formatting and grouping.
pub mod kpi;

/// Tooltip placement geometry.
pub mod placement;

/// Persisted KPI display preferences.
pub mod preferences;

/// Debounced chart refresh and stale-response reconciliation.
pub mod refresh;

/// The settings aggregate and the sidebar draft state machine.
pub mod settings;

/// Tooltip dismissal state machine and viewport event subscriptions.
pub mod tooltip;

pub use config::DashboardConfig;
pub use error::{ChartError, PreferenceError, SettingsError, UserMessage};
pub use fetch::{ChartRequest, ChartResponse, ChartSource, HttpChartSource};
pub use indicator::{IndicatorEntry, IndicatorParams, IndicatorRequest, Panel};
pub use kpi::{KpiData, KpiRecord, KpiValue};
pub use placement::{Placement, PlacementConfig, Rect, Size, TooltipPosition, compute_position};
pub use preferences::{JsonFileStore, KpiPreferences, PreferenceStore};
pub use refresh::{ChartView, RefreshEvent, RefreshHandle, spawn_refresh};
pub use settings::{ChartType, Interval, Settings, SettingsDraft};
pub use tooltip::{Tooltip, ViewportEvent, ViewportNotifier};
