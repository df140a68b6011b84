//! Dashboard orchestrator: owns the applied settings (through the sidebar draft), the chart view,
//! KPI preferences and the KPI tooltip, and routes terminal events between them.

use crate::sidebar::{Sidebar, SidebarAction};
use chartdeck::{
    kpi::{group_kpis, KpiRecord},
    placement::{Placement, PlacementConfig, Rect, Size},
    preferences::{KpiPreferences, PreferenceStore},
    refresh::{Applied, ChartView, RefreshEvent, RefreshHandle},
    tooltip::{AnchorId, Disposition, Tooltip, ViewportEvent, ViewportNotifier},
    Settings,
};
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use smol_str::SmolStr;
use tracing::{debug, info, warn};

/// Gap between a KPI card and its tooltip, in cells.
pub const TOOLTIP_OFFSET: f64 = 1.0;
/// Minimum distance between the tooltip and the terminal edge, in cells.
pub const TOOLTIP_MARGIN: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Kpis,
}

/// Screen area of a rendered KPI card, recorded by the renderer for hit testing.
#[derive(Debug, Clone, PartialEq)]
pub struct CardHit {
    pub anchor: AnchorId,
    pub rect: Rect,
}

pub struct App {
    pub(crate) sidebar: Sidebar,
    pub(crate) chart: ChartView,
    pub(crate) prefs: KpiPreferences,
    store: Box<dyn PreferenceStore>,
    pub(crate) tooltip: Tooltip<KpiRecord>,
    notifier: ViewportNotifier,
    refresh: RefreshHandle,
    pub(crate) focus: Focus,
    pub(crate) fullscreen: bool,
    pub(crate) show_kpi_settings: bool,
    pub(crate) settings_cursor: usize,
    pub(crate) selected_card: usize,
    pub(crate) kpi_scroll: u16,
    pub(crate) card_hits: Vec<CardHit>,
    pub(crate) status: Option<String>,
    pub(crate) last_update: Option<DateTime<Local>>,
    pub(crate) viewport: Size,
    should_quit: bool,
}

impl App {
    /// Build the dashboard and schedule the initial fetch for `settings`.
    pub fn new(settings: Settings, store: Box<dyn PreferenceStore>, refresh: RefreshHandle) -> Self {
        let prefs = store.load().unwrap_or_else(|error| {
            warn!(%error, "failed to load KPI preferences, using defaults");
            KpiPreferences::default()
        });

        let notifier = ViewportNotifier::new();
        let tooltip = Tooltip::new(
            notifier.clone(),
            Placement::Above,
            PlacementConfig::new(TOOLTIP_OFFSET, TOOLTIP_MARGIN),
        );

        let app = Self {
            sidebar: Sidebar::new(settings.clone()),
            chart: ChartView::new(),
            prefs,
            store,
            tooltip,
            notifier,
            refresh,
            focus: Focus::Sidebar,
            fullscreen: false,
            show_kpi_settings: false,
            settings_cursor: 0,
            selected_card: 0,
            kpi_scroll: 0,
            card_hits: Vec::new(),
            status: None,
            last_update: None,
            viewport: Size::default(),
            should_quit: false,
        };

        if !app.refresh.request(settings) {
            warn!("chart refresh task is not running");
        }
        app
    }

    /// Settings the chart currently reflects.
    pub fn settings(&self) -> &Settings {
        self.sidebar.draft().applied()
    }

    pub fn sidebar(&self) -> &Sidebar {
        &self.sidebar
    }

    pub fn chart(&self) -> &ChartView {
        &self.chart
    }

    pub fn prefs(&self) -> &KpiPreferences {
        &self.prefs
    }

    pub fn tooltip(&self) -> &Tooltip<KpiRecord> {
        &self.tooltip
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// KPI cards in display order; the position of a card is its [`AnchorId`].
    pub fn visible_cards(&self) -> Vec<&KpiRecord> {
        let Some(data) = self.chart.kpis() else {
            return Vec::new();
        };
        group_kpis(&data.kpis, &self.prefs)
            .into_iter()
            .filter(|group| group.expanded)
            .flat_map(|group| group.kpis)
            .collect()
    }

    /// Every group present in the data, in preference order.
    pub fn ordered_groups(&self) -> Vec<SmolStr> {
        let groups = self
            .chart
            .kpis()
            .map(|data| data.groups())
            .unwrap_or_default();

        self.prefs
            .group_order
            .iter()
            .filter(|group| groups.contains(group))
            .chain(groups.iter().filter(|group| !self.prefs.group_order.contains(group)))
            .cloned()
            .collect()
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.sidebar.is_editing() {
            self.route_sidebar(key);
            return;
        }

        match key.code {
            KeyCode::Esc => {
                if self.tooltip.escape() {
                    debug!("tooltip dismissed with escape");
                } else if self.show_kpi_settings {
                    self.show_kpi_settings = false;
                } else if self.fullscreen {
                    self.fullscreen = false;
                }
            }
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Sidebar => Focus::Kpis,
                    Focus::Kpis => Focus::Sidebar,
                };
            }
            KeyCode::Char('f') => {
                self.fullscreen = !self.fullscreen;
                self.tooltip.close();
            }
            KeyCode::Char('r') => self.request_refresh(),
            _ => match self.focus {
                Focus::Sidebar => self.route_sidebar(key),
                Focus::Kpis if self.show_kpi_settings => self.on_kpi_settings_key(key),
                Focus::Kpis => self.on_kpi_key(key),
            },
        }
    }

    fn route_sidebar(&mut self, key: KeyEvent) {
        match self.sidebar.on_key(key) {
            SidebarAction::Apply(settings) => self.apply_settings(settings),
            SidebarAction::Discarded => self.status = Some("Changes discarded".to_string()),
            SidebarAction::None => {}
        }
    }

    fn apply_settings(&mut self, settings: Settings) {
        info!(
            ticker = %settings.ticker(),
            interval = %settings.interval(),
            indicators = settings.selected_indicators().len(),
            "requesting chart for new settings"
        );
        self.tooltip.close();
        if !self.refresh.request(settings) {
            warn!("chart refresh task is not running");
        }
    }

    fn request_refresh(&mut self) {
        let settings = self.settings().clone();
        self.apply_settings(settings);
    }

    fn on_kpi_key(&mut self, key: KeyEvent) {
        let count = self.visible_cards().len();
        match key.code {
            KeyCode::Left => self.selected_card = self.selected_card.saturating_sub(1),
            KeyCode::Right if count > 0 => {
                self.selected_card = (self.selected_card + 1).min(count - 1)
            }
            KeyCode::Enter => {
                let anchor = AnchorId(self.selected_card);
                match self.card_hits.iter().find(|hit| hit.anchor == anchor).cloned() {
                    Some(hit) => self.toggle_tooltip(hit),
                    None => debug!(%anchor, "selected card is not on screen"),
                }
            }
            KeyCode::Char('v') => {
                self.prefs.cycle_view();
                self.save_prefs();
            }
            KeyCode::Char('s') => {
                self.tooltip.close();
                self.show_kpi_settings = true;
                self.settings_cursor = 0;
            }
            _ => {}
        }
    }

    fn on_kpi_settings_key(&mut self, key: KeyEvent) {
        let groups = self.ordered_groups();
        if groups.is_empty() {
            self.show_kpi_settings = false;
            return;
        }
        self.settings_cursor = self.settings_cursor.min(groups.len() - 1);
        let group = groups[self.settings_cursor].clone();

        match key.code {
            KeyCode::Up => self.settings_cursor = self.settings_cursor.saturating_sub(1),
            KeyCode::Down => self.settings_cursor = (self.settings_cursor + 1).min(groups.len() - 1),
            KeyCode::Char(' ') | KeyCode::Enter => {
                let visible = groups.iter().filter(|g| self.prefs.is_visible(g)).count();
                if self.prefs.is_visible(&group) && visible == 1 {
                    self.status = Some("At least one KPI group stays visible".to_string());
                    return;
                }
                self.prefs.toggle_visible(&group, &groups);
                self.save_prefs();
            }
            KeyCode::Char('e') => {
                self.prefs.toggle_expanded(&group);
                self.save_prefs();
            }
            KeyCode::Char('[') | KeyCode::Char(']') => {
                let delta = if key.code == KeyCode::Char('[') { -1 } else { 1 };
                // Materialise the displayed order before moving within it
                self.prefs.group_order = groups.clone();
                self.prefs.move_group(&group, delta);
                self.settings_cursor = self
                    .prefs
                    .group_order
                    .iter()
                    .position(|g| *g == group)
                    .unwrap_or(self.settings_cursor);
                self.save_prefs();
            }
            KeyCode::Char('v') => {
                self.prefs.cycle_view();
                self.save_prefs();
            }
            KeyCode::Char('s') => self.show_kpi_settings = false,
            _ => {}
        }
    }

    pub fn on_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.pointer_down(mouse.column, mouse.row),
            MouseEventKind::ScrollDown => self.scroll(1),
            MouseEventKind::ScrollUp => self.scroll(-1),
            _ => {}
        }
    }

    /// Left click at terminal cell `(column, row)`.
    pub fn pointer_down(&mut self, column: u16, row: u16) {
        let (x, y) = (column as f64, row as f64);

        match self.tooltip.pointer_down(x, y) {
            Disposition::Consumed => {
                if self.tooltip.rect().is_some_and(|rect| close_button(rect).contains(x, y)) {
                    self.tooltip.close();
                }
                return;
            }
            Disposition::Dismissed | Disposition::Ignored => {}
        }

        if let Some(hit) = self.card_hits.iter().find(|hit| hit.rect.contains(x, y)).cloned() {
            self.focus = Focus::Kpis;
            self.selected_card = hit.anchor.0;
            self.toggle_tooltip(hit);
        }
    }

    fn toggle_tooltip(&mut self, hit: CardHit) {
        let Some(record) = self.visible_cards().get(hit.anchor.0).map(|record| (*record).clone())
        else {
            return;
        };
        self.tooltip.click_anchor(hit.anchor, hit.rect, record);
    }

    fn scroll(&mut self, delta: i32) {
        self.kpi_scroll = (self.kpi_scroll as i32 + delta).max(0) as u16;
        self.notifier.notify(ViewportEvent::Scroll);
    }

    pub fn on_resize(&mut self, width: u16, height: u16) {
        self.viewport = Size::new(width as f64, height as f64);
        self.notifier.notify(ViewportEvent::Resize(self.viewport));
    }

    /// Per frame housekeeping: recompute the tooltip position after viewport changes.
    pub fn tick(&mut self) {
        if self.tooltip.poll_viewport() {
            debug!("tooltip repositioned");
        }
    }

    /// Record where the renderer drew the KPI cards. An open tooltip follows its card, and
    /// closes if the card is no longer on screen.
    pub fn set_card_hits(&mut self, hits: Vec<CardHit>) {
        if let Some(anchor) = self.tooltip.anchor() {
            match hits.iter().find(|hit| hit.anchor == anchor) {
                Some(hit) => self.tooltip.update_anchor(anchor, hit.rect),
                None => self.tooltip.close(),
            }
        }
        self.card_hits = hits;
    }

    pub fn on_refresh_event(&mut self, event: RefreshEvent) {
        match self.chart.apply(event) {
            None => self.status = Some(format!("Loading {}...", self.settings().ticker())),
            Some(Applied::Updated) => {
                self.tooltip.close();
                self.last_update = Some(Local::now());
                self.status = None;

                let groups = self.ordered_groups();
                if self.prefs.reconcile(&groups) {
                    self.save_prefs();
                }
                let count = self.visible_cards().len();
                self.selected_card = self.selected_card.min(count.saturating_sub(1));
            }
            Some(Applied::Failed) => {
                self.tooltip.close();
                self.status = self
                    .chart
                    .error()
                    .map(|error| error.user_message().title);
            }
            Some(Applied::Stale) => {}
        }
    }

    fn save_prefs(&mut self) {
        if let Err(error) = self.store.save(&self.prefs) {
            warn!(%error, "failed to save KPI preferences");
            self.status = Some(format!("Could not save KPI preferences: {}", error));
        }
    }
}

/// The `[x]` cell range in the top right corner of a tooltip.
pub fn close_button(tooltip: Rect) -> Rect {
    Rect::new(tooltip.top, tooltip.right() - 4.0, 3.0, 1.0)
}
