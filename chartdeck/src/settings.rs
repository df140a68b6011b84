use crate::{
    error::SettingsError,
    indicator::{
        self, IndicatorEntry, IndicatorParams, IndicatorRequest, Panel, ParamValue,
        coerce_params, parse_finite,
    },
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{collections::BTreeMap, fmt};
use tracing::{debug, warn};

pub const DEFAULT_TICKER: &str = "AAPL";
pub const DEFAULT_DAYS_OF_HISTORY: u32 = 365;
pub const MIN_DAYS_OF_HISTORY: u32 = 1;
pub const MAX_DAYS_OF_HISTORY: u32 = 3650;

/// Candle interval requested from the chart backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
}

impl Interval {
    pub const ALL: [Interval; 8] = [
        Interval::OneMinute,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::OneHour,
        Interval::OneDay,
        Interval::OneWeek,
        Interval::OneMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
        }
    }

    /// Step through [`Interval::ALL`] by `delta`, wrapping at both ends.
    pub fn cycle(&self, delta: isize) -> Interval {
        let len = Self::ALL.len() as isize;
        let index = Self::ALL.iter().position(|i| i == self).unwrap_or(0) as isize;
        Self::ALL[(index + delta).rem_euclid(len) as usize]
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Candlestick,
    Line,
}

impl ChartType {
    pub fn toggle(&self) -> ChartType {
        match self {
            ChartType::Candlestick => ChartType::Line,
            ChartType::Line => ChartType::Candlestick,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Candlestick => "candlestick",
            ChartType::Line => "line",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Chart configuration aggregate.
///
/// The keys of `indicator_configs` and `panel_assignments` are always a subset of the names in
/// `selected_indicators`, every selected indicator has exactly one panel, and each name is
/// selected at most once. All mutation goes through methods that preserve this, and
/// deserialisation repairs it (see [`Settings::normalise`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SettingsRepr")]
pub struct Settings {
    ticker: SmolStr,
    days_of_history: u32,
    interval: Interval,
    chart_type: ChartType,
    selected_indicators: Vec<IndicatorEntry>,
    indicator_configs: BTreeMap<SmolStr, IndicatorParams>,
    panel_assignments: BTreeMap<SmolStr, Panel>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(DEFAULT_TICKER)
    }
}

impl Settings {
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: normalise_ticker(ticker),
            days_of_history: DEFAULT_DAYS_OF_HISTORY,
            interval: Interval::default(),
            chart_type: ChartType::default(),
            selected_indicators: Vec::new(),
            indicator_configs: BTreeMap::new(),
            panel_assignments: BTreeMap::new(),
        }
    }

    pub fn ticker(&self) -> &SmolStr {
        &self.ticker
    }

    /// Upper-cases and trims the ticker. An empty ticker is stored as-is and rejected by
    /// [`SettingsDraft::apply`].
    pub fn set_ticker(&mut self, ticker: &str) {
        self.ticker = normalise_ticker(ticker);
    }

    pub fn days_of_history(&self) -> u32 {
        self.days_of_history
    }

    pub fn set_days_of_history(&mut self, days: u32) {
        self.days_of_history = days.clamp(MIN_DAYS_OF_HISTORY, MAX_DAYS_OF_HISTORY);
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Interval) {
        self.interval = interval;
    }

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub fn set_chart_type(&mut self, chart_type: ChartType) {
        self.chart_type = chart_type;
    }

    pub fn selected_indicators(&self) -> &[IndicatorEntry] {
        &self.selected_indicators
    }

    pub fn indicator_configs(&self) -> &BTreeMap<SmolStr, IndicatorParams> {
        &self.indicator_configs
    }

    pub fn panel_assignments(&self) -> &BTreeMap<SmolStr, Panel> {
        &self.panel_assignments
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn entry(&self, name: &str) -> Option<&IndicatorEntry> {
        self.position(name).map(|index| &self.selected_indicators[index])
    }

    /// Resolved panel for a selected indicator.
    pub fn panel(&self, name: &str) -> Panel {
        self.panel_assignments
            .get(name)
            .copied()
            .unwrap_or_else(|| indicator::default_panel(name))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.selected_indicators
            .iter()
            .position(|entry| entry.name() == name)
    }

    /// Select an indicator, seeding its parameters and panel from the catalog.
    ///
    /// Returns `false` without touching anything if `name` is already selected.
    pub fn add_indicator(&mut self, name: &str) -> bool {
        if self.is_selected(name) {
            return false;
        }

        let name = SmolStr::new(name);
        let entry = match indicator::default_params(&name) {
            Some(params) => {
                self.indicator_configs.insert(name.clone(), params.clone());
                IndicatorEntry::Configured {
                    name: name.clone(),
                    params,
                }
            }
            None => IndicatorEntry::Simple(name.clone()),
        };

        self.panel_assignments
            .insert(name.clone(), indicator::default_panel(&name));
        self.selected_indicators.push(entry);

        debug!(indicator = %name, "indicator added");
        true
    }

    /// Deselect an indicator and drop its parameters and panel assignment.
    ///
    /// Returns `false` if `name` was not selected.
    pub fn remove_indicator(&mut self, name: &str) -> bool {
        let before = self.selected_indicators.len();
        self.selected_indicators.retain(|entry| entry.name() != name);
        self.indicator_configs.remove(name);
        self.panel_assignments.remove(name);

        let removed = self.selected_indicators.len() != before;
        if removed {
            debug!(indicator = %name, "indicator removed");
        }
        removed
    }

    /// Add `name` if absent, remove it otherwise. Returns whether it is now selected.
    pub fn toggle_indicator(&mut self, name: &str) -> bool {
        if self.remove_indicator(name) {
            false
        } else {
            self.add_indicator(name)
        }
    }

    /// Set one parameter from raw user input.
    ///
    /// Input that does not parse to a finite number is rejected and the previous value is kept.
    pub fn set_parameter(&mut self, name: &str, param: &str, raw: &str) -> Result<f64, SettingsError> {
        let Some(value) = parse_finite(raw) else {
            let error = SettingsError::NonFiniteParameter {
                indicator: SmolStr::new(name),
                param: SmolStr::new(param),
                raw: raw.to_string(),
            };
            warn!(%error, "rejected indicator parameter");
            return Err(error);
        };
        self.set_parameter_value(name, param, value)
    }

    /// Set one parameter to an already numeric value.
    pub fn set_parameter_value(
        &mut self,
        name: &str,
        param: &str,
        value: f64,
    ) -> Result<f64, SettingsError> {
        if !value.is_finite() {
            let error = SettingsError::NonFiniteParameter {
                indicator: SmolStr::new(name),
                param: SmolStr::new(param),
                raw: value.to_string(),
            };
            warn!(%error, "rejected indicator parameter");
            return Err(error);
        }

        let index = self
            .position(name)
            .ok_or_else(|| SettingsError::NotSelected(SmolStr::new(name)))?;

        let spec = indicator::lookup(name)
            .filter(|spec| spec.is_configurable())
            .ok_or_else(|| SettingsError::NoParameters(SmolStr::new(name)))?;

        if !spec.has_param(param) {
            return Err(SettingsError::UnknownParameter {
                indicator: SmolStr::new(name),
                param: SmolStr::new(param),
            });
        }

        let config = self
            .indicator_configs
            .entry(SmolStr::new(name))
            .or_insert_with(|| spec.default_params());
        config.insert(SmolStr::new(param), value);

        self.regenerate_entry(index);
        debug!(indicator = %name, %param, value, "indicator parameter set");
        Ok(value)
    }

    /// Move a selected indicator to another panel.
    pub fn set_panel(&mut self, name: &str, panel: Panel) -> Result<(), SettingsError> {
        let index = self
            .position(name)
            .ok_or_else(|| SettingsError::NotSelected(SmolStr::new(name)))?;

        self.panel_assignments.insert(SmolStr::new(name), panel);
        self.regenerate_entry(index);
        debug!(indicator = %name, %panel, "indicator panel set");
        Ok(())
    }

    /// Rebuild the list entry at `index` so it mirrors the parameter map.
    fn regenerate_entry(&mut self, index: usize) {
        let name = self.selected_indicators[index].name().clone();
        self.selected_indicators[index] = match self.indicator_configs.get(&name) {
            Some(params) if !params.is_empty() => IndicatorEntry::Configured {
                name,
                params: params.clone(),
            },
            _ => IndicatorEntry::Simple(name),
        };
    }

    /// Request-ready indicator list for the current selection.
    pub fn prepare_for_request(&self) -> Vec<IndicatorRequest> {
        prepare_for_request(
            &self.selected_indicators,
            &self.indicator_configs,
            &self.panel_assignments,
        )
    }

    /// Restore the aggregate invariants on data that did not go through the mutators:
    /// duplicate names are dropped (first wins), orphaned configs and panels are removed,
    /// missing panels and catalog parameters are seeded, and entries are regenerated.
    fn normalise(&mut self) {
        let mut seen = Vec::<SmolStr>::new();
        self.selected_indicators.retain(|entry| {
            if seen.contains(entry.name()) {
                false
            } else {
                seen.push(entry.name().clone());
                true
            }
        });

        self.indicator_configs
            .retain(|name, params| seen.contains(name) && !params.is_empty());
        self.panel_assignments.retain(|name, _| seen.contains(name));

        for index in 0..self.selected_indicators.len() {
            let entry = &self.selected_indicators[index];
            let name = entry.name().clone();

            if !self.indicator_configs.contains_key(&name) {
                let params = entry
                    .params()
                    .cloned()
                    .or_else(|| indicator::default_params(&name));
                if let Some(params) = params {
                    self.indicator_configs.insert(name.clone(), params);
                }
            }

            self.panel_assignments
                .entry(name.clone())
                .or_insert_with(|| indicator::default_panel(&name));

            self.regenerate_entry(index);
        }

        self.days_of_history = self
            .days_of_history
            .clamp(MIN_DAYS_OF_HISTORY, MAX_DAYS_OF_HISTORY);
    }
}

/// Build the request-ready list: one object per entry with its resolved panel (assignment,
/// else catalog default, else `main`) and every configured parameter as a finite number.
pub fn prepare_for_request(
    selected: &[IndicatorEntry],
    configs: &BTreeMap<SmolStr, IndicatorParams>,
    panels: &BTreeMap<SmolStr, Panel>,
) -> Vec<IndicatorRequest> {
    selected
        .iter()
        .map(|entry| {
            let name = entry.name().clone();
            let panel = panels
                .get(&name)
                .copied()
                .unwrap_or_else(|| indicator::default_panel(&name));
            let params = configs
                .get(&name)
                .or_else(|| entry.params())
                .map(|params| {
                    params
                        .iter()
                        .filter(|(_, value)| value.is_finite())
                        .map(|(key, value)| (key.clone(), *value))
                        .collect()
                })
                .unwrap_or_default();

            IndicatorRequest { name, panel, params }
        })
        .collect()
}

fn normalise_ticker(ticker: &str) -> SmolStr {
    SmolStr::new(ticker.trim().to_uppercase())
}

/// On-disk/wire shape of [`Settings`], accepted leniently and normalised on conversion.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsRepr {
    #[serde(default = "default_ticker")]
    ticker: SmolStr,
    #[serde(default = "default_days")]
    days_of_history: u32,
    #[serde(default)]
    interval: Interval,
    #[serde(default)]
    chart_type: ChartType,
    #[serde(default)]
    selected_indicators: Vec<IndicatorEntry>,
    #[serde(default)]
    indicator_configs: BTreeMap<SmolStr, BTreeMap<SmolStr, ParamValue>>,
    #[serde(default)]
    panel_assignments: BTreeMap<SmolStr, Panel>,
}

fn default_ticker() -> SmolStr {
    SmolStr::new_static(DEFAULT_TICKER)
}

fn default_days() -> u32 {
    DEFAULT_DAYS_OF_HISTORY
}

impl From<SettingsRepr> for Settings {
    fn from(repr: SettingsRepr) -> Self {
        let mut settings = Settings {
            ticker: normalise_ticker(&repr.ticker),
            days_of_history: repr.days_of_history,
            interval: repr.interval,
            chart_type: repr.chart_type,
            selected_indicators: repr.selected_indicators,
            indicator_configs: repr
                .indicator_configs
                .into_iter()
                .map(|(name, params)| (name, coerce_params(params)))
                .collect(),
            panel_assignments: repr.panel_assignments,
        };
        settings.normalise();
        settings
    }
}

/// Sidebar edit buffer: an `applied` snapshot plus a `draft` the user edits.
///
/// The draft is dirty while it differs from the applied settings. [`SettingsDraft::apply`]
/// promotes the draft and hands it to the caller; [`SettingsDraft::discard`] drops the edits.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsDraft {
    applied: Settings,
    draft: Settings,
}

impl SettingsDraft {
    pub fn new(settings: Settings) -> Self {
        Self {
            applied: settings.clone(),
            draft: settings,
        }
    }

    pub fn applied(&self) -> &Settings {
        &self.applied
    }

    pub fn draft(&self) -> &Settings {
        &self.draft
    }

    pub fn is_dirty(&self) -> bool {
        self.applied != self.draft
    }

    /// Mutate the draft.
    pub fn edit<T>(&mut self, f: impl FnOnce(&mut Settings) -> T) -> T {
        f(&mut self.draft)
    }

    /// Promote the draft to applied and return the merged settings.
    pub fn apply(&mut self) -> Result<Settings, SettingsError> {
        if self.draft.ticker().is_empty() {
            return Err(SettingsError::EmptyTicker);
        }
        self.applied = self.draft.clone();
        Ok(self.applied.clone())
    }

    pub fn discard(&mut self) {
        self.draft = self.applied.clone();
    }
}
