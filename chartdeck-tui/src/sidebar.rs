//! Settings sidebar: ticker, history window, interval, chart type and the indicator list.
//!
//! Edits go into a [`SettingsDraft`]; nothing reaches the chart until the draft is applied.

use chartdeck::{
    indicator::{self, IndicatorSpec, CATALOG},
    Settings, SettingsDraft,
};
use crossterm::event::{KeyCode, KeyEvent};
use smol_str::SmolStr;
use tracing::{debug, info};

/// Sidebar form rows, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Ticker,
    Days,
    Interval,
    ChartType,
    Indicators,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Ticker,
        Field::Days,
        Field::Interval,
        Field::ChartType,
        Field::Indicators,
    ];

    fn index(&self) -> usize {
        Self::ALL.iter().position(|field| field == self).unwrap_or(0)
    }

    fn next(&self) -> Field {
        Self::ALL[(self.index() + 1).min(Self::ALL.len() - 1)]
    }

    fn prev(&self) -> Field {
        Self::ALL[self.index().saturating_sub(1)]
    }
}

/// Target of the text input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Ticker,
    Days,
    Param { indicator: SmolStr, param: SmolStr },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInput {
    pub target: EditTarget,
    pub buffer: String,
}

/// What the orchestrator should do after a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum SidebarAction {
    None,
    /// The draft was applied; these are the new settings.
    Apply(Settings),
    Discarded,
}

#[derive(Debug, Clone)]
pub struct Sidebar {
    draft: SettingsDraft,
    field: Field,
    cursor: usize,
    param_cursor: usize,
    input: Option<TextInput>,
    message: Option<String>,
}

impl Sidebar {
    pub fn new(settings: Settings) -> Self {
        Self {
            draft: SettingsDraft::new(settings),
            field: Field::Ticker,
            cursor: 0,
            param_cursor: 0,
            input: None,
            message: None,
        }
    }

    pub fn draft(&self) -> &SettingsDraft {
        &self.draft
    }

    pub fn field(&self) -> Field {
        self.field
    }

    /// Catalog row under the indicator cursor.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn param_cursor(&self) -> usize {
        self.param_cursor
    }

    pub fn input(&self) -> Option<&TextInput> {
        self.input.as_ref()
    }

    /// Last validation message, cleared by the next successful edit.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Whether key presses are currently text input.
    pub fn is_editing(&self) -> bool {
        self.input.is_some()
    }

    fn current_spec(&self) -> &'static IndicatorSpec {
        &CATALOG[self.cursor.min(CATALOG.len() - 1)]
    }

    /// Current value of `param` for `name` in the draft, falling back to the catalog default.
    pub fn param_value(&self, name: &str, param: &str) -> Option<f64> {
        self.draft
            .draft()
            .indicator_configs()
            .get(name)
            .and_then(|params| params.get(param))
            .copied()
            .or_else(|| indicator::default_params(name)?.get(param).copied())
    }

    pub fn on_key(&mut self, key: KeyEvent) -> SidebarAction {
        if self.input.is_some() {
            self.on_input_key(key);
            return SidebarAction::None;
        }

        match key.code {
            KeyCode::Up => {
                if self.field == Field::Indicators && self.cursor > 0 {
                    self.cursor -= 1;
                    self.param_cursor = 0;
                } else {
                    self.field = self.field.prev();
                }
            }
            KeyCode::Down => {
                if self.field == Field::Indicators {
                    self.cursor = (self.cursor + 1).min(CATALOG.len() - 1);
                    self.param_cursor = 0;
                } else {
                    self.field = self.field.next();
                }
            }
            KeyCode::Left => self.step(-1),
            KeyCode::Right => self.step(1),
            KeyCode::Enter => self.activate(),
            KeyCode::Char(' ') if self.field == Field::Indicators => {
                let name = self.current_spec().name;
                let selected = self.draft.edit(|settings| settings.toggle_indicator(name));
                debug!(indicator = name, selected, "indicator toggled");
            }
            KeyCode::Char('p') if self.field == Field::Indicators => self.cycle_panel(),
            KeyCode::Char('a') => return self.apply(),
            KeyCode::Char('d') => {
                if self.draft.is_dirty() {
                    self.draft.discard();
                    self.message = None;
                    return SidebarAction::Discarded;
                }
            }
            _ => {}
        }

        SidebarAction::None
    }

    fn step(&mut self, delta: isize) {
        match self.field {
            Field::Interval => {
                self.draft.edit(|settings| {
                    let interval = settings.interval().cycle(delta);
                    settings.set_interval(interval);
                });
            }
            Field::ChartType => {
                self.draft.edit(|settings| {
                    let chart_type = settings.chart_type().toggle();
                    settings.set_chart_type(chart_type);
                });
            }
            Field::Indicators => {
                let count = self.current_spec().params.len() as isize;
                if count > 0 {
                    self.param_cursor =
                        (self.param_cursor as isize + delta).rem_euclid(count) as usize;
                }
            }
            Field::Ticker | Field::Days => {}
        }
    }

    fn activate(&mut self) {
        let (target, buffer) = match self.field {
            Field::Ticker => (EditTarget::Ticker, self.draft.draft().ticker().to_string()),
            Field::Days => (
                EditTarget::Days,
                self.draft.draft().days_of_history().to_string(),
            ),
            Field::Interval | Field::ChartType => {
                self.step(1);
                return;
            }
            Field::Indicators => {
                let spec = self.current_spec();
                if !self.draft.draft().is_selected(spec.name) {
                    self.message = Some(format!("Select {} before configuring it", spec.name));
                    return;
                }
                let Some(&(param, _)) = spec.params.get(self.param_cursor) else {
                    self.message = Some(format!("{} has no parameters", spec.name));
                    return;
                };
                let value = self.param_value(spec.name, param).unwrap_or_default();
                (
                    EditTarget::Param {
                        indicator: SmolStr::new_static(spec.name),
                        param: SmolStr::new_static(param),
                    },
                    format_param(value),
                )
            }
        };

        self.input = Some(TextInput { target, buffer });
    }

    fn on_input_key(&mut self, key: KeyEvent) {
        let Some(input) = self.input.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Char(c) => input.buffer.push(c),
            KeyCode::Backspace => {
                input.buffer.pop();
            }
            KeyCode::Esc => self.input = None,
            KeyCode::Enter => {
                if let Some(input) = self.input.take() {
                    self.commit(input);
                }
            }
            _ => {}
        }
    }

    fn commit(&mut self, input: TextInput) {
        let TextInput { target, buffer } = input;
        self.message = match target {
            EditTarget::Ticker => {
                self.draft.edit(|settings| settings.set_ticker(&buffer));
                None
            }
            EditTarget::Days => match buffer.trim().parse::<u32>() {
                Ok(days) => {
                    self.draft.edit(|settings| settings.set_days_of_history(days));
                    None
                }
                Err(_) => Some(format!("\"{}\" is not a whole number of days", buffer.trim())),
            },
            EditTarget::Param { indicator, param } => self
                .draft
                .edit(|settings| settings.set_parameter(&indicator, &param, &buffer))
                .err()
                .map(|error| error.to_string()),
        };
    }

    fn cycle_panel(&mut self) {
        let name = self.current_spec().name;
        let result = self.draft.edit(|settings| {
            let panel = settings.panel(name).next();
            settings.set_panel(name, panel)
        });
        self.message = result.err().map(|error| error.to_string());
    }

    fn apply(&mut self) -> SidebarAction {
        match self.draft.apply() {
            Ok(settings) => {
                info!(ticker = %settings.ticker(), "settings applied");
                self.message = None;
                SidebarAction::Apply(settings)
            }
            Err(error) => {
                self.message = Some(error.to_string());
                SidebarAction::None
            }
        }
    }
}

/// Whole numbers without decimals, everything else as entered.
pub fn format_param(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
