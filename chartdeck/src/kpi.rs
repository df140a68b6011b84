//! KPI data types
//!
//! These match the `kpi_data` object of the chart API response.

use crate::preferences::KpiPreferences;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Semantic color tag of a formatted KPI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Negative,
    #[default]
    Neutral,
}

/// Direction a KPI is moving in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl Trend {
    pub fn arrow(&self) -> &'static str {
        match self {
            Trend::Up => "▲",
            Trend::Down => "▼",
            Trend::Neutral => "■",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Trend::Up => Tone::Positive,
            Trend::Down => Tone::Negative,
            Trend::Neutral => Tone::Neutral,
        }
    }
}

/// KPI value: either a raw scalar, or a server formatted string with a color tag
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum KpiValue {
    Formatted {
        value: String,
        #[serde(default)]
        color: Tone,
    },
    Number(f64),
    Text(String),
}

impl KpiValue {
    /// Display string: integers without decimals, other numbers with two
    pub fn display(&self) -> String {
        match self {
            KpiValue::Formatted { value, .. } => value.clone(),
            KpiValue::Number(number) => format_number(*number),
            KpiValue::Text(text) => text.clone(),
        }
    }

    /// Color tag (raw scalars are neutral)
    pub fn tone(&self) -> Tone {
        match self {
            KpiValue::Formatted { color, .. } => *color,
            KpiValue::Number(_) | KpiValue::Text(_) => Tone::Neutral,
        }
    }
}

fn format_number(number: f64) -> String {
    if !number.is_finite() {
        "--".to_string()
    } else if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        format!("{:.2}", number)
    }
}

/// A single named metric
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KpiRecord {
    /// Display name (e.g., "P/E Ratio")
    pub name: String,
    pub value: KpiValue,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub trend: Option<Trend>,
    #[serde(default)]
    pub trend_label: Option<String>,
    #[serde(default)]
    pub secondary_value: Option<KpiValue>,
    #[serde(default)]
    pub secondary_label: Option<String>,
    /// Group key (e.g., "price", "volume", "volatility")
    pub group: SmolStr,
}

impl KpiRecord {
    /// Secondary value rendered as `label: value`
    pub fn secondary(&self) -> Option<String> {
        let value = self.secondary_value.as_ref()?.display();
        Some(match &self.secondary_label {
            Some(label) => format!("{}: {}", label, value),
            None => value,
        })
    }
}

/// KPI payload of a chart response
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct KpiData {
    #[serde(default)]
    pub kpis: Vec<KpiRecord>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl KpiData {
    /// Group names in first-seen order
    pub fn groups(&self) -> Vec<SmolStr> {
        self.kpis.iter().map(|kpi| kpi.group.clone()).unique().collect()
    }
}

/// One rendered group of KPI cards
#[derive(Debug, Clone, PartialEq)]
pub struct KpiGroupView<'a> {
    pub name: SmolStr,
    pub kpis: Vec<&'a KpiRecord>,
    pub expanded: bool,
}

/// Arrange records into visible groups: `group_order` first, then unordered groups in
/// first-seen order. An empty `visible_groups` shows everything.
pub fn group_kpis<'a>(records: &'a [KpiRecord], prefs: &KpiPreferences) -> Vec<KpiGroupView<'a>> {
    let seen: Vec<SmolStr> = records.iter().map(|kpi| kpi.group.clone()).unique().collect();

    prefs
        .group_order
        .iter()
        .filter(|group| seen.contains(group))
        .chain(seen.iter().filter(|group| !prefs.group_order.contains(group)))
        .filter(|group| prefs.is_visible(group))
        .map(|group| KpiGroupView {
            name: group.clone(),
            kpis: records.iter().filter(|kpi| &kpi.group == group).collect(),
            expanded: prefs.is_expanded(group),
        })
        .collect()
}
