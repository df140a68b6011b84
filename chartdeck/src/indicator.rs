use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{collections::BTreeMap, fmt};

/// Numeric parameters of one indicator, keyed by parameter name.
pub type IndicatorParams = BTreeMap<SmolStr, f64>;

/// Chart sub-region an indicator is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    #[default]
    Main,
    Oscillator,
    Macd,
    Volume,
    Volatility,
}

impl Panel {
    pub const ALL: [Panel; 5] = [
        Panel::Main,
        Panel::Oscillator,
        Panel::Macd,
        Panel::Volume,
        Panel::Volatility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Panel::Main => "main",
            Panel::Oscillator => "oscillator",
            Panel::Macd => "macd",
            Panel::Volume => "volume",
            Panel::Volatility => "volatility",
        }
    }

    /// Next panel in [`Panel::ALL`], wrapping around.
    pub fn next(&self) -> Panel {
        let index = Self::ALL.iter().position(|panel| panel == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static description of a known indicator: its default parameters and default panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSpec {
    pub name: &'static str,
    pub params: &'static [(&'static str, f64)],
    pub panel: Panel,
}

impl IndicatorSpec {
    pub fn is_configurable(&self) -> bool {
        !self.params.is_empty()
    }

    pub fn has_param(&self, param: &str) -> bool {
        self.params.iter().any(|(name, _)| *name == param)
    }

    pub fn default_params(&self) -> IndicatorParams {
        self.params
            .iter()
            .map(|&(name, value)| (SmolStr::new_static(name), value))
            .collect()
    }
}

/// Every indicator the dashboard offers, in menu order.
pub const CATALOG: &[IndicatorSpec] = &[
    IndicatorSpec {
        name: "SMA",
        params: &[("period", 20.0)],
        panel: Panel::Main,
    },
    IndicatorSpec {
        name: "EMA",
        params: &[("period", 20.0)],
        panel: Panel::Main,
    },
    IndicatorSpec {
        name: "Bollinger Bands",
        params: &[("period", 20.0), ("std_dev", 2.0)],
        panel: Panel::Main,
    },
    IndicatorSpec {
        name: "VWAP",
        params: &[],
        panel: Panel::Main,
    },
    IndicatorSpec {
        name: "Ichimoku Cloud",
        params: &[
            ("conversion_period", 9.0),
            ("base_period", 26.0),
            ("lagging_span_period", 52.0),
            ("displacement", 26.0),
        ],
        panel: Panel::Main,
    },
    IndicatorSpec {
        name: "RSI",
        params: &[("period", 14.0)],
        panel: Panel::Oscillator,
    },
    IndicatorSpec {
        name: "Stochastic",
        params: &[("k_period", 14.0), ("d_period", 3.0), ("smooth_k", 3.0)],
        panel: Panel::Oscillator,
    },
    IndicatorSpec {
        name: "MACD",
        params: &[("fast_period", 12.0), ("slow_period", 26.0), ("signal_period", 9.0)],
        panel: Panel::Macd,
    },
    IndicatorSpec {
        name: "OBV",
        params: &[],
        panel: Panel::Volume,
    },
    IndicatorSpec {
        name: "ATR",
        params: &[("period", 14.0)],
        panel: Panel::Volatility,
    },
];

pub fn lookup(name: &str) -> Option<&'static IndicatorSpec> {
    CATALOG.iter().find(|spec| spec.name == name)
}

/// Default parameters for `name`, or `None` if it has nothing to configure.
pub fn default_params(name: &str) -> Option<IndicatorParams> {
    lookup(name)
        .filter(|spec| spec.is_configurable())
        .map(IndicatorSpec::default_params)
}

/// Default panel for `name`, falling back to [`Panel::Main`] for unknown indicators.
pub fn default_panel(name: &str) -> Panel {
    lookup(name).map(|spec| spec.panel).unwrap_or_default()
}

/// One entry of the selected indicator list.
///
/// Indicators without configurable parameters stay [`IndicatorEntry::Simple`] for their whole
/// lifetime. Once an indicator has parameters it is always [`IndicatorEntry::Configured`], and
/// `params` mirrors the latest configuration.
///
/// Serialises to the wire form: `"VWAP"` or `{"name": "RSI", "period": 14.0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "RawEntry")]
pub enum IndicatorEntry {
    Simple(SmolStr),
    Configured {
        name: SmolStr,
        #[serde(flatten)]
        params: IndicatorParams,
    },
}

impl IndicatorEntry {
    pub fn name(&self) -> &SmolStr {
        match self {
            IndicatorEntry::Simple(name) => name,
            IndicatorEntry::Configured { name, .. } => name,
        }
    }

    pub fn params(&self) -> Option<&IndicatorParams> {
        match self {
            IndicatorEntry::Simple(_) => None,
            IndicatorEntry::Configured { params, .. } => Some(params),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, IndicatorEntry::Configured { .. })
    }
}

/// Wire representation accepted on input. Parameter values may arrive as numbers or as
/// numeric strings; anything else is dropped.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Simple(SmolStr),
    Configured {
        name: SmolStr,
        #[serde(flatten)]
        params: BTreeMap<SmolStr, ParamValue>,
    },
}

impl From<RawEntry> for IndicatorEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Simple(name) => IndicatorEntry::Simple(name),
            RawEntry::Configured { name, params } => {
                let params = coerce_params(params);
                if params.is_empty() {
                    IndicatorEntry::Simple(name)
                } else {
                    IndicatorEntry::Configured { name, params }
                }
            }
        }
    }
}

/// A parameter value as it may appear in persisted or hand-written settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl ParamValue {
    /// Coerce to a finite `f64`, parsing numeric strings.
    pub fn to_finite(&self) -> Option<f64> {
        let value = match self {
            ParamValue::Number(value) => *value,
            ParamValue::Text(text) => parse_finite(text)?,
            ParamValue::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

/// Parse user input into a finite number.
pub fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

pub fn coerce_params(raw: BTreeMap<SmolStr, ParamValue>) -> IndicatorParams {
    raw.into_iter()
        .filter_map(|(name, value)| value.to_finite().map(|value| (name, value)))
        .collect()
}

/// Request-ready indicator: name, resolved panel and numeric parameters, flattened on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRequest {
    pub name: SmolStr,
    pub panel: Panel,
    #[serde(flatten)]
    pub params: IndicatorParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_are_unique() {
        for (index, spec) in CATALOG.iter().enumerate() {
            assert!(
                CATALOG[index + 1..].iter().all(|other| other.name != spec.name),
                "duplicate catalog entry: {}",
                spec.name
            );
        }
    }

    #[test]
    fn test_default_params_and_panel() {
        let macd = default_params("MACD").unwrap();
        assert_eq!(macd.len(), 3);
        assert_eq!(macd["fast_period"], 12.0);
        assert_eq!(default_panel("MACD"), Panel::Macd);

        assert!(default_params("VWAP").is_none());
        assert!(default_params("Unknown").is_none());
        assert_eq!(default_panel("Unknown"), Panel::Main);
    }

    #[test]
    fn test_panel_next_wraps() {
        assert_eq!(Panel::Main.next(), Panel::Oscillator);
        assert_eq!(Panel::Volatility.next(), Panel::Main);
        assert_eq!(Panel::Macd.to_string(), "macd");
    }

    #[test]
    fn test_entry_wire_format() {
        let simple = IndicatorEntry::Simple(SmolStr::new("VWAP"));
        assert_eq!(serde_json::to_value(&simple).unwrap(), serde_json::json!("VWAP"));

        let configured = IndicatorEntry::Configured {
            name: SmolStr::new("RSI"),
            params: default_params("RSI").unwrap(),
        };
        assert_eq!(
            serde_json::to_value(&configured).unwrap(),
            serde_json::json!({"name": "RSI", "period": 14.0})
        );
    }

    #[test]
    fn test_entry_deserialise_coerces_numeric_strings() {
        struct TestCase {
            input: serde_json::Value,
            expected: IndicatorEntry,
        }

        let tests = vec![
            TestCase {
                // TC0: bare name
                input: serde_json::json!("OBV"),
                expected: IndicatorEntry::Simple(SmolStr::new("OBV")),
            },
            TestCase {
                // TC1: numeric string parameter
                input: serde_json::json!({"name": "SMA", "period": "50"}),
                expected: IndicatorEntry::Configured {
                    name: SmolStr::new("SMA"),
                    params: IndicatorParams::from([(SmolStr::new("period"), 50.0)]),
                },
            },
            TestCase {
                // TC2: non-numeric values are dropped
                input: serde_json::json!({"name": "SMA", "period": 10, "color": "red"}),
                expected: IndicatorEntry::Configured {
                    name: SmolStr::new("SMA"),
                    params: IndicatorParams::from([(SmolStr::new("period"), 10.0)]),
                },
            },
            TestCase {
                // TC3: object without parameters collapses to the bare form
                input: serde_json::json!({"name": "VWAP"}),
                expected: IndicatorEntry::Simple(SmolStr::new("VWAP")),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual: IndicatorEntry = serde_json::from_value(test.input).unwrap();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_parse_finite() {
        assert_eq!(parse_finite(" 21 "), Some(21.0));
        assert_eq!(parse_finite("abc"), None);
        assert_eq!(parse_finite("NaN"), None);
        assert_eq!(parse_finite("inf"), None);
    }
}
