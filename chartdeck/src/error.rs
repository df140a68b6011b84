use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

/// Message substrings the chart backend uses to signal well known failures.
const TICKER_NOT_FOUND: &str = "No data found for ticker";
const PROCESSING_ERROR: &str = "Error processing request";
const VALIDATION_ERROR: &str = "Validation Error";
const INDICATOR_CONFIG: &str = "IndicatorConfig";

/// All errors generated while fetching chart data.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Error)]
pub enum ChartError {
    #[error("no data found for ticker: {ticker}")]
    TickerNotFound { ticker: SmolStr },

    #[error("validation error: {message}")]
    Validation {
        message: String,
        indicator_config: bool,
    },

    #[error("error processing request: {0}")]
    Processing(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode chart response: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

impl ChartError {
    /// Classify a backend error message by the substrings it is known to contain.
    ///
    /// Any message mentioning `IndicatorConfig` is refined to an indicator configuration error,
    /// even when it arrives wrapped in a processing error. Unrecognised messages are kept
    /// verbatim in [`ChartError::Other`].
    pub fn from_message(message: impl Into<String>, ticker: &str) -> Self {
        let message = message.into();

        if message.contains(TICKER_NOT_FOUND) {
            ChartError::TickerNotFound {
                ticker: SmolStr::new(ticker),
            }
        } else if message.contains(VALIDATION_ERROR) || message.contains(INDICATOR_CONFIG) {
            ChartError::Validation {
                indicator_config: message.contains(INDICATOR_CONFIG),
                message,
            }
        } else if message.contains(PROCESSING_ERROR) {
            ChartError::Processing(message)
        } else {
            ChartError::Other(message)
        }
    }

    /// Convert into the title/detail/suggestions triple shown by the error view.
    pub fn user_message(&self) -> UserMessage {
        match self {
            ChartError::TickerNotFound { ticker } => UserMessage {
                title: "Ticker not found".to_string(),
                detail: format!("No price data is available for \"{ticker}\"."),
                suggestions: vec![
                    "Check the ticker symbol for typos".to_string(),
                    "Use the exchange listing symbol, e.g. AAPL or MSFT".to_string(),
                    "Try a longer history window or a daily interval".to_string(),
                ],
            },
            ChartError::Validation {
                indicator_config: true,
                ..
            } => UserMessage {
                title: "Invalid indicator configuration".to_string(),
                detail: "One of the selected indicators has parameters the server rejected."
                    .to_string(),
                suggestions: vec![
                    "Reset indicator parameters to their defaults".to_string(),
                    "Make sure periods are positive whole numbers".to_string(),
                ],
            },
            ChartError::Validation { message, .. } => UserMessage {
                title: "Invalid request".to_string(),
                detail: message.clone(),
                suggestions: vec!["Review the chart settings and try again".to_string()],
            },
            ChartError::Processing(message) => UserMessage {
                title: "Request failed".to_string(),
                detail: message.clone(),
                suggestions: vec!["Try again in a moment".to_string()],
            },
            ChartError::Transport(message) => UserMessage {
                title: "Connection problem".to_string(),
                detail: message.clone(),
                suggestions: vec!["Check that the chart API is reachable".to_string()],
            },
            ChartError::Decode(message) => UserMessage {
                title: "Unexpected response".to_string(),
                detail: message.clone(),
                suggestions: Vec::new(),
            },
            ChartError::Other(message) => UserMessage {
                title: "Error".to_string(),
                detail: message.clone(),
                suggestions: Vec::new(),
            },
        }
    }
}

impl From<reqwest::Error> for ChartError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Human readable rendition of a [`ChartError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub title: String,
    pub detail: String,
    pub suggestions: Vec<String>,
}

/// Rejected edits to the settings aggregate. Rejections leave the settings untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("indicator is not selected: {0}")]
    NotSelected(SmolStr),

    #[error("indicator has no configurable parameters: {0}")]
    NoParameters(SmolStr),

    #[error("unknown parameter {param} for indicator {indicator}")]
    UnknownParameter { indicator: SmolStr, param: SmolStr },

    #[error("parameter {param} of {indicator} must be a finite number, got {raw:?}")]
    NonFiniteParameter {
        indicator: SmolStr,
        param: SmolStr,
        raw: String,
    },

    #[error("ticker must not be empty")]
    EmptyTicker,
}

/// Failures loading or saving [`KpiPreferences`](crate::preferences::KpiPreferences).
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("preference storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("preference file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_error_from_message() {
        struct TestCase {
            input: &'static str,
            expected: ChartError,
        }

        let tests = vec![
            TestCase {
                // TC0: ticker not found
                input: "No data found for ticker ZZZZ",
                expected: ChartError::TickerNotFound {
                    ticker: SmolStr::new("ZZZZ"),
                },
            },
            TestCase {
                // TC1: plain validation error
                input: "Validation Error: days must be positive",
                expected: ChartError::Validation {
                    message: "Validation Error: days must be positive".to_string(),
                    indicator_config: false,
                },
            },
            TestCase {
                // TC2: processing error refined to an indicator configuration error
                input: "Error processing request: IndicatorConfig period must be > 0",
                expected: ChartError::Validation {
                    message: "Error processing request: IndicatorConfig period must be > 0"
                        .to_string(),
                    indicator_config: true,
                },
            },
            TestCase {
                // TC3: generic processing error
                input: "Error processing request: upstream timeout",
                expected: ChartError::Processing(
                    "Error processing request: upstream timeout".to_string(),
                ),
            },
            TestCase {
                // TC4: unknown message passes through verbatim
                input: "something odd happened",
                expected: ChartError::Other("something odd happened".to_string()),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = ChartError::from_message(test.input, "ZZZZ");
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_user_message() {
        let not_found = ChartError::TickerNotFound {
            ticker: SmolStr::new("ZZZZ"),
        }
        .user_message();
        assert_eq!(not_found.title, "Ticker not found");
        assert!(not_found.detail.contains("ZZZZ"));
        assert!(!not_found.suggestions.is_empty());

        let unknown = ChartError::Other("boom".to_string()).user_message();
        assert_eq!(unknown.detail, "boom");
        assert!(unknown.suggestions.is_empty());

        let indicator = ChartError::Validation {
            message: "IndicatorConfig".to_string(),
            indicator_config: true,
        }
        .user_message();
        assert_eq!(indicator.title, "Invalid indicator configuration");
    }
}
