use crate::{
    error::ChartError,
    fetch::FetchConfig,
    refresh::DEFAULT_DEBOUNCE,
    settings::DEFAULT_TICKER,
};
use smol_str::SmolStr;
use std::{path::PathBuf, time::Duration};
use tracing::warn;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PREFS_PATH: &str = "chartdeck-prefs.json";
pub const DEFAULT_LOG_PATH: &str = "chartdeck.log";

pub const ENV_API_URL: &str = "CHARTDECK_API_URL";
pub const ENV_TICKER: &str = "CHARTDECK_TICKER";
pub const ENV_DEBOUNCE_MS: &str = "CHARTDECK_DEBOUNCE_MS";
pub const ENV_TIMEOUT_SECS: &str = "CHARTDECK_TIMEOUT_SECS";
pub const ENV_PREFS: &str = "CHARTDECK_PREFS";
pub const ENV_LOG: &str = "CHARTDECK_LOG";

/// Dashboard runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Base URL of the chart API
    pub api_url: String,
    /// Ticker loaded on startup
    pub ticker: SmolStr,
    /// Quiet period before a settings edit triggers a fetch
    pub debounce: Duration,
    /// Per request HTTP timeout
    pub timeout: Duration,
    /// KPI preference file
    pub prefs_path: PathBuf,
    /// Log file (the terminal is owned by the UI)
    pub log_path: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ticker: SmolStr::new_static(DEFAULT_TICKER),
            debounce: DEFAULT_DEBOUNCE,
            timeout: DEFAULT_TIMEOUT,
            prefs_path: PathBuf::from(DEFAULT_PREFS_PATH),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }
}

impl DashboardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_ticker(mut self, ticker: &str) -> Self {
        self.ticker = SmolStr::new(ticker.trim().to_uppercase());
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_prefs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.prefs_path = path.into();
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    /// Read the `CHARTDECK_*` environment variables over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unparsable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_url) = var(ENV_API_URL) {
            config = config.with_api_url(api_url);
        }
        if let Some(ticker) = var(ENV_TICKER) {
            config = config.with_ticker(&ticker);
        }
        if let Some(millis) = var(ENV_DEBOUNCE_MS).and_then(|raw| parse_u64(ENV_DEBOUNCE_MS, &raw)) {
            config = config.with_debounce(Duration::from_millis(millis));
        }
        if let Some(secs) = var(ENV_TIMEOUT_SECS).and_then(|raw| parse_u64(ENV_TIMEOUT_SECS, &raw)) {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(path) = var(ENV_PREFS) {
            config = config.with_prefs_path(path);
        }
        if let Some(path) = var(ENV_LOG) {
            config = config.with_log_path(path);
        }

        config
    }

    /// HTTP client configuration for [`HttpChartSource`](crate::fetch::HttpChartSource).
    pub fn fetch_config(&self) -> Result<FetchConfig, ChartError> {
        // Url::join replaces the last path segment unless the base ends with a slash
        let mut base = self.api_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let base_url = Url::parse(&base)
            .map_err(|error| ChartError::Other(format!("invalid chart API url {}: {}", base, error)))?;

        Ok(FetchConfig::new(base_url).with_timeout(self.timeout))
    }
}

fn parse_u64(key: &str, raw: &str) -> Option<u64> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, raw, "ignoring invalid numeric configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup() {
        struct TestCase {
            vars: Vec<(&'static str, &'static str)>,
            expected: DashboardConfig,
        }

        let tests = vec![
            TestCase {
                // TC0: nothing set
                vars: vec![],
                expected: DashboardConfig::default(),
            },
            TestCase {
                // TC1: everything set
                vars: vec![
                    (ENV_API_URL, "https://charts.example.com/v1"),
                    (ENV_TICKER, " msft "),
                    (ENV_DEBOUNCE_MS, "150"),
                    (ENV_TIMEOUT_SECS, "5"),
                    (ENV_PREFS, "/tmp/prefs.json"),
                    (ENV_LOG, "/tmp/chartdeck.log"),
                ],
                expected: DashboardConfig::new()
                    .with_api_url("https://charts.example.com/v1")
                    .with_ticker("MSFT")
                    .with_debounce(Duration::from_millis(150))
                    .with_timeout(Duration::from_secs(5))
                    .with_prefs_path("/tmp/prefs.json")
                    .with_log_path("/tmp/chartdeck.log"),
            },
            TestCase {
                // TC2: invalid numbers and blank values fall back to defaults
                vars: vec![(ENV_DEBOUNCE_MS, "soon"), (ENV_TIMEOUT_SECS, "-1"), (ENV_TICKER, "  ")],
                expected: DashboardConfig::default(),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = DashboardConfig::from_lookup(lookup(&test.vars));
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_fetch_config_keeps_base_path() {
        let config = DashboardConfig::new()
            .with_api_url("https://charts.example.com/v1")
            .with_timeout(Duration::from_secs(3));
        let fetch = config.fetch_config().unwrap();

        assert_eq!(
            fetch.base_url.join("api/stock-chart").unwrap().as_str(),
            "https://charts.example.com/v1/api/stock-chart"
        );
        assert_eq!(fetch.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_fetch_config_rejects_invalid_url() {
        let config = DashboardConfig::new().with_api_url("not a url");
        assert!(matches!(config.fetch_config(), Err(ChartError::Other(_))));
    }
}
