use crate::{
    error::ChartError,
    indicator::IndicatorRequest,
    kpi::KpiData,
    settings::{ChartType, Interval, Settings},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Chart API path, relative to the configured base URL.
pub const CHART_ENDPOINT: &str = "api/stock-chart";

/// Body of a chart request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    pub ticker: SmolStr,
    pub days: u32,
    pub interval: Interval,
    pub indicators: Vec<IndicatorRequest>,
    pub chart_type: ChartType,
}

impl From<&Settings> for ChartRequest {
    fn from(settings: &Settings) -> Self {
        Self {
            ticker: settings.ticker().clone(),
            days: settings.days_of_history(),
            interval: settings.interval(),
            indicators: settings.prepare_for_request(),
            chart_type: settings.chart_type(),
        }
    }
}

/// Successful chart response: a serialised plot spec and optional KPI data.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChartResponse {
    pub chart: PlotSpec,
    #[serde(default)]
    pub kpi_data: Option<KpiData>,
}

/// Plot description produced by the backend. Rendering it is the plotting layer's job; only the
/// numeric series are read here.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PlotSpec(pub serde_json::Value);

/// One numeric series extracted from a [`PlotSpec`] trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

impl PlotSpec {
    /// Extract every trace of the plot's `data` array that carries numbers: `y` for line/bar
    /// traces, `close` for candlestick/OHLC traces. The plot spec may also arrive as a JSON
    /// encoded string.
    pub fn series(&self) -> Vec<Series> {
        let decoded;
        let root = match &self.0 {
            serde_json::Value::String(text) => match serde_json::from_str(text) {
                Ok(value) => {
                    decoded = value;
                    &decoded
                }
                Err(_) => return Vec::new(),
            },
            value => value,
        };

        let Some(traces) = root.get("data").and_then(|data| data.as_array()) else {
            return Vec::new();
        };

        traces
            .iter()
            .enumerate()
            .filter_map(|(index, trace)| {
                let values = trace
                    .get("y")
                    .or_else(|| trace.get("close"))
                    .and_then(|values| values.as_array())?;

                let points: Vec<(f64, f64)> = values
                    .iter()
                    .enumerate()
                    .filter_map(|(x, y)| Some((x as f64, y.as_f64()?)))
                    .collect();
                if points.is_empty() {
                    return None;
                }

                let name = trace
                    .get("name")
                    .and_then(|name| name.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("trace {}", index));

                Some(Series { name, points })
            })
            .collect()
    }
}

/// Anything that can answer a [`ChartRequest`].
#[async_trait]
pub trait ChartSource: Send + Sync {
    async fn fetch_chart(&self, request: &ChartRequest) -> Result<ChartResponse, ChartError>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base URL of the chart API
    pub base_url: Url,
    /// Per request timeout
    pub timeout: Duration,
}

impl FetchConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Error body returned by the chart API on failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        match (self.detail, self.error) {
            (Some(serde_json::Value::String(detail)), _) => Some(detail),
            (Some(detail), _) => Some(detail.to_string()),
            (None, error) => error,
        }
    }
}

/// [`ChartSource`] that POSTs to the chart API with reqwest.
#[derive(Debug, Clone)]
pub struct HttpChartSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpChartSource {
    pub fn new(config: FetchConfig) -> Result<Self, ChartError> {
        let endpoint = config
            .base_url
            .join(CHART_ENDPOINT)
            .map_err(|error| ChartError::Other(format!("invalid chart API url: {}", error)))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChartSource for HttpChartSource {
    async fn fetch_chart(&self, request: &ChartRequest) -> Result<ChartResponse, ChartError> {
        debug!(
            ticker = %request.ticker,
            indicators = request.indicators.len(),
            "requesting chart"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<ChartResponse>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::message)
            .unwrap_or_else(|| format!("HTTP error: {}", status));

        warn!(ticker = %request.ticker, %status, %message, "chart request failed");
        Err(ChartError::from_message(message, &request.ticker))
    }
}
