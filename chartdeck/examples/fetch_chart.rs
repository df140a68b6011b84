use chartdeck::{DashboardConfig, HttpChartSource, RefreshEvent, Settings, spawn_refresh};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    // Initialise INFO Tracing log subscriber
    init_logging();

    let config = DashboardConfig::from_env();
    let source = match config.fetch_config().and_then(HttpChartSource::new) {
        Ok(source) => Arc::new(source),
        Err(error) => {
            warn!(%error, "invalid API configuration");
            return;
        }
    };

    let mut settings = Settings::new(&config.ticker);
    settings.add_indicator("SMA");
    settings.add_indicator("RSI");

    println!("\n📈 Fetching {} from {}...\n", settings.ticker(), config.api_url);

    let (refresh, mut events) = spawn_refresh(source, config.debounce);
    refresh.request(settings);

    while let Some(event) = events.recv().await {
        match event {
            RefreshEvent::Started { seq } => info!(seq, "fetch started"),
            RefreshEvent::Finished { seq, result: Ok(response) } => {
                for series in response.chart.series() {
                    info!(seq, series = %series.name, points = series.points.len(), "series");
                }
                for kpi in response.kpi_data.iter().flat_map(|data| &data.kpis) {
                    info!(group = %kpi.group, "{} => {}", kpi.name, kpi.value.display());
                }
                break;
            }
            RefreshEvent::Finished { seq, result: Err(error) } => {
                let message = error.user_message();
                warn!(seq, title = %message.title, "{}", message.detail);
                for suggestion in message.suggestions {
                    println!("  • {suggestion}");
                }
                break;
            }
        }
    }
}

// Initialise an INFO `Subscriber` for `Tracing` logs and install it as the global default.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(cfg!(debug_assertions))
        .init()
}
