//! Debounced chart refresh.
//!
//! Settings edits are pushed through a [`RefreshHandle`] into a background task which coalesces
//! bursts with a [`Debounce`] stream, tags every issued fetch with a sequence number and reports
//! back over a channel. [`ChartView`] applies outcomes, ignoring any that belong to a superseded
//! request.

use crate::{
    error::ChartError,
    fetch::{ChartRequest, ChartResponse, ChartSource},
    kpi::KpiData,
    settings::Settings,
};
use futures::{Stream, StreamExt};
use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, info, warn};

/// Default quiet period before an edit triggers a fetch.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Stream wrapper that only yields the latest item once `delay` has passed without a newer one.
///
/// When the inner stream ends, any pending item is yielded immediately.
#[derive(Debug)]
pub struct Debounce<S: Stream> {
    inner: S,
    delay: Duration,
    pending: Option<S::Item>,
    deadline: Pin<Box<tokio::time::Sleep>>,
    exhausted: bool,
}

impl<S: Stream> Debounce<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            pending: None,
            deadline: Box::pin(tokio::time::sleep(delay)),
            exhausted: false,
        }
    }
}

impl<S> Stream for Debounce<S>
where
    S: Stream + Unpin,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        while !this.exhausted {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(item)) => {
                    this.pending = Some(item);
                    this.deadline.as_mut().reset(Instant::now() + this.delay);
                }
                Poll::Ready(None) => this.exhausted = true,
                Poll::Pending => break,
            }
        }

        if this.exhausted {
            return Poll::Ready(this.pending.take());
        }

        if this.pending.is_none() {
            return Poll::Pending;
        }

        match this.deadline.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(this.pending.take()),
            Poll::Pending => Poll::Pending,
        }
    }
}

// Pending items are never pinned in place
impl<S: Stream + Unpin> Unpin for Debounce<S> {}

/// Progress of a sequenced chart fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshEvent {
    Started {
        seq: u64,
    },
    Finished {
        seq: u64,
        result: Result<ChartResponse, ChartError>,
    },
}

/// Sender side of the refresh task. Dropping every handle stops the task.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::UnboundedSender<Settings>,
}

impl RefreshHandle {
    /// Handle backed by a plain channel, for driving requests by hand.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Settings>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Schedule a fetch for `settings`, restarting the debounce timer. Returns false if the
    /// refresh task has stopped.
    pub fn request(&self, settings: Settings) -> bool {
        self.tx.send(settings).is_ok()
    }
}

/// Start the refresh task on the current tokio runtime.
pub fn spawn_refresh<S>(
    source: Arc<S>,
    debounce: Duration,
) -> (RefreshHandle, mpsc::UnboundedReceiver<RefreshEvent>)
where
    S: ChartSource + ?Sized + 'static,
{
    let (request_tx, mut request_rx) = mpsc::unbounded_channel::<Settings>();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let requests = futures::stream::poll_fn(move |cx| request_rx.poll_recv(cx));
    tokio::spawn(run_refresh(source, Debounce::new(requests, debounce), event_tx));

    (RefreshHandle { tx: request_tx }, event_rx)
}

async fn run_refresh<S, R>(
    source: Arc<S>,
    mut requests: R,
    event_tx: mpsc::UnboundedSender<RefreshEvent>,
) where
    S: ChartSource + ?Sized + 'static,
    R: Stream<Item = Settings> + Unpin,
{
    let mut seq = 0;

    while let Some(settings) = requests.next().await {
        seq += 1;
        let request = ChartRequest::from(&settings);
        debug!(seq, ticker = %request.ticker, "starting chart fetch");

        if event_tx.send(RefreshEvent::Started { seq }).is_err() {
            break;
        }

        let source = Arc::clone(&source);
        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch_chart(&request).await;
            if let Err(error) = &result {
                warn!(seq, %error, "chart fetch failed");
            }
            let _ = event_tx.send(RefreshEvent::Finished { seq, result });
        });
    }

    info!("chart refresh task stopped");
}

/// Outcome of [`ChartView::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    Failed,
    /// The outcome belongs to a superseded request and was ignored.
    Stale,
}

/// Chart shown to the user plus its loading and error state.
#[derive(Debug, Clone, Default)]
pub struct ChartView {
    chart: Option<ChartResponse>,
    previous: Option<ChartResponse>,
    loading: bool,
    error: Option<ChartError>,
    latest_seq: u64,
}

impl ChartView {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fetch with sequence number `seq` started. The current chart stays displayed as the
    /// previous chart until the outcome arrives.
    pub fn begin(&mut self, seq: u64) {
        self.latest_seq = seq;
        self.loading = true;
        self.error = None;
        if let Some(chart) = self.chart.take() {
            self.previous = Some(chart);
        }
    }

    pub fn finish(&mut self, seq: u64, result: Result<ChartResponse, ChartError>) -> Applied {
        if seq != self.latest_seq {
            debug!(seq, latest = self.latest_seq, "ignoring stale chart response");
            return Applied::Stale;
        }

        self.loading = false;
        match result {
            Ok(response) => {
                self.chart = Some(response);
                self.previous = None;
                Applied::Updated
            }
            Err(error) => {
                self.chart = None;
                self.previous = None;
                self.error = Some(error);
                Applied::Failed
            }
        }
    }

    /// Apply a [`RefreshEvent`].
    pub fn apply(&mut self, event: RefreshEvent) -> Option<Applied> {
        match event {
            RefreshEvent::Started { seq } => {
                self.begin(seq);
                None
            }
            RefreshEvent::Finished { seq, result } => Some(self.finish(seq, result)),
        }
    }

    /// Chart to draw: the latest one, or the previous one while a refresh is loading.
    pub fn displayed(&self) -> Option<&ChartResponse> {
        self.chart.as_ref().or(self.previous.as_ref())
    }

    pub fn is_showing_previous(&self) -> bool {
        self.chart.is_none() && self.previous.is_some()
    }

    pub fn kpis(&self) -> Option<&KpiData> {
        self.displayed()?.kpi_data.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&ChartError> {
        self.error.as_ref()
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fetch::PlotSpec, indicator::Panel};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use smol_str::SmolStr;

    fn response(label: &str) -> ChartResponse {
        ChartResponse {
            chart: PlotSpec(serde_json::json!({ "label": label })),
            kpi_data: None,
        }
    }

    /// Answers with the requested ticker after a per-ticker delay and records every request.
    #[derive(Default)]
    struct MockSource {
        delays: Vec<(&'static str, Duration)>,
        requests: Mutex<Vec<ChartRequest>>,
    }

    #[async_trait]
    impl ChartSource for MockSource {
        async fn fetch_chart(&self, request: &ChartRequest) -> Result<ChartResponse, ChartError> {
            self.requests.lock().push(request.clone());
            let delay = self
                .delays
                .iter()
                .find(|(ticker, _)| *ticker == request.ticker)
                .map(|(_, delay)| *delay)
                .unwrap_or_default();
            tokio::time::sleep(delay).await;

            if request.ticker == "ZZZZ" {
                return Err(ChartError::from_message("No data found for ticker ZZZZ", "ZZZZ"));
            }
            Ok(response(&request.ticker))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_yields_latest_after_quiet_period() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
        let delay = Duration::from_millis(300);
        let mut debounced = Debounce::new(
            futures::stream::poll_fn(move |cx| rx.poll_recv(cx)),
            delay,
        );

        tx.send(1).unwrap();
        tx.send(2).unwrap();
        tx.send(3).unwrap();

        let start = Instant::now();
        assert_eq!(debounced.next().await, Some(3));
        assert_eq!(start.elapsed(), delay);

        tx.send(4).unwrap();
        drop(tx);
        assert_eq!(debounced.next().await, Some(4));
        assert_eq!(debounced.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_issues_one_fetch() {
        let source = Arc::new(MockSource::default());
        let (handle, mut events) = spawn_refresh(Arc::clone(&source), DEFAULT_DEBOUNCE);

        let mut settings = Settings::new("AAPL");
        handle.request(settings.clone());
        settings.add_indicator("RSI");
        handle.request(settings.clone());
        settings.add_indicator("MACD");
        handle.request(settings.clone());

        assert_eq!(events.recv().await, Some(RefreshEvent::Started { seq: 1 }));
        match events.recv().await {
            Some(RefreshEvent::Finished { seq: 1, result }) => assert!(result.is_ok()),
            other => panic!("unexpected event: {:?}", other),
        }

        let requests = source.requests.lock();
        assert_eq!(requests.len(), 1);
        let panels: Vec<Panel> = requests[0].indicators.iter().map(|i| i.panel).collect();
        assert_eq!(panels, vec![Panel::Oscillator, Panel::Macd]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_response_is_ignored() {
        let source = Arc::new(MockSource {
            delays: vec![("SLOW", Duration::from_secs(5)), ("FAST", Duration::from_millis(10))],
            ..Default::default()
        });
        let (handle, mut events) = spawn_refresh(Arc::clone(&source), DEFAULT_DEBOUNCE);
        let mut view = ChartView::new();

        handle.request(Settings::new("SLOW"));
        let started = events.recv().await.unwrap();
        assert_eq!(view.apply(started), None);

        handle.request(Settings::new("FAST"));
        let mut outcomes = Vec::new();
        while outcomes.len() < 2 {
            if let Some(applied) = view.apply(events.recv().await.unwrap()) {
                outcomes.push(applied);
            }
        }

        assert_eq!(outcomes, vec![Applied::Updated, Applied::Stale]);
        assert_eq!(view.displayed(), Some(&response("FAST")));
        assert!(!view.is_loading());
    }

    #[test]
    fn test_chart_view_transitions() {
        let mut view = ChartView::new();

        view.begin(1);
        assert!(view.is_loading());
        assert_eq!(view.finish(1, Ok(response("a"))), Applied::Updated);

        view.begin(2);
        assert!(view.is_showing_previous());
        assert_eq!(view.displayed(), Some(&response("a")));

        let error = ChartError::TickerNotFound {
            ticker: SmolStr::new("ZZZZ"),
        };
        assert_eq!(view.finish(1, Err(error.clone())), Applied::Stale);
        assert!(view.is_loading());

        assert_eq!(view.finish(2, Err(error.clone())), Applied::Failed);
        assert_eq!(view.displayed(), None);
        assert_eq!(view.kpis(), None);
        assert_eq!(view.error(), Some(&error));

        view.begin(3);
        assert_eq!(view.error(), None);
        assert_eq!(view.latest_seq(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_reports_classified_error() {
        let source = Arc::new(MockSource::default());
        let (handle, mut events) = spawn_refresh(source, DEFAULT_DEBOUNCE);

        handle.request(Settings::new("ZZZZ"));
        let _ = events.recv().await;
        match events.recv().await {
            Some(RefreshEvent::Finished { result: Err(error), .. }) => assert_eq!(
                error,
                ChartError::TickerNotFound {
                    ticker: SmolStr::new("ZZZZ")
                }
            ),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
