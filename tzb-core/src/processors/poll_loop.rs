//! PollLoop processor.
//!
//! The PollLoop is responsible for:
//! - Loading the starting watermark from the [`WatermarkStore`]
//! - Fetching activity newer than the watermark from the [`EventSource`]
//! - Rendering every event in `date` order through the [`MessageRenderer`]
//! - Posting non-suppressed messages to the [`MessageSink`]
//! - Advancing and persisting the watermark at the end of each cycle
//! - Sleeping between cycles until shutdown is signaled
//!
//! Fetch and post failures are logged and never stop the loop. A payload
//! that cannot be parsed is fatal, because there is no safe way to decide
//! which of its events were handled.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::events::{ActivityBatch, BatchError};
use crate::render::{MessageRenderer, Rendered};
use crate::transport::{EventSource, MessageSink};
use crate::watermark::{StartMode, WatermarkError, WatermarkStore};

/// Default wait between two cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Errors that stop the PollLoop.
#[derive(Debug, Error)]
pub enum PollError {
    /// The starting watermark could not be read.
    #[error(transparent)]
    Watermark(#[from] WatermarkError),

    /// A fetched or replayed payload could not be interpreted.
    #[error(transparent)]
    Batch(#[from] BatchError),
}

/// Knobs that change how the loop behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    /// Where the first cycle starts.
    pub start: StartMode,
    /// Render and log messages without posting them or persisting progress.
    pub dry_run: bool,
    /// Stop after one cycle.
    pub once: bool,
    /// Wait between cycles.
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            start: StartMode::Incremental,
            dry_run: false,
            once: false,
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Counters for one processed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Events in the batch.
    pub events: usize,
    /// Messages produced by the renderer.
    pub rendered: usize,
    /// Events the renderer chose not to announce.
    pub suppressed: usize,
    /// Messages accepted by the sink.
    pub posted: usize,
    /// Messages the sink rejected.
    pub failed: usize,
    /// `date` of the last event visited, suppressed or not.
    pub latest_seen: Option<String>,
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Processed(CycleReport),
    /// The source could not be reached; nothing was rendered.
    FetchFailed,
}

/// Moves activity from an [`EventSource`] to a [`MessageSink`].
///
/// The watermark is owned by [`run()`](PollLoop::run) and only ever moves
/// forward: it is replaced by the newest event date seen in a cycle when
/// that date is later than the current value.
pub struct PollLoop<S, K, W> {
    source: S,
    sink: K,
    store: W,
    renderer: MessageRenderer,
    options: PollOptions,
}

impl<S, K, W> PollLoop<S, K, W>
where
    S: EventSource,
    K: MessageSink,
    W: WatermarkStore,
{
    /// Create a new PollLoop with the built-in renderer.
    pub fn new(source: S, sink: K, store: W, options: PollOptions) -> Self {
        Self {
            source,
            sink,
            store,
            renderer: MessageRenderer::new(),
            options,
        }
    }

    /// Replace the renderer, e.g. one with extra handlers registered.
    pub fn with_renderer(mut self, renderer: MessageRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Run cycles until shutdown is signaled, or once in single-shot mode.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), PollError> {
        let mut watermark = self.store.load(self.options.start)?;
        info!(
            since = %watermark,
            start = ?self.options.start,
            dry_run = self.options.dry_run,
            "PollLoop started"
        );

        loop {
            match self.cycle(&watermark).await? {
                CycleOutcome::Processed(report) => {
                    log_report(&report);
                    if let Some(latest) = report.latest_seen {
                        self.advance(&mut watermark, latest);
                    }
                }
                CycleOutcome::FetchFailed => {
                    debug!(since = %watermark, "Watermark unchanged after failed fetch");
                }
            }

            if self.options.once {
                info!("Single cycle requested, stopping");
                break;
            }

            if self.sleep_or_shutdown(&mut shutdown_rx).await {
                info!("PollLoop received shutdown signal");
                break;
            }
        }

        info!("PollLoop shutdown complete");
        Ok(())
    }

    /// Process payloads read from files instead of the network source.
    ///
    /// Replayed events never move the watermark.
    pub async fn replay(
        &self,
        payloads: impl IntoIterator<Item = String>,
    ) -> Result<Vec<CycleReport>, PollError> {
        let mut reports = Vec::new();
        for (index, payload) in payloads.into_iter().enumerate() {
            debug!(index, payload = %payload, "Replaying activity payload");
            let batch = ActivityBatch::from_json(&payload)?;
            let report = self.process(batch).await;
            log_report(&report);
            reports.push(report);
        }
        Ok(reports)
    }

    /// One fetch → sort → render → emit pass. Persisting is left to the caller.
    pub async fn cycle(&self, since: &str) -> Result<CycleOutcome, PollError> {
        debug!(since, "Fetching activity");
        let payload = match self.source.fetch(since).await {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, since, "Failed to fetch activity");
                return Ok(CycleOutcome::FetchFailed);
            }
        };
        debug!(payload = %payload, "Fetched activity payload");

        let batch = ActivityBatch::from_json(&payload)?;
        Ok(CycleOutcome::Processed(self.process(batch).await))
    }

    /// Render and emit every event of `batch` in order.
    pub async fn process(&self, batch: ActivityBatch) -> CycleReport {
        let mut report = CycleReport {
            events: batch.len(),
            ..CycleReport::default()
        };

        for event in batch {
            // Suppressed events still count as handled.
            report.latest_seen = Some(event.date().to_owned());

            let message = match self.renderer.render(&event) {
                Rendered::Message(message) => message,
                Rendered::Suppressed => {
                    debug!(kind = event.kind(), date = event.date(), "Event suppressed");
                    report.suppressed += 1;
                    continue;
                }
            };
            report.rendered += 1;

            let content = message.body.replace('\n', "\t");
            if self.options.dry_run {
                info!(subject = %message.subject, content = %content, "Dry run, not posting");
                continue;
            }
            debug!(subject = %message.subject, content = %content, "Posting message");

            match self.sink.post(&message).await {
                Ok(()) => report.posted += 1,
                Err(e) => {
                    error!(
                        error = %e,
                        kind = event.kind(),
                        subject = %message.subject,
                        "Failed to post message"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Move the watermark forward to `latest` and persist it.
    fn advance(&self, watermark: &mut String, latest: String) {
        if latest.as_str() <= watermark.as_str() {
            debug!(%watermark, %latest, "No newer events, watermark unchanged");
            return;
        }

        match self.store.save(&latest) {
            Ok(()) => debug!(watermark = %latest, "Watermark advanced"),
            Err(e) => warn!(error = %e, watermark = %latest, "Failed to persist watermark"),
        }
        *watermark = latest;
    }

    /// Wait for the configured interval. Returns `true` if shutdown was
    /// requested in the meantime.
    async fn sleep_or_shutdown(&self, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
        if *shutdown_rx.borrow_and_update() {
            return true;
        }

        let sleep = tokio::time::sleep(self.options.interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => match changed {
                    Ok(()) if *shutdown_rx.borrow() => return true,
                    Ok(()) => continue,
                    // Nobody can signal shutdown any more; finish the wait.
                    Err(_) => {
                        (&mut sleep).await;
                        return false;
                    }
                },

                _ = &mut sleep => return false,
            }
        }
    }
}

fn log_report(report: &CycleReport) {
    if report.events == 0 {
        debug!("Cycle complete, no new events");
        return;
    }
    info!(
        events = report.events,
        rendered = report.rendered,
        suppressed = report.suppressed,
        posted = report.posted,
        failed = report.failed,
        latest = report.latest_seen.as_deref().unwrap_or_default(),
        "Cycle complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderedMessage;
    use crate::utils::timestamp::EPOCH_START;
    use crate::watermark::FileWatermarkStore;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tzb_sdk::client::ClientError;

    const START: &str = "2024-01-01T00:00:00.000Z";

    /// Replays queued responses; signals shutdown once the queue is drained.
    #[derive(Clone, Default)]
    struct FakeSource {
        responses: Arc<Mutex<VecDeque<Option<String>>>>,
        requested: Arc<Mutex<Vec<String>>>,
        shutdown_tx: Option<Arc<watch::Sender<bool>>>,
    }

    impl FakeSource {
        fn new(responses: Vec<Option<String>>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into())),
                ..Self::default()
            }
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventSource for FakeSource {
        async fn fetch(&self, since: &str) -> Result<String, ClientError> {
            self.requested.lock().unwrap().push(since.to_owned());
            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(Some(payload)) => Ok(payload),
                Some(None) => Err(ClientError::Api {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    body: "try again later".to_string(),
                }),
                None => {
                    if let Some(tx) = &self.shutdown_tx {
                        let _ = tx.send(true);
                    }
                    Ok(payload(vec![]))
                }
            }
        }
    }

    /// Records posted messages; rejects subjects listed in `reject`.
    #[derive(Clone, Default)]
    struct FakeSink {
        posted: Arc<Mutex<Vec<RenderedMessage>>>,
        reject: Vec<String>,
    }

    impl FakeSink {
        fn bodies(&self) -> Vec<String> {
            self.posted.lock().unwrap().iter().map(|m| m.body.clone()).collect()
        }
    }

    #[async_trait]
    impl MessageSink for FakeSink {
        async fn post(&self, message: &RenderedMessage) -> Result<(), ClientError> {
            if self.reject.contains(&message.subject) {
                return Err(ClientError::Api {
                    status: StatusCode::BAD_REQUEST,
                    body: "stream does not exist".to_string(),
                });
            }
            self.posted.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        stored: Arc<Mutex<Option<String>>>,
        saves: Arc<Mutex<Vec<String>>>,
    }

    impl MemoryStore {
        fn with(value: &str) -> Self {
            let store = Self::default();
            *store.stored.lock().unwrap() = Some(value.to_owned());
            store
        }

        fn saves(&self) -> Vec<String> {
            self.saves.lock().unwrap().clone()
        }
    }

    impl WatermarkStore for MemoryStore {
        fn load(&self, mode: StartMode) -> Result<String, WatermarkError> {
            Ok(match mode {
                StartMode::Backfill => EPOCH_START.to_owned(),
                StartMode::Incremental => self
                    .stored
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_else(|| START.to_owned()),
            })
        }

        fn save(&self, watermark: &str) -> Result<(), WatermarkError> {
            *self.stored.lock().unwrap() = Some(watermark.to_owned());
            self.saves.lock().unwrap().push(watermark.to_owned());
            Ok(())
        }
    }

    fn card_event(kind: &str, date: &str, name: &str, extra: Value) -> Value {
        let mut data = json!({
            "board": {"name": "Roadmap", "id": "b1"},
            "card": {"name": name, "id": name.to_lowercase().replace(' ', "-")}
        });
        if let (Some(data), Value::Object(extra)) = (data.as_object_mut(), extra) {
            data.extend(extra);
        }
        json!({
            "type": kind,
            "date": date,
            "memberCreator": {"fullName": "Alice"},
            "data": data
        })
    }

    fn payload(actions: Vec<Value>) -> String {
        json!({"boards": [{"name": "Roadmap", "actions": actions}]}).to_string()
    }

    fn once() -> PollOptions {
        PollOptions {
            once: true,
            ..PollOptions::default()
        }
    }

    fn no_shutdown() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    #[tokio::test]
    async fn test_single_cycle_posts_in_date_order_and_persists() {
        let source = FakeSource::new(vec![Some(payload(vec![
            card_event("createCard", "2024-01-01T00:00:03.000Z", "Third", json!({})),
            card_event("createCard", "2024-01-01T00:00:01.000Z", "First", json!({})),
            card_event("createCard", "2024-01-01T00:00:02.000Z", "Second", json!({})),
        ]))]);
        let sink = FakeSink::default();
        let store = MemoryStore::with(START);

        PollLoop::new(source.clone(), sink.clone(), store.clone(), once())
            .run(no_shutdown())
            .await
            .unwrap();

        assert_eq!(source.requested(), [START]);
        assert_eq!(
            sink.bodies(),
            [
                "Alice created card [First](https://trello.com/c/first)",
                "Alice created card [Second](https://trello.com/c/second)",
                "Alice created card [Third](https://trello.com/c/third)",
            ]
        );
        assert_eq!(store.saves(), ["2024-01-01T00:00:03.000Z"]);
    }

    #[tokio::test]
    async fn test_suppressed_event_advances_watermark() {
        let batch = payload(vec![
            card_event("createCard", "2024-01-01T00:00:01.000Z", "Card", json!({})),
            card_event(
                "updateCard",
                "2024-01-01T00:00:09.000Z",
                "Card",
                json!({"old": {"pos": 1.0}}),
            ),
        ]);
        let source = FakeSource::new(vec![Some(batch.clone()), Some(batch)]);
        let sink = FakeSink::default();
        let store = MemoryStore::with(START);

        let poll = PollLoop::new(source, sink.clone(), store.clone(), once());
        let CycleOutcome::Processed(report) = poll.cycle(START).await.unwrap() else {
            panic!("fetch failed");
        };
        assert_eq!(report.suppressed, 1);
        assert_eq!(report.posted, 1);
        assert_eq!(report.latest_seen.as_deref(), Some("2024-01-01T00:00:09.000Z"));

        poll.run(no_shutdown()).await.unwrap();
        assert_eq!(store.saves(), ["2024-01-01T00:00:09.000Z"]);
    }

    #[tokio::test]
    async fn test_cross_board_move_posts_once() {
        let data = json!({"boardTarget": {"name": "Sprint"}});
        let source = FakeSource::new(vec![Some(payload(vec![
            card_event("moveCardToBoard", "2024-01-01T00:00:05.000Z", "Card", data.clone()),
            card_event("moveCardFromBoard", "2024-01-01T00:00:05.000Z", "Card", data),
        ]))]);
        let sink = FakeSink::default();

        PollLoop::new(source, sink.clone(), MemoryStore::with(START), once())
            .run(no_shutdown())
            .await
            .unwrap();

        assert_eq!(
            sink.bodies(),
            ["Alice moved card [Card](https://trello.com/c/card) from **Roadmap** to **Sprint**"]
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_watermark() {
        let source = FakeSource::new(vec![None]);
        let sink = FakeSink::default();
        let store = MemoryStore::with(START);

        PollLoop::new(source, sink.clone(), store.clone(), once())
            .run(no_shutdown())
            .await
            .unwrap();

        assert!(sink.bodies().is_empty());
        assert!(store.saves().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_post_does_not_stop_batch() {
        let source = FakeSource::new(vec![Some(payload(vec![
            card_event("createCard", "2024-01-01T00:00:01.000Z", "Rejected", json!({})),
            card_event("createCard", "2024-01-01T00:00:02.000Z", "Accepted", json!({})),
        ]))]);
        let sink = FakeSink {
            reject: vec!["Rejected".to_string()],
            ..FakeSink::default()
        };
        let store = MemoryStore::with(START);

        let poll = PollLoop::new(source, sink.clone(), store.clone(), once());
        let CycleOutcome::Processed(report) = poll.cycle(START).await.unwrap() else {
            panic!("fetch failed");
        };
        assert_eq!(report.failed, 1);
        assert_eq!(report.posted, 1);
        assert_eq!(
            sink.bodies(),
            ["Alice created card [Accepted](https://trello.com/c/accepted)"]
        );
        assert_eq!(report.latest_seen.as_deref(), Some("2024-01-01T00:00:02.000Z"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_fatal() {
        let source = FakeSource::new(vec![Some("<html>502 Bad Gateway</html>".to_string())]);
        let store = MemoryStore::with(START);

        let result = PollLoop::new(source, FakeSink::default(), store.clone(), once())
            .run(no_shutdown())
            .await;

        assert!(matches!(result, Err(PollError::Batch(_))));
        assert!(store.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_watermark_only_moves_forward_until_shutdown() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut source = FakeSource::new(vec![
            Some(payload(vec![card_event(
                "createCard",
                "2024-01-02T00:00:00.000Z",
                "One",
                json!({}),
            )])),
            None,
            Some(payload(vec![])),
            Some(payload(vec![card_event(
                "createCard",
                "2024-01-03T00:00:00.000Z",
                "Two",
                json!({}),
            )])),
        ]);
        source.shutdown_tx = Some(Arc::new(shutdown_tx));
        let sink = FakeSink::default();
        let store = MemoryStore::with(START);

        let options = PollOptions {
            interval: Duration::from_secs(30),
            ..PollOptions::default()
        };
        PollLoop::new(source.clone(), sink.clone(), store.clone(), options)
            .run(shutdown_rx)
            .await
            .unwrap();

        assert_eq!(
            source.requested(),
            [
                START,
                "2024-01-02T00:00:00.000Z",
                "2024-01-02T00:00:00.000Z",
                "2024-01-02T00:00:00.000Z",
                "2024-01-03T00:00:00.000Z",
            ]
        );
        assert_eq!(
            store.saves(),
            ["2024-01-02T00:00:00.000Z", "2024-01-03T00:00:00.000Z"]
        );
        assert_eq!(sink.bodies().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_before_sleep_exits_cleanly() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();
        let source = FakeSource::new(vec![Some(payload(vec![]))]);
        let options = PollOptions {
            interval: Duration::from_secs(3600),
            ..PollOptions::default()
        };

        PollLoop::new(source.clone(), FakeSink::default(), MemoryStore::with(START), options)
            .run(shutdown_rx)
            .await
            .unwrap();

        assert_eq!(source.requested().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_sleep_ends_wait() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let source = FakeSource::new(vec![Some(payload(vec![]))]);
        let options = PollOptions {
            interval: Duration::from_secs(3600),
            ..PollOptions::default()
        };
        let poll = PollLoop::new(
            source.clone(),
            FakeSink::default(),
            MemoryStore::with(START),
            options,
        );
        let handle = tokio::spawn(poll.run(shutdown_rx));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.requested().len(), 1);

        let signaled_at = tokio::time::Instant::now();
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        assert!(signaled_at.elapsed() < Duration::from_secs(3600));
        assert_eq!(source.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_neither_posts_nor_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("date");
        let store = FileWatermarkStore::new(&path).with_dry_run(true);
        let source = FakeSource::new(vec![Some(payload(vec![card_event(
            "createCard",
            "2024-01-05T00:00:00.000Z",
            "Card",
            json!({}),
        )]))]);
        let sink = FakeSink::default();
        let options = PollOptions {
            dry_run: true,
            start: StartMode::Backfill,
            ..once()
        };

        PollLoop::new(source.clone(), sink.clone(), store, options)
            .run(no_shutdown())
            .await
            .unwrap();

        assert_eq!(source.requested(), [EPOCH_START]);
        assert!(sink.bodies().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_replay_posts_without_fetching_or_persisting() {
        let source = FakeSource::default();
        let sink = FakeSink::default();
        let store = MemoryStore::with(START);
        let poll = PollLoop::new(source.clone(), sink.clone(), store.clone(), once());

        let file = payload(vec![
            card_event("createCard", "2024-01-01T00:00:02.000Z", "B", json!({})),
            card_event("createCard", "2024-01-01T00:00:01.000Z", "A", json!({})),
        ]);
        let reports = poll.replay(vec![file.clone(), file]).await.unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0], reports[1]);
        assert!(source.requested().is_empty());
        assert!(store.saves().is_empty());
        assert_eq!(
            sink.bodies(),
            [
                "Alice created card [A](https://trello.com/c/a)",
                "Alice created card [B](https://trello.com/c/b)",
                "Alice created card [A](https://trello.com/c/a)",
                "Alice created card [B](https://trello.com/c/b)",
            ]
        );
    }

    #[tokio::test]
    async fn test_replay_rejects_malformed_file() {
        let poll = PollLoop::new(
            FakeSource::default(),
            FakeSink::default(),
            MemoryStore::default(),
            once(),
        );
        let result = poll.replay(vec![r#"{"boards": [{"actions": [{}]}]}"#.to_string()]).await;
        assert!(matches!(result, Err(PollError::Batch(BatchError::MissingField { .. }))));
    }
}
