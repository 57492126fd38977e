use crate::favorites::{FavoritesStore, StatusChange};
use crate::feed_interface::Record;
use crate::prelude::{FetchResult, PresentationSurface, RemoteDataSource};
use crate::refresh::state::{FeedEvent, FeedState};
use crate::telemetry::{LogManager, MetricsRecorder};
use std::sync::Arc;

/// Identifies one fetch cycle of one controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleTicket {
    feed_id: String,
    generation: u64,
}

impl CycleTicket {
    pub fn feed_id(&self) -> &str {
        &self.feed_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Fetch half of a cycle, free to run off the UI thread.
pub struct PendingCycle {
    ticket: CycleTicket,
    source: Arc<dyn RemoteDataSource>,
}

impl PendingCycle {
    pub fn ticket(&self) -> &CycleTicket {
        &self.ticket
    }

    /// Awaits the remote data source. Cancelling the controller does not
    /// abort this future; its outcome is simply ignored on completion.
    pub async fn run(self) -> CycleOutcome {
        let result = self.source.fetch(&self.ticket.feed_id).await;
        CycleOutcome {
            ticket: self.ticket,
            result,
        }
    }
}

/// Result of a finished fetch, to be handed back to [`RefreshController::complete`].
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    ticket: CycleTicket,
    result: FetchResult<Vec<Record>>,
}

impl CycleOutcome {
    pub fn ticket(&self) -> &CycleTicket {
        &self.ticket
    }

    pub fn result(&self) -> &FetchResult<Vec<Record>> {
        &self.result
    }
}

/// Drives one screen's fetch cycles and keeps its [`FeedState`] and
/// presentation surface consistent with the latest started cycle.
///
/// Only the most recently started, not cancelled, cycle may change state;
/// outcomes of superseded or cancelled cycles are dropped when they arrive.
pub struct RefreshController<P: PresentationSurface> {
    source: Arc<dyn RemoteDataSource>,
    surface: P,
    state: FeedState,
    generation: u64,
    active: Option<CycleTicket>,
    last_feed: Option<String>,
    favorites: Option<Arc<FavoritesStore>>,
    status_changes: Vec<StatusChange>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl<P: PresentationSurface> RefreshController<P> {
    pub fn new(source: Arc<dyn RemoteDataSource>, surface: P) -> Self {
        Self {
            source,
            surface,
            state: FeedState::Idle,
            generation: 0,
            active: None,
            last_feed: None,
            favorites: None,
            status_changes: Vec::new(),
            metrics: Arc::new(MetricsRecorder::new()),
            logger: LogManager::default(),
        }
    }

    pub fn with_favorites(mut self, favorites: Arc<FavoritesStore>) -> Self {
        self.favorites = Some(favorites);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.logger = LogManager::new(scope);
        self
    }

    /// Begins a new cycle for `feed_id`, superseding any cycle in flight.
    pub fn start(&mut self, feed_id: &str) -> PendingCycle {
        self.generation += 1;
        let ticket = CycleTicket {
            feed_id: feed_id.to_string(),
            generation: self.generation,
        };
        if let Some(previous) = self.active.replace(ticket.clone()) {
            self.logger.superseded(&previous.feed_id, previous.generation);
        }
        self.last_feed = Some(feed_id.to_string());
        self.apply(feed_id, FeedEvent::Start);
        self.metrics.record_started();
        self.surface.on_loading_started();

        PendingCycle {
            ticket,
            source: Arc::clone(&self.source),
        }
    }

    /// Marks the in-flight cycle stale and returns to `Idle`. No-op unless loading.
    pub fn cancel(&mut self) {
        let Some(ticket) = self.active.take() else {
            return;
        };
        self.apply(&ticket.feed_id, FeedEvent::Cancel);
        self.metrics.record_cancelled();
    }

    /// Applies a finished fetch if it belongs to the live cycle. Returns
    /// whether the outcome changed state.
    pub fn complete(&mut self, outcome: CycleOutcome) -> bool {
        if self.active.as_ref() != Some(&outcome.ticket) {
            self.logger.stale(
                &outcome.ticket.feed_id,
                outcome.ticket.generation,
                self.generation,
            );
            self.metrics.record_stale();
            return false;
        }
        self.active = None;

        let CycleOutcome { ticket, result } = outcome;
        match result {
            Ok(records) => {
                self.status_changes = match &self.favorites {
                    Some(favorites) => favorites.observe(&ticket.feed_id, &records),
                    None => Vec::new(),
                };
                self.logger.record(&format!(
                    "feed {} loaded {} record(s)",
                    ticket.feed_id,
                    records.len()
                ));
                self.apply(&ticket.feed_id, FeedEvent::Succeed(records));
                self.metrics.record_succeeded();
                if let FeedState::Loaded(records) = &self.state {
                    self.surface.on_data_ready(records);
                }
            }
            Err(reason) => {
                self.logger.failure(&ticket.feed_id, &reason);
                self.metrics.record_failed();
                self.apply(&ticket.feed_id, FeedEvent::Fail(reason.clone()));
                self.surface.on_load_failed(&reason);
            }
        }
        true
    }

    pub fn current_state(&self) -> &FeedState {
        &self.state
    }

    /// Feed of the most recent `start`, if any.
    pub fn feed_id(&self) -> Option<&str> {
        self.last_feed.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.active.is_some()
    }

    /// Starred records whose status level moved in the last applied refresh.
    pub fn status_changes(&self) -> &[StatusChange] {
        &self.status_changes
    }

    pub fn surface(&self) -> &P {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut P {
        &mut self.surface
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    fn apply(&mut self, feed_id: &str, event: FeedEvent) {
        let from = self.state.label();
        let state = std::mem::take(&mut self.state);
        self.state = state.next(event);
        self.logger
            .transition(feed_id, from, self.state.label(), self.generation);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::favorites::MemoryBackend;
    use crate::feed_interface::Category;
    use crate::prelude::FetchError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum SurfaceEvent {
        Loading,
        Ready(Vec<Record>),
        Failed(FetchError),
    }

    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        pub events: Vec<SurfaceEvent>,
    }

    impl RecordingSurface {
        pub fn ready_calls(&self) -> usize {
            self.events
                .iter()
                .filter(|e| matches!(e, SurfaceEvent::Ready(_)))
                .count()
        }
    }

    impl PresentationSurface for RecordingSurface {
        fn on_loading_started(&mut self) {
            self.events.push(SurfaceEvent::Loading);
        }

        fn on_data_ready(&mut self, records: &[Record]) {
            self.events.push(SurfaceEvent::Ready(records.to_vec()));
        }

        fn on_load_failed(&mut self, reason: &FetchError) {
            self.events.push(SurfaceEvent::Failed(reason.clone()));
        }
    }

    /// Answers each feed with a queue of canned responses, in call order.
    #[derive(Default)]
    pub(crate) struct CannedSource {
        responses: Mutex<HashMap<String, Vec<FetchResult<Vec<Record>>>>>,
    }

    impl CannedSource {
        pub fn push(&self, feed: &str, response: FetchResult<Vec<Record>>) {
            self.responses
                .lock()
                .unwrap()
                .entry(feed.to_string())
                .or_default()
                .push(response);
        }
    }

    #[async_trait]
    impl RemoteDataSource for CannedSource {
        async fn fetch(&self, feed_id: &str) -> FetchResult<Vec<Record>> {
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(feed_id) {
                Some(queue) if !queue.is_empty() => queue.remove(0),
                _ => Err(FetchError::ServerError(format!("no canned response for {feed_id}"))),
            }
        }
    }

    pub(crate) fn siren_a() -> Record {
        Record::new("Sirene A", "ativa", Category::Siren).with_id("s1")
    }

    fn beach(id: &str) -> Record {
        Record::new(id, "própria", Category::Beach).with_id(id)
    }

    fn controller(source: Arc<CannedSource>) -> RefreshController<RecordingSurface> {
        RefreshController::new(source, RecordingSurface::default())
    }

    #[tokio::test]
    async fn idle_start_success_publishes_once() {
        let source = Arc::new(CannedSource::default());
        source.push("sirens", Ok(vec![siren_a()]));
        let mut controller = controller(source);
        assert_eq!(controller.current_state(), &FeedState::Idle);

        let pending = controller.start("sirens");
        assert_eq!(controller.current_state(), &FeedState::Loading);
        let outcome = pending.run().await;
        assert!(controller.complete(outcome));

        assert_eq!(controller.current_state(), &FeedState::Loaded(vec![siren_a()]));
        assert_eq!(controller.surface().ready_calls(), 1);
        assert_eq!(
            controller.surface().events,
            vec![SurfaceEvent::Loading, SurfaceEvent::Ready(vec![siren_a()])]
        );
    }

    #[tokio::test]
    async fn cancel_while_loading_discards_late_success() {
        let source = Arc::new(CannedSource::default());
        source.push("sirens", Ok(vec![siren_a()]));
        let mut controller = controller(source);

        let pending = controller.start("sirens");
        controller.cancel();
        assert_eq!(controller.current_state(), &FeedState::Idle);

        let outcome = pending.run().await;
        assert!(!controller.complete(outcome));
        assert_eq!(controller.current_state(), &FeedState::Idle);
        assert_eq!(controller.surface().ready_calls(), 0);
        assert_eq!(controller.metrics().snapshot().stale_dropped, 1);
    }

    #[test]
    fn cancel_on_idle_is_a_no_op() {
        let mut controller = controller(Arc::new(CannedSource::default()));
        controller.cancel();
        assert_eq!(controller.current_state(), &FeedState::Idle);
        assert!(controller.surface().events.is_empty());
        assert_eq!(controller.metrics().snapshot().cycles_cancelled, 0);
    }

    #[tokio::test]
    async fn failure_then_manual_retry_loads() {
        let source = Arc::new(CannedSource::default());
        source.push(
            "beaches",
            Err(FetchError::NetworkUnreachable("offline".into())),
        );
        source.push("beaches", Ok(vec![beach("leme")]));
        let mut controller = controller(source);

        let outcome = controller.start("beaches").run().await;
        assert!(controller.complete(outcome));
        assert_eq!(
            controller.current_state(),
            &FeedState::Failed(FetchError::NetworkUnreachable("offline".into()))
        );
        let failures = controller
            .surface()
            .events
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::Failed(_)))
            .count();
        assert_eq!(failures, 1);

        let outcome = controller.start("beaches").run().await;
        assert!(controller.complete(outcome));
        assert_eq!(controller.current_state(), &FeedState::Loaded(vec![beach("leme")]));
    }

    #[tokio::test]
    async fn empty_success_is_loaded_not_failed() {
        let source = Arc::new(CannedSource::default());
        source.push("beaches", Ok(Vec::new()));
        let mut controller = controller(source);
        let outcome = controller.start("beaches").run().await;
        controller.complete(outcome);
        assert_eq!(controller.current_state(), &FeedState::Loaded(Vec::new()));
    }

    #[tokio::test]
    async fn last_start_wins_over_last_finish() {
        let source = Arc::new(CannedSource::default());
        source.push("beaches", Ok(vec![beach("first")]));
        source.push("beaches", Ok(vec![beach("second")]));
        let mut controller = controller(source);

        let first = controller.start("beaches");
        let second = controller.start("beaches");
        let first_outcome = first.run().await;
        let second_outcome = second.run().await;

        assert!(controller.complete(second_outcome));
        assert!(!controller.complete(first_outcome));
        assert_eq!(
            controller.current_state(),
            &FeedState::Loaded(vec![beach("second")])
        );
        assert_eq!(controller.surface().ready_calls(), 1);
    }

    #[derive(Clone, Copy, Debug)]
    enum Op {
        Start(&'static str),
        Cancel,
    }

    fn permutations(items: Vec<usize>) -> Vec<Vec<usize>> {
        if items.len() <= 1 {
            return vec![items];
        }
        let mut all = Vec::new();
        for (i, &head) in items.iter().enumerate() {
            let mut rest = items.clone();
            rest.remove(i);
            for mut tail in permutations(rest) {
                tail.insert(0, head);
                all.push(tail);
            }
        }
        all
    }

    #[tokio::test]
    async fn settled_state_matches_last_live_start_for_every_completion_order() {
        let scripts: Vec<Vec<Op>> = vec![
            vec![Op::Start("a"), Op::Start("b"), Op::Start("c")],
            vec![Op::Start("a"), Op::Start("b"), Op::Cancel],
            vec![Op::Start("a"), Op::Cancel, Op::Start("b"), Op::Start("c")],
            vec![Op::Cancel, Op::Start("a"), Op::Start("b"), Op::Cancel, Op::Start("c")],
            vec![Op::Start("a"), Op::Cancel, Op::Cancel],
        ];

        for script in scripts {
            let started: Vec<&str> = script
                .iter()
                .filter_map(|op| match op {
                    Op::Start(feed) => Some(*feed),
                    Op::Cancel => None,
                })
                .collect();
            let expected = match script.last() {
                Some(Op::Start(feed)) => FeedState::Loaded(vec![beach(feed)]),
                _ => FeedState::Idle,
            };

            for order in permutations((0..started.len()).collect()) {
                let source = Arc::new(CannedSource::default());
                for feed in &started {
                    source.push(feed, Ok(vec![beach(feed)]));
                }
                let mut controller = controller(source);
                let mut pending = Vec::new();
                for op in &script {
                    match op {
                        Op::Start(feed) => pending.push(Some(controller.start(feed))),
                        Op::Cancel => controller.cancel(),
                    }
                }
                for index in order {
                    if let Some(cycle) = pending[index].take() {
                        let outcome = cycle.run().await;
                        controller.complete(outcome);
                    }
                }
                assert_eq!(
                    controller.current_state(),
                    &expected,
                    "script {:?}",
                    script
                );
            }
        }
    }

    #[tokio::test]
    async fn favorites_are_cross_referenced_on_success() {
        let favorites = Arc::new(FavoritesStore::new(MemoryBackend::new()));
        favorites.add("sirens", "s1");
        let source = Arc::new(CannedSource::default());
        source.push("sirens", Ok(vec![siren_a()]));
        source.push(
            "sirens",
            Ok(vec![Record::new("Sirene A", "acionada", Category::Siren).with_id("s1")]),
        );
        let mut controller = controller(source).with_favorites(favorites);

        let outcome = controller.start("sirens").run().await;
        controller.complete(outcome);
        assert!(controller.status_changes().is_empty());

        let outcome = controller.start("sirens").run().await;
        controller.complete(outcome);
        assert_eq!(controller.status_changes().len(), 1);
        assert_eq!(controller.status_changes()[0].id, "s1");
    }
}
