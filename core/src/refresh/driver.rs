use crate::prelude::PresentationSurface;
use crate::refresh::controller::RefreshController;
use crate::refresh::state::FeedState;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Runs a [`RefreshController`] on a tokio runtime.
///
/// The fetch runs as a spawned task; the outcome is applied under the
/// controller lock, so the surface is only ever touched by one thread at a
/// time. Every state change is mirrored into a watch channel.
pub struct RefreshDriver<P: PresentationSurface> {
    controller: Arc<Mutex<RefreshController<P>>>,
    state_tx: watch::Sender<FeedState>,
}

impl<P> RefreshDriver<P>
where
    P: PresentationSurface + Send + 'static,
{
    pub fn new(controller: RefreshController<P>) -> Self {
        let (state_tx, _) = watch::channel(controller.current_state().clone());
        Self {
            controller: Arc::new(Mutex::new(controller)),
            state_tx,
        }
    }

    fn lock(controller: &Mutex<RefreshController<P>>) -> MutexGuard<'_, RefreshController<P>> {
        controller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts a cycle and spawns its fetch. Must be called from within a tokio
    /// runtime. The handle resolves to whether the outcome was applied.
    pub fn start(&self, feed_id: &str) -> JoinHandle<bool> {
        let pending = {
            let mut controller = Self::lock(&self.controller);
            let pending = controller.start(feed_id);
            self.state_tx
                .send_replace(controller.current_state().clone());
            pending
        };

        let controller = Arc::clone(&self.controller);
        let state_tx = self.state_tx.clone();
        tokio::spawn(async move {
            let outcome = pending.run().await;
            let mut controller = Self::lock(&controller);
            let applied = controller.complete(outcome);
            if applied {
                state_tx.send_replace(controller.current_state().clone());
            }
            applied
        })
    }

    pub fn cancel(&self) {
        let mut controller = Self::lock(&self.controller);
        controller.cancel();
        self.state_tx
            .send_replace(controller.current_state().clone());
    }

    pub fn current_state(&self) -> FeedState {
        Self::lock(&self.controller).current_state().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state_tx.subscribe()
    }

    /// Read access to the controller, e.g. to inspect its surface.
    pub fn with_controller<R>(&self, f: impl FnOnce(&RefreshController<P>) -> R) -> R {
        f(&Self::lock(&self.controller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed_interface::{Category, Record};
    use crate::prelude::{FetchError, FetchResult, RemoteDataSource};
    use crate::refresh::controller::tests::{siren_a, RecordingSurface};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::oneshot;

    type Gate = oneshot::Receiver<FetchResult<Vec<Record>>>;

    /// Holds each feed's fetch until the test releases it.
    #[derive(Default)]
    struct GatedSource {
        gates: Mutex<HashMap<String, Gate>>,
    }

    impl GatedSource {
        fn gate(&self, feed: &str) -> oneshot::Sender<FetchResult<Vec<Record>>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(feed.to_string(), rx);
            tx
        }
    }

    #[async_trait]
    impl RemoteDataSource for GatedSource {
        async fn fetch(&self, feed_id: &str) -> FetchResult<Vec<Record>> {
            let gate = self.gates.lock().unwrap().remove(feed_id);
            match gate {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(FetchError::Timeout("gate dropped".into()))),
                None => Err(FetchError::ServerError(format!("no gate for {feed_id}"))),
            }
        }
    }

    fn beach(name: &str) -> Record {
        Record::new(name, "propria", Category::Beach).with_id(name)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_earlier_cycle_cannot_overwrite_later_one() {
        let source = Arc::new(GatedSource::default());
        let release_sirens = source.gate("sirens");
        let release_beaches = source.gate("beaches");
        let driver = RefreshDriver::new(RefreshController::new(
            source.clone(),
            RecordingSurface::default(),
        ));
        let mut states = driver.subscribe();

        let first = driver.start("sirens");
        let second = driver.start("beaches");
        assert_eq!(driver.current_state(), FeedState::Loading);

        release_beaches.send(Ok(vec![beach("leme")])).unwrap();
        assert!(second.await.unwrap());
        states.changed().await.unwrap();
        assert_eq!(*states.borrow(), FeedState::Loaded(vec![beach("leme")]));

        release_sirens.send(Ok(vec![siren_a()])).unwrap();
        assert!(!first.await.unwrap());
        assert_eq!(driver.current_state(), FeedState::Loaded(vec![beach("leme")]));
        assert_eq!(driver.with_controller(|c| c.surface().ready_calls()), 1);
    }

    #[tokio::test]
    async fn cancelled_cycle_result_is_ignored() {
        let source = Arc::new(GatedSource::default());
        let release = source.gate("sirens");
        let driver = RefreshDriver::new(RefreshController::new(
            source.clone(),
            RecordingSurface::default(),
        ));

        let handle = driver.start("sirens");
        driver.cancel();
        assert_eq!(*driver.subscribe().borrow(), FeedState::Idle);

        release.send(Ok(vec![siren_a()])).unwrap();
        assert!(!handle.await.unwrap());
        assert_eq!(driver.current_state(), FeedState::Idle);
        assert_eq!(driver.with_controller(|c| c.surface().ready_calls()), 0);
    }
}
