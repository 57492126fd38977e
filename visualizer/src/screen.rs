use civiccore::feed_interface::{Feed, Record};
use civiccore::lifecycle::AppContext;
use civiccore::prelude::{FetchError, PresentationSurface, RemoteDataSource};
use civiccore::refresh::{FeedState, PendingCycle, RefreshController};
use std::sync::Arc;

/// What one feed screen currently shows.
#[derive(Debug, Default)]
pub struct ScreenSurface {
    pub loading: bool,
    pub records: Vec<Record>,
    pub error: Option<String>,
    pub refreshes: usize,
}

impl PresentationSurface for ScreenSurface {
    fn on_loading_started(&mut self) {
        self.loading = true;
    }

    fn on_data_ready(&mut self, records: &[Record]) {
        self.loading = false;
        self.error = None;
        self.records = records.to_vec();
        self.refreshes += 1;
    }

    fn on_load_failed(&mut self, reason: &FetchError) {
        self.loading = false;
        self.error = Some(reason.to_string());
    }
}

/// A screen is a controller plus its surface; nothing else.
pub struct FeedScreen {
    pub feed: Feed,
    controller: RefreshController<ScreenSurface>,
}

impl FeedScreen {
    pub fn new(app: &AppContext, feed: Feed, source: Arc<dyn RemoteDataSource>) -> Self {
        Self {
            feed,
            controller: app.controller(feed.id(), source, ScreenSurface::default()),
        }
    }

    pub fn appear(&mut self) -> PendingCycle {
        self.controller.start(self.feed.id())
    }

    /// Cancels any cycle in flight and drops the loading overlay.
    pub fn disappear(&mut self) {
        self.controller.cancel();
        self.controller.surface_mut().loading = false;
    }

    pub fn controller(&self) -> &RefreshController<ScreenSurface> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut RefreshController<ScreenSurface> {
        &mut self.controller
    }

    pub fn surface(&self) -> &ScreenSurface {
        self.controller.surface()
    }

    pub fn status_line(&self) -> String {
        match self.controller.current_state() {
            FeedState::Idle => format!("{}: idle", self.feed.title()),
            FeedState::Loading => format!("{}: loading...", self.feed.title()),
            FeedState::Loaded(records) => {
                format!("{}: {} records", self.feed.title(), records.len())
            }
            FeedState::Failed(reason) => {
                format!("{}: failed ({})", self.feed.title(), reason.kind())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use civiccore::favorites::MemoryBackend;
    use civiccore::feed_interface::Category;
    use civiccore::prelude::FetchResult;

    struct FixedSource(FetchResult<Vec<Record>>);

    #[async_trait]
    impl RemoteDataSource for FixedSource {
        async fn fetch(&self, _feed_id: &str) -> FetchResult<Vec<Record>> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn screen_surface_tracks_cycle() {
        let app = AppContext::launch(MemoryBackend::new());
        let records = vec![Record::new("Leme", "própria", Category::Beach).with_id("leme")];
        let mut screen = FeedScreen::new(&app, Feed::Beaches, Arc::new(FixedSource(Ok(records))));

        let pending = screen.appear();
        assert!(screen.surface().loading);
        screen.controller_mut().surface_mut().on_loading_started();
        assert!(screen.surface().loading);
        let outcome = pending.run().await;
        assert!(screen.controller_mut().complete(outcome));
        assert!(!screen.surface().loading);
        assert_eq!(screen.surface().records.len(), 1);
        assert_eq!(screen.status_line(), "Beaches: 1 records");
    }

    #[tokio::test]
    async fn disappearing_screen_ignores_late_result() {
        let app = AppContext::launch(MemoryBackend::new());
        let failure = FetchError::Timeout("slow".into());
        let mut screen =
            FeedScreen::new(&app, Feed::Sirens, Arc::new(FixedSource(Err(failure))));

        let pending = screen.appear();
        screen.disappear();
        let outcome = pending.run().await;
        assert!(!screen.controller_mut().complete(outcome));
        assert!(screen.surface().error.is_none());
        assert!(!screen.surface().loading);
        assert_eq!(screen.status_line(), "Sirens: idle");
    }
}
