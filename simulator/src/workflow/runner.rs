use crate::gui_bridge::bridge::SharedCatalog;
use anyhow::Context;
use async_trait::async_trait;
use civiccore::favorites::MemoryBackend;
use civiccore::feed_interface::{decode_feed_body, Feed, Record, StatusLevel};
use civiccore::lifecycle::AppContext;
use civiccore::prelude::{FetchError, FetchResult, PresentationSurface, RemoteDataSource};
use civiccore::refresh::FeedState;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-process data source over the simulator catalog. Responses travel
/// through the same JSON encoding the HTTP bridge uses.
pub struct CatalogSource {
    catalog: SharedCatalog,
}

impl CatalogSource {
    pub fn new(catalog: SharedCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl RemoteDataSource for CatalogSource {
    async fn fetch(&self, feed_id: &str) -> FetchResult<Vec<Record>> {
        let feed = feed_id
            .parse::<Feed>()
            .map_err(|err| FetchError::ServerError(err.to_string()))?;
        let body = {
            let catalog = self
                .catalog
                .read()
                .map_err(|_| FetchError::ServerError("catalog lock poisoned".into()))?;
            let snapshot = catalog
                .snapshot(feed)
                .ok_or_else(|| FetchError::ServerError(format!("no snapshot for {}", feed)))?;
            serde_json::to_vec(snapshot).map_err(|err| FetchError::ServerError(err.to_string()))?
        };
        decode_feed_body(feed_id, &body)
    }
}

/// Surface that keeps the last published outcome for reporting.
#[derive(Default)]
pub struct ReportSurface {
    records: Vec<Record>,
    failure: Option<FetchError>,
}

impl PresentationSurface for ReportSurface {
    fn on_loading_started(&mut self) {
        self.failure = None;
    }

    fn on_data_ready(&mut self, records: &[Record]) {
        self.records = records.to_vec();
        self.failure = None;
    }

    fn on_load_failed(&mut self, reason: &FetchError) {
        self.failure = Some(reason.clone());
    }
}

pub struct WorkflowResult {
    pub feed: Feed,
    pub state: &'static str,
    pub record_count: usize,
    pub positioned: usize,
    pub levels: BTreeMap<StatusLevel, usize>,
    pub failure: Option<String>,
}

impl WorkflowResult {
    pub fn summary_line(&self) -> String {
        let levels = self
            .levels
            .iter()
            .map(|(level, count)| format!("{}={}", level, count))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "feed={} state={} records={} positioned={} levels=[{}] failure={}\n",
            self.feed,
            self.state,
            self.record_count,
            self.positioned,
            levels,
            self.failure.as_deref().unwrap_or("-")
        )
    }
}

/// Runs one refresh cycle per feed through the core controller.
#[derive(Clone)]
pub struct Runner {
    catalog: SharedCatalog,
}

impl Runner {
    pub fn new(catalog: SharedCatalog) -> Self {
        Self { catalog }
    }

    pub async fn execute(&self, app: &AppContext, feed: Feed) -> anyhow::Result<WorkflowResult> {
        let source: Arc<dyn RemoteDataSource> = Arc::new(CatalogSource::new(self.catalog.clone()));
        let mut controller = app.controller(feed.id(), source, ReportSurface::default());

        let outcome = controller.start(feed.id()).run().await;
        let applied = controller.complete(outcome);
        anyhow::ensure!(applied, "cycle for {} was not applied", feed);

        let surface = controller.surface();
        let mut levels = BTreeMap::new();
        for record in &surface.records {
            *levels.entry(record.status_level()).or_insert(0) += 1;
        }
        let result = WorkflowResult {
            feed,
            state: controller.current_state().label(),
            record_count: surface.records.len(),
            positioned: surface
                .records
                .iter()
                .filter(|record| record.coordinate().is_some())
                .count(),
            levels,
            failure: match controller.current_state() {
                FeedState::Failed(reason) => Some(reason.to_string()),
                _ => None,
            },
        };
        Ok(result)
    }

    pub async fn execute_all(&self) -> anyhow::Result<Vec<WorkflowResult>> {
        let app = AppContext::launch(MemoryBackend::new());
        let mut results = Vec::with_capacity(Feed::ALL.len());
        for feed in Feed::ALL {
            let result = self
                .execute(&app, feed)
                .await
                .with_context(|| format!("running offline cycle for {}", feed))?;
            results.push(result);
        }
        Ok(results)
    }
}
