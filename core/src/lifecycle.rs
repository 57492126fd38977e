use crate::favorites::{FavoritesBackend, FavoritesStore, ReconcileOutcome};
use crate::prelude::{PresentationSurface, RemoteDataSource};
use crate::refresh::RefreshController;
use crate::telemetry::MetricsRecorder;
use log::info;
use std::sync::Arc;

/// Top-level assembly of the shared services.
///
/// Built once at launch and handed to whichever screens need it; there is no
/// ambient global state. Background and foreground hooks run synchronously
/// and complete before returning.
pub struct AppContext {
    favorites: Arc<FavoritesStore>,
    metrics: Arc<MetricsRecorder>,
}

impl AppContext {
    /// Creates the shared services and loads persisted favorites.
    pub fn launch(backend: impl FavoritesBackend + 'static) -> Self {
        let metrics = Arc::new(MetricsRecorder::new());
        let favorites = Arc::new(FavoritesStore::new(backend).with_metrics(metrics.clone()));
        favorites.reload();
        Self { favorites, metrics }
    }

    pub fn favorites(&self) -> Arc<FavoritesStore> {
        Arc::clone(&self.favorites)
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        Arc::clone(&self.metrics)
    }

    /// Builds a screen controller wired to the shared favorites and metrics.
    pub fn controller<P: PresentationSurface>(
        &self,
        scope: &str,
        source: Arc<dyn RemoteDataSource>,
        surface: P,
    ) -> RefreshController<P> {
        RefreshController::new(source, surface)
            .with_scope(scope)
            .with_favorites(self.favorites())
            .with_metrics(self.metrics())
    }

    /// Flushes favorites. Returns whether storage accepted the write.
    pub fn enter_background(&self) -> bool {
        info!("entering background, flushing favorites");
        self.favorites.persist()
    }

    pub fn enter_foreground(&self) -> ReconcileOutcome {
        let outcome = self.favorites.reconcile_on_foreground();
        info!("entering foreground, favorites {:?}", outcome);
        outcome
    }
}
