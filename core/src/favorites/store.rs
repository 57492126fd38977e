use crate::favorites::backend::{FavoriteSnapshot, FavoritesBackend};
use crate::feed_interface::{Record, StatusLevel};
use crate::telemetry::MetricsRecorder;
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Status change of a starred record between two observed refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub feed: String,
    pub id: String,
    pub name: String,
    pub from: StatusLevel,
    pub to: StatusLevel,
}

/// What a foreground transition did with the persisted favorites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    LoadedFromStorage,
    KeptInMemory,
    StorageUnavailable,
}

#[derive(Default)]
struct FavoritesState {
    sets: BTreeMap<String, BTreeSet<String>>,
    dirty: bool,
    observed: HashMap<String, HashMap<String, StatusLevel>>,
}

impl FavoritesState {
    fn is_empty(&self) -> bool {
        self.sets.values().all(BTreeSet::is_empty)
    }
}

/// Process-wide starred identifiers, keyed by feed.
///
/// Constructed once by the application assembly and shared by `Arc`.
/// In-memory operations take effect synchronously; storage is only touched
/// by [`persist`](Self::persist) and [`reload`](Self::reload).
pub struct FavoritesStore {
    backend: Box<dyn FavoritesBackend>,
    state: RwLock<FavoritesState>,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl FavoritesStore {
    pub fn new(backend: impl FavoritesBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            state: RwLock::new(FavoritesState::default()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, FavoritesState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, FavoritesState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_favorite(&self, feed: &str, id: &str) -> bool {
        self.read()
            .sets
            .get(feed)
            .map(|ids| ids.contains(id))
            .unwrap_or(false)
    }

    /// Flips membership and returns whether `id` is now a favorite.
    pub fn toggle_favorite(&self, feed: &str, id: &str) -> bool {
        let mut state = self.write();
        let ids = state.sets.entry(feed.to_string()).or_default();
        let starred = if ids.remove(id) {
            false
        } else {
            ids.insert(id.to_string());
            true
        };
        state.dirty = true;
        debug!("favorite {}/{} -> {}", feed, id, starred);
        starred
    }

    pub fn add(&self, feed: &str, id: &str) {
        let mut state = self.write();
        if state
            .sets
            .entry(feed.to_string())
            .or_default()
            .insert(id.to_string())
        {
            state.dirty = true;
        }
    }

    pub fn remove(&self, feed: &str, id: &str) {
        let mut state = self.write();
        let removed = state
            .sets
            .get_mut(feed)
            .map(|ids| ids.remove(id))
            .unwrap_or(false);
        if removed {
            state.dirty = true;
        }
    }

    /// Sorted favorites of one feed.
    pub fn favorites(&self, feed: &str) -> Vec<String> {
        self.read()
            .sets
            .get(feed)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// True when in-memory changes have not been persisted yet.
    pub fn is_dirty(&self) -> bool {
        self.read().dirty
    }

    pub fn snapshot(&self) -> FavoriteSnapshot {
        FavoriteSnapshot::from_sets(self.read().sets.clone())
    }

    /// Records of `records` that are starred in `feed`.
    pub fn starred<'a>(&self, feed: &str, records: &'a [Record]) -> Vec<&'a Record> {
        let state = self.read();
        match state.sets.get(feed) {
            Some(ids) => records
                .iter()
                .filter(|record| ids.contains(&record.identity()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Cross-references a fresh record list with the starred set and reports
    /// starred records whose status level moved since the last observation.
    pub fn observe(&self, feed: &str, records: &[Record]) -> Vec<StatusChange> {
        let mut state = self.write();
        let starred = match state.sets.get(feed) {
            Some(ids) if !ids.is_empty() => ids.clone(),
            _ => {
                state.observed.remove(feed);
                return Vec::new();
            }
        };

        let previous = state.observed.remove(feed).unwrap_or_default();
        let mut current = HashMap::new();
        let mut changes = Vec::new();
        for record in records {
            let id = record.identity();
            if !starred.contains(&id) {
                continue;
            }
            let level = record.status_level();
            if let Some(&before) = previous.get(&id) {
                if before != level {
                    changes.push(StatusChange {
                        feed: feed.to_string(),
                        id: id.clone(),
                        name: record.display_name().to_string(),
                        from: before,
                        to: level,
                    });
                }
            }
            current.insert(id, level);
        }
        state.observed.insert(feed.to_string(), current);

        for change in &changes {
            info!(
                "starred {} in {} changed {} -> {}",
                change.name, change.feed, change.from, change.to
            );
        }
        changes
    }

    /// Writes the full set to storage. Failures are logged and contained; the
    /// in-memory set stays authoritative for the session.
    ///
    /// Storage is written without holding the lock; the dirty flag is only
    /// cleared when nothing changed while the write was in progress.
    pub fn persist(&self) -> bool {
        let snapshot = self.snapshot();
        match self.backend.save(&snapshot) {
            Ok(()) => {
                let mut state = self.write();
                if FavoriteSnapshot::from_sets(state.sets.clone()) == snapshot {
                    state.dirty = false;
                }
                drop(state);
                debug!(
                    "persisted {} favorite feed(s) to {}",
                    snapshot.feeds.len(),
                    self.backend.describe()
                );
                true
            }
            Err(err) => {
                error!(
                    "failed to persist favorites to {}: {}",
                    self.backend.describe(),
                    err
                );
                self.record_failure();
                false
            }
        }
    }

    /// Replaces the in-memory set with storage contents. On failure the
    /// in-memory set is left untouched.
    pub fn reload(&self) -> bool {
        match self.backend.load() {
            Ok(snapshot) => {
                let mut state = self.write();
                state.sets = snapshot.feeds;
                state.dirty = false;
                state.observed.clear();
                true
            }
            Err(err) => {
                warn!(
                    "failed to reload favorites from {}: {}",
                    self.backend.describe(),
                    err
                );
                self.record_failure();
                false
            }
        }
    }

    /// Foreground reconciliation: storage wins only when memory is empty.
    pub fn reconcile_on_foreground(&self) -> ReconcileOutcome {
        if !self.is_empty() {
            return ReconcileOutcome::KeptInMemory;
        }
        if self.reload() {
            ReconcileOutcome::LoadedFromStorage
        } else {
            ReconcileOutcome::StorageUnavailable
        }
    }

    fn record_failure(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_persistence_failure();
        }
    }
}
