use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub const SNAPSHOT_VERSION: u32 = 1;

fn current_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Durable form of the favorite sets: feed name to starred ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteSnapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub feeds: BTreeMap<String, BTreeSet<String>>,
}

impl Default for FavoriteSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            feeds: BTreeMap::new(),
        }
    }
}

impl FavoriteSnapshot {
    pub fn from_sets(feeds: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            feeds: feeds
                .into_iter()
                .filter(|(_, ids)| !ids.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.values().all(BTreeSet::is_empty)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    #[error("i/o on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed favorites file: {0}")]
    Format(#[from] serde_json::Error),
    #[error("unsupported favorites format version {0}")]
    UnsupportedVersion(u32),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Local key-value storage for favorite sets.
pub trait FavoritesBackend: Send + Sync {
    fn load(&self) -> Result<FavoriteSnapshot, PersistenceError>;
    fn save(&self, snapshot: &FavoriteSnapshot) -> Result<(), PersistenceError>;
    fn describe(&self) -> String;
}

/// Stores favorites as a JSON document on disk.
///
/// Writes go to a sibling temp file first and are renamed into place. A
/// missing file loads as an empty snapshot.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl FavoritesBackend for JsonFileBackend {
    fn load(&self) -> Result<FavoriteSnapshot, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(FavoriteSnapshot::default())
            }
            Err(err) => return Err(self.io_error(err)),
        };
        if contents.trim().is_empty() {
            return Ok(FavoriteSnapshot::default());
        }
        let snapshot: FavoriteSnapshot = serde_json::from_str(&contents)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    fn save(&self, snapshot: &FavoriteSnapshot) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
            }
        }
        let body = serde_json::to_string_pretty(snapshot)?;
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        fs::write(&staging, body).map_err(|err| self.io_error(err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }
}

/// In-process backend; can be switched offline to exercise failure paths.
#[derive(Default)]
pub struct MemoryBackend {
    stored: Mutex<FavoriteSnapshot>,
    offline: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: FavoriteSnapshot) -> Self {
        Self {
            stored: Mutex::new(snapshot),
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Replaces the stored snapshot, as another process sharing the storage would.
    pub fn overwrite(&self, snapshot: FavoriteSnapshot) {
        if let Ok(mut stored) = self.stored.lock() {
            *stored = snapshot;
        }
    }

    fn check_online(&self) -> Result<(), PersistenceError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(PersistenceError::Unavailable("memory backend offline".into()))
        } else {
            Ok(())
        }
    }
}

impl FavoritesBackend for MemoryBackend {
    fn load(&self) -> Result<FavoriteSnapshot, PersistenceError> {
        self.check_online()?;
        self.stored
            .lock()
            .map(|stored| stored.clone())
            .map_err(|_| PersistenceError::Unavailable("memory backend poisoned".into()))
    }

    fn save(&self, snapshot: &FavoriteSnapshot) -> Result<(), PersistenceError> {
        self.check_online()?;
        let mut stored = self
            .stored
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory backend poisoned".into()))?;
        *stored = snapshot.clone();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> FavoriteSnapshot {
        let mut feeds = BTreeMap::new();
        feeds.insert(
            "sirens".to_string(),
            ["s2", "s1"].iter().map(|s| s.to_string()).collect(),
        );
        feeds.insert("beaches".to_string(), BTreeSet::new());
        FavoriteSnapshot::from_sets(feeds)
    }

    #[test]
    fn json_backend_round_trips_and_drops_empty_sets() {
        let dir = tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nested/favorites.json"));
        backend.save(&sample()).unwrap();

        let loaded = backend.load().unwrap();
        assert_eq!(loaded, sample());
        assert!(!loaded.feeds.contains_key("beaches"));

        let raw = std::fs::read_to_string(backend.path()).unwrap();
        assert!(raw.find("s1").unwrap() < raw.find("s2").unwrap());
    }

    #[test]
    fn json_backend_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("absent.json"));
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn json_backend_rejects_garbage_and_future_versions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        std::fs::write(&path, "not json").unwrap();
        let backend = JsonFileBackend::new(&path);
        assert!(matches!(backend.load(), Err(PersistenceError::Format(_))));

        std::fs::write(&path, r#"{"version": 9, "feeds": {}}"#).unwrap();
        assert!(matches!(
            backend.load(),
            Err(PersistenceError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn memory_backend_offline_fails_both_ways() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        assert!(backend.save(&sample()).is_err());
        assert!(backend.load().is_err());
        backend.set_offline(false);
        backend.save(&sample()).unwrap();
        assert_eq!(backend.load().unwrap(), sample());
    }
}
