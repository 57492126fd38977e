pub mod backend;
pub mod store;

pub use backend::{
    FavoriteSnapshot, FavoritesBackend, JsonFileBackend, MemoryBackend, PersistenceError,
};
pub use store::{FavoritesStore, ReconcileOutcome, StatusChange};
