//! Feed refresh and favorites core for the civic operations-center client.
//!
//! Screens are built by composition: a [`refresh::RefreshController`] drives
//! fetch cycles against a [`prelude::RemoteDataSource`] and publishes to a
//! [`prelude::PresentationSurface`], while a single explicitly constructed
//! [`favorites::FavoritesStore`] is shared by every screen that needs it.

pub mod favorites;
pub mod feed_interface;
pub mod lifecycle;
pub mod prelude;
pub mod refresh;
pub mod telemetry;

pub use prelude::{FetchError, FetchResult, PresentationSurface, RemoteDataSource};
