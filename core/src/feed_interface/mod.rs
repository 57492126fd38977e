pub mod classify;
pub mod feed;
pub mod record;
pub mod wire;

pub use classify::{classify_status, Category, StatusLevel};
pub use feed::{Feed, FeedParseError};
pub use record::{Coordinate, CoordinateError, Record};
pub use wire::{decode_feed_body, FeedResponse, WireRecord};
