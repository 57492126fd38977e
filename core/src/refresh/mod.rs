pub mod controller;
pub mod driver;
pub mod state;

pub use controller::{CycleOutcome, CycleTicket, PendingCycle, RefreshController};
pub use driver::RefreshDriver;
pub use state::{FeedEvent, FeedState};
