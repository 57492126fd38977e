use crate::feed_interface::Record;
use crate::prelude::FetchError;

/// Live state of one screen's feed.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FeedState {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<Record>),
    Failed(FetchError),
}

/// Inputs to the feed state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Start,
    Succeed(Vec<Record>),
    Fail(FetchError),
    Cancel,
}

impl FeedState {
    pub fn label(&self) -> &'static str {
        match self {
            FeedState::Idle => "idle",
            FeedState::Loading => "loading",
            FeedState::Loaded(_) => "loaded",
            FeedState::Failed(_) => "failed",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, FeedState::Loading)
    }

    pub fn records(&self) -> Option<&[Record]> {
        match self {
            FeedState::Loaded(records) => Some(records),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&FetchError> {
        match self {
            FeedState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Total transition function. Events that do not apply to the current
    /// state leave it unchanged.
    pub fn next(self, event: FeedEvent) -> FeedState {
        match (self, event) {
            (_, FeedEvent::Start) => FeedState::Loading,
            (FeedState::Loading, FeedEvent::Succeed(records)) => FeedState::Loaded(records),
            (FeedState::Loading, FeedEvent::Fail(reason)) => FeedState::Failed(reason),
            (FeedState::Loading, FeedEvent::Cancel) => FeedState::Idle,
            (state, _) => state,
        }
    }
}
