use crate::prelude::FetchError;
use log::{debug, info, warn};

/// Feed-scoped log sink used by refresh controllers.
#[derive(Debug, Clone)]
pub struct LogManager {
    scope: String,
}

impl LogManager {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.scope, message);
    }

    pub fn transition(&self, feed_id: &str, from: &str, to: &str, generation: u64) {
        debug!(
            "[{}] feed {} cycle {}: {} -> {}",
            self.scope, feed_id, generation, from, to
        );
    }

    pub fn superseded(&self, feed_id: &str, generation: u64) {
        debug!(
            "[{}] feed {} cycle {} superseded",
            self.scope, feed_id, generation
        );
    }

    pub fn stale(&self, feed_id: &str, generation: u64, current: u64) {
        debug!(
            "[{}] dropping stale result for feed {} (cycle {}, current {})",
            self.scope, feed_id, generation, current
        );
    }

    pub fn failure(&self, feed_id: &str, reason: &FetchError) {
        warn!(
            "[{}] feed {} failed ({}): {}",
            self.scope,
            feed_id,
            reason.kind(),
            reason
        );
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("refresh")
    }
}
