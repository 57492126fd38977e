use std::sync::Mutex;

/// Counters shared by the refresh controllers and the favorites store.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub cycles_started: usize,
    pub cycles_succeeded: usize,
    pub cycles_failed: usize,
    pub cycles_cancelled: usize,
    pub stale_dropped: usize,
    pub persistence_failures: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    fn bump(&self, update: impl FnOnce(&mut Metrics)) {
        if let Ok(mut metrics) = self.inner.lock() {
            update(&mut metrics);
        }
    }

    pub fn record_started(&self) {
        self.bump(|m| m.cycles_started += 1);
    }

    pub fn record_succeeded(&self) {
        self.bump(|m| m.cycles_succeeded += 1);
    }

    pub fn record_failed(&self) {
        self.bump(|m| m.cycles_failed += 1);
    }

    pub fn record_cancelled(&self) {
        self.bump(|m| m.cycles_cancelled += 1);
    }

    pub fn record_stale(&self) {
        self.bump(|m| m.stale_dropped += 1);
    }

    pub fn record_persistence_failure(&self) {
        self.bump(|m| m.persistence_failures += 1);
    }

    pub fn snapshot(&self) -> Metrics {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            Metrics::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
