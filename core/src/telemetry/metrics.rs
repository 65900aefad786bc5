use std::sync::Mutex;

/// Counters for probe view activity.
pub struct MetricsRecorder {
    inner: Mutex<ViewMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewMetrics {
    pub refreshes: usize,
    pub toggles: usize,
    pub lookup_misses: usize,
    pub errors: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ViewMetrics::default()),
        }
    }

    fn bump(&self, update: impl FnOnce(&mut ViewMetrics)) {
        if let Ok(mut metrics) = self.inner.lock() {
            update(&mut metrics);
        }
    }

    pub fn record_refresh(&self) {
        self.bump(|m| m.refreshes += 1);
    }

    pub fn record_toggle(&self) {
        self.bump(|m| m.toggles += 1);
    }

    pub fn record_miss(&self) {
        self.bump(|m| m.lookup_misses += 1);
    }

    pub fn record_error(&self) {
        self.bump(|m| m.errors += 1);
    }

    pub fn snapshot(&self) -> ViewMetrics {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            ViewMetrics::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
