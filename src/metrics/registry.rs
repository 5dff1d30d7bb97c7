//! Process-wide metrics registry (C2).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::error_rate::{ErrorRateSnapshot, ErrorRateTracker};
use super::histogram::{LatencyHistogram, LatencySnapshot};

const HISTOGRAM_CAPACITY: usize = 500;
const ERROR_WINDOW: Duration = Duration::from_secs(300);

struct Inner {
    started_at: Instant,
    histograms: HashMap<String, LatencyHistogram>,
    error_trackers: HashMap<String, ErrorRateTracker>,
    counters: HashMap<String, u64>,
}

/// Registry of per-operation latency histograms and error-rate trackers,
/// plus named process-wide counters.
pub struct MetricsRegistry {
    inner: Mutex<Inner>,
}

/// A full snapshot of the registry, suitable for exposing over a status API.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Seconds since the registry was constructed.
    pub uptime_secs: f64,
    /// Per-operation latency summaries.
    pub histograms: HashMap<String, LatencySnapshot>,
    /// Per-operation error-rate summaries.
    pub error_rates: HashMap<String, ErrorRateSnapshot>,
    /// Named process-wide counters.
    pub counters: HashMap<String, u64>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    /// Construct an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                started_at: Instant::now(),
                histograms: HashMap::new(),
                error_trackers: HashMap::new(),
                counters: HashMap::new(),
            }),
        }
    }

    /// Record a latency sample and success/failure outcome for `operation`.
    pub fn record_call(&self, operation: &str, duration: Duration, is_error: bool) {
        let mut inner = self.inner.lock();
        inner
            .histograms
            .entry(operation.to_string())
            .or_insert_with(|| LatencyHistogram::new(HISTOGRAM_CAPACITY))
            .record(duration);
        inner
            .error_trackers
            .entry(operation.to_string())
            .or_insert_with(|| ErrorRateTracker::new(ERROR_WINDOW))
            .record(is_error);
    }

    /// Increment a named counter by `delta`.
    pub fn increment(&self, name: &str, delta: u64) {
        let mut inner = self.inner.lock();
        *inner.counters.entry(name.to_string()).or_insert(0) += delta;
    }

    /// Current value of a named counter.
    pub fn counter(&self, name: &str) -> u64 {
        self.inner.lock().counters.get(name).copied().unwrap_or(0)
    }

    /// Capture a full snapshot of every tracked operation and counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut inner = self.inner.lock();
        let uptime_secs = inner.started_at.elapsed().as_secs_f64();

        let histograms = inner
            .histograms
            .iter()
            .map(|(k, v)| (k.clone(), v.snapshot()))
            .collect();

        let error_rates = inner
            .error_trackers
            .iter_mut()
            .map(|(k, v)| (k.clone(), v.snapshot()))
            .collect();

        MetricsSnapshot {
            uptime_secs,
            histograms,
            error_rates,
            counters: inner.counters.clone(),
        }
    }
}
