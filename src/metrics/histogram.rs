//! Latency histogram bounded to the last N samples (C2).

use std::collections::VecDeque;
use std::time::Duration;

/// A rolling window of latency samples with percentile/mean/min/max on read
/// plus an unbounded all-time sample count.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    capacity: usize,
    samples: VecDeque<Duration>,
    all_time_count: u64,
}

/// A point-in-time summary of a [`LatencyHistogram`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct LatencySnapshot {
    /// 50th percentile of the retained samples, in milliseconds.
    pub p50_ms: f64,
    /// 90th percentile of the retained samples, in milliseconds.
    pub p90_ms: f64,
    /// 99th percentile of the retained samples, in milliseconds.
    pub p99_ms: f64,
    /// Arithmetic mean of the retained samples, in milliseconds.
    pub mean_ms: f64,
    /// Minimum retained sample, in milliseconds.
    pub min_ms: f64,
    /// Maximum retained sample, in milliseconds.
    pub max_ms: f64,
    /// Number of samples currently retained (≤ capacity).
    pub retained_count: usize,
    /// Total number of samples ever recorded, including evicted ones.
    pub all_time_count: u64,
}

impl LatencyHistogram {
    /// Construct a histogram retaining at most `capacity` samples (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity.max(1)),
            all_time_count: 0,
        }
    }

    /// Record a single latency sample, evicting the oldest sample if at capacity.
    pub fn record(&mut self, duration: Duration) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
        self.all_time_count += 1;
    }

    /// Compute a [`LatencySnapshot`] by sorting the retained samples.
    pub fn snapshot(&self) -> LatencySnapshot {
        if self.samples.is_empty() {
            return LatencySnapshot {
                p50_ms: 0.0,
                p90_ms: 0.0,
                p99_ms: 0.0,
                mean_ms: 0.0,
                min_ms: 0.0,
                max_ms: 0.0,
                retained_count: 0,
                all_time_count: self.all_time_count,
            };
        }

        let mut sorted: Vec<f64> = self.samples.iter().map(Duration::as_secs_f64).map(|s| s * 1000.0).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let percentile = |p: f64| -> f64 {
            let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
            sorted[idx.min(sorted.len() - 1)]
        };

        let sum: f64 = sorted.iter().sum();
        LatencySnapshot {
            p50_ms: percentile(0.50),
            p90_ms: percentile(0.90),
            p99_ms: percentile(0.99),
            mean_ms: sum / sorted.len() as f64,
            min_ms: sorted[0],
            max_ms: sorted[sorted.len() - 1],
            retained_count: sorted.len(),
            all_time_count: self.all_time_count,
        }
    }
}
