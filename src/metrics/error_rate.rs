//! Sliding-window error rate tracker (C2).

use std::collections::VecDeque;
use std::time::{Duration, Instant};

struct Sample {
    timestamp: Instant,
    is_error: bool,
}

/// Tracks the fraction of recent calls that errored, over a sliding window,
/// alongside all-time totals that never shrink.
pub struct ErrorRateTracker {
    window: Duration,
    samples: VecDeque<Sample>,
    all_time_total: u64,
    all_time_errors: u64,
}

/// A point-in-time summary of an [`ErrorRateTracker`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorRateSnapshot {
    /// Fraction (0.0–1.0) of calls within the window that errored.
    pub windowed_rate: f64,
    /// Number of calls within the window.
    pub windowed_total: u64,
    /// Number of errors within the window.
    pub windowed_errors: u64,
    /// Total calls ever recorded.
    pub all_time_total: u64,
    /// Total errors ever recorded.
    pub all_time_errors: u64,
}

impl ErrorRateTracker {
    /// Construct a tracker with the given sliding window duration.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
            all_time_total: 0,
            all_time_errors: 0,
        }
    }

    fn prune(&mut self) {
        while let Some(front) = self.samples.front() {
            if front.timestamp.elapsed() > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record the outcome of a single call.
    pub fn record(&mut self, is_error: bool) {
        self.prune();
        self.samples.push_back(Sample {
            timestamp: Instant::now(),
            is_error,
        });
        self.all_time_total += 1;
        if is_error {
            self.all_time_errors += 1;
        }
    }

    /// Prune expired samples and compute the current windowed rate alongside
    /// the all-time totals.
    pub fn snapshot(&mut self) -> ErrorRateSnapshot {
        self.prune();
        let windowed_total = self.samples.len() as u64;
        let windowed_errors = self.samples.iter().filter(|s| s.is_error).count() as u64;
        let windowed_rate = if windowed_total == 0 {
            0.0
        } else {
            windowed_errors as f64 / windowed_total as f64
        };

        ErrorRateSnapshot {
            windowed_rate,
            windowed_total,
            windowed_errors,
            all_time_total: self.all_time_total,
            all_time_errors: self.all_time_errors,
        }
    }
}
