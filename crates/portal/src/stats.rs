//! # Iteration Statistics
//!
//! Timing accumulator for application main-loop iterations.

use std::time::Duration;

use tracing::info;

/// Accumulated iteration timings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IterationStats {
    /// Iterations that ran the application.
    pub iterations: u64,
    /// Iterations skipped because the page was hidden.
    pub dropped: u64,
    /// Sum of iteration times.
    pub total_us_sum: u64,
    /// Shortest iteration.
    pub min_iteration_us: u64,
    /// Longest iteration.
    pub max_iteration_us: u64,
}

impl IterationStats {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            iterations: 0,
            dropped: 0,
            total_us_sum: 0,
            min_iteration_us: u64::MAX,
            max_iteration_us: 0,
        }
    }

    /// Records one completed iteration.
    pub fn record(&mut self, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.iterations += 1;
        self.total_us_sum = self.total_us_sum.saturating_add(us);
        self.min_iteration_us = self.min_iteration_us.min(us);
        self.max_iteration_us = self.max_iteration_us.max(us);
    }

    /// Records one skipped iteration.
    pub fn record_dropped(&mut self) {
        self.dropped += 1;
    }

    /// Average iteration time in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_iteration_ms(&self) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.iterations as f64) / 1000.0
    }

    /// Fraction of iterations that were skipped.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn drop_ratio(&self) -> f64 {
        let total = self.iterations + self.dropped;
        if total == 0 {
            return 0.0;
        }
        self.dropped as f64 / total as f64
    }

    /// Logs a one-line summary at `info`.
    #[allow(clippy::cast_precision_loss)]
    pub fn log_summary(&self) {
        let min_ms = if self.iterations == 0 {
            0.0
        } else {
            self.min_iteration_us as f64 / 1000.0
        };
        info!(
            iterations = self.iterations,
            dropped = self.dropped,
            drop_ratio = self.drop_ratio(),
            avg_ms = self.avg_iteration_ms(),
            min_ms,
            max_ms = self.max_iteration_us as f64 / 1000.0,
            "iteration statistics"
        );
    }
}

impl Default for IterationStats {
    fn default() -> Self {
        Self::new()
    }
}
