//! Per-task and per-batch timing.

use std::time::Duration;

use tracing::info;

/// Timings and grid size of one task, or the merge of several.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfilingData {
    pub tasks: usize,
    /// Largest resampling factor seen.
    pub factor: u32,
    /// Largest layer width and height seen, after resampling.
    pub shape: (usize, usize),
    /// Time spent reading and resampling layers.
    pub extraction_time: Duration,
    /// Time spent in zonal statistics and writing rows.
    pub compute_time: Duration,
    pub total_time: Duration,
}

impl Default for ProfilingData {
    fn default() -> Self {
        Self {
            tasks: 0,
            factor: 1,
            shape: (0, 0),
            extraction_time: Duration::ZERO,
            compute_time: Duration::ZERO,
            total_time: Duration::ZERO,
        }
    }
}

impl ProfilingData {
    /// Fold another profile into this one: maxima for factor and shape,
    /// sums for counts and times.
    pub fn update(&mut self, other: &ProfilingData) {
        self.tasks += other.tasks;
        self.factor = self.factor.max(other.factor);
        self.shape = (self.shape.0.max(other.shape.0), self.shape.1.max(other.shape.1));
        self.extraction_time += other.extraction_time;
        self.compute_time += other.compute_time;
        self.total_time += other.total_time;
    }

    pub fn log(&self, label: &str) {
        info!(
            tasks = self.tasks,
            factor = self.factor,
            width = self.shape.0,
            height = self.shape.1,
            extraction_ms = self.extraction_time.as_millis() as u64,
            compute_ms = self.compute_time.as_millis() as u64,
            total_ms = self.total_time.as_millis() as u64,
            "{}",
            label
        );
    }
}
