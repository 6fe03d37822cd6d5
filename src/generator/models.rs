use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::time::Duration;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// What happened to one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Written,
    Failed(String),
    Cancelled,
}

/// Sent by a worker once per job it pulled, whether the file made it or not.
#[derive(Debug, Clone)]
pub struct CompletionEvent {
    pub worker_id: usize,
    pub index: u64,
    pub target_path: PathBuf,
    pub bytes_written: u64,
    pub elapsed: Duration,
    pub outcome: JobOutcome,
}

/// Running totals owned by the progress aggregator. Only sums, so the order
/// events arrive in does not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub completed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub total_bytes: u64,
    pub total_elapsed: Duration,
}

impl RunStats {
    pub fn record(&mut self, event: &CompletionEvent) {
        self.completed += 1;
        match event.outcome {
            JobOutcome::Written => self.succeeded += 1,
            JobOutcome::Failed(_) => self.failed += 1,
            JobOutcome::Cancelled => self.cancelled += 1,
        }
        self.total_bytes += event.bytes_written;
        self.total_elapsed += event.elapsed;
    }

    /// MB/s over the summed per-file write time.
    pub fn throughput_mbps(&self) -> f64 {
        let secs = self.total_elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.total_bytes as f64 / BYTES_PER_MB / secs
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total_files: u64,
    pub jobs_scheduled: u64,
    pub stats: RunStats,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub wall_time: Duration,
    pub cancelled: bool,
}

impl RunSummary {
    /// Every requested file was written.
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.stats.failed == 0 && self.stats.succeeded == self.total_files
    }

    /// MB/s over wall-clock time, i.e. what the disk saw from all workers.
    pub fn wall_throughput_mbps(&self) -> f64 {
        let secs = self.wall_time.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.stats.total_bytes as f64 / BYTES_PER_MB / secs
    }
}
