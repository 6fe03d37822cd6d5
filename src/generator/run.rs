use chrono::{Local, SecondsFormat};
use crossbeam_channel::{Sender, bounded};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::models::RunSummary;
use super::pool::WorkerPool;
use super::progress::ProgressAggregator;
use super::{Generator, QUEUE_SLOTS_PER_WORKER, Shutdown};
use crate::config::human_readable_size;
use crate::error::GenerateError;
use crate::planner::{FileJob, PathPlan};
use crate::utils::{buffers_exceed_memory, detect_available_memory};

impl Generator {
    /// Generates every file in the request and blocks until the run is over.
    ///
    /// Individual file failures are logged and counted in the returned
    /// [`RunSummary`]; they never abort the run. `Err` is reserved for problems
    /// with the machinery itself (threads, pool).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use fileforge::generator::{GenerationRequest, Generator};
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let generator = Generator::new(GenerationRequest {
    ///     root_directory: ".out".into(),
    ///     start_index: 1,
    ///     end_index: 3,
    ///     file_size_bytes: 1024,
    ///     files_per_subdir: 10_000,
    ///     use_subdirs: false,
    ///     worker_count: 2,
    ///     buffer_size_bytes: 1024 * 1024,
    /// })?;
    /// let summary = generator.run()?;
    /// assert_eq!(summary.stats.succeeded, 3);
    /// # Ok(())
    /// # }
    /// ```
    pub fn run(&self) -> Result<RunSummary, GenerateError> {
        let request = &self.request;
        let total_files = request.total_files();
        let queue_capacity = request.worker_count * QUEUE_SLOTS_PER_WORKER;

        let available_memory = detect_available_memory();
        if buffers_exceed_memory(request.worker_count, request.buffer_size_bytes, available_memory) {
            warn!(
                "RUN | {} workers x {} buffers exceed half of the {} available memory",
                request.worker_count,
                human_readable_size(request.buffer_size_bytes as u64),
                human_readable_size(available_memory)
            );
        }

        let started_at = Local::now();
        let start = Instant::now();
        if self.show_progress {
            println!(
                "Starting file creation with {} workers at {}",
                request.worker_count,
                started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
            );
        }
        info!(
            "RUN | {} files of {} into {:?} (buffer {}, subdirs: {})",
            total_files,
            human_readable_size(request.file_size_bytes),
            request.root_directory,
            human_readable_size(request.buffer_size_bytes as u64),
            request.use_subdirs
        );

        let (job_tx, job_rx) = bounded::<FileJob>(queue_capacity);
        let (event_tx, event_rx) = bounded(queue_capacity);

        let aggregator =
            ProgressAggregator::new(total_files, &request.root_directory, self.show_progress);
        let aggregator_handle = thread::Builder::new()
            .name("fileforge-progress".to_string())
            .spawn(move || aggregator.consume(event_rx))
            .map_err(|source| GenerateError::Spawn {
                name: "progress",
                source,
            })?;

        let plan = request.plan();
        let producer_shutdown = self.shutdown.clone();
        let producer_handle = thread::Builder::new()
            .name("fileforge-producer".to_string())
            .spawn(move || produce_jobs(&plan, &job_tx, &producer_shutdown))
            .map_err(|source| GenerateError::Spawn {
                name: "producer",
                source,
            })?;

        let pool = WorkerPool::new(
            request.worker_count,
            request.file_size_bytes,
            request.buffer_size_bytes,
        );
        // hands over the last job receiver and event sender; both close when it returns
        let pool_result = pool.run(job_rx, event_tx, &self.shutdown);

        let jobs_scheduled = producer_handle
            .join()
            .map_err(|_| GenerateError::ThreadPanicked("producer"))?;
        let stats = aggregator_handle
            .join()
            .map_err(|_| GenerateError::ThreadPanicked("progress"))?;
        pool_result?;

        let finished_at = Local::now();
        let summary = RunSummary {
            total_files,
            jobs_scheduled,
            stats,
            started_at,
            finished_at,
            wall_time: start.elapsed(),
            cancelled: self.shutdown.is_requested(),
        };

        if self.show_progress {
            print_summary(&summary);
        }
        info!(
            "RUN | finished: {} written, {} failed, {} cancelled in {:.2?}",
            summary.stats.succeeded,
            summary.stats.failed,
            summary.stats.cancelled,
            summary.wall_time
        );

        Ok(summary)
    }
}

/// Queues one job per index in ascending order, blocking while the queue is
/// full. Returns how many jobs were queued. The queue closes when `jobs` is
/// dropped by the caller.
pub(crate) fn produce_jobs(plan: &PathPlan, jobs: &Sender<FileJob>, shutdown: &Shutdown) -> u64 {
    let mut scheduled = 0u64;
    for job in plan.jobs() {
        if shutdown.is_requested() {
            debug!("PRODUCER | shutdown requested after {} jobs", scheduled);
            break;
        }
        if jobs.send(job).is_err() {
            // every worker is gone, nobody left to hand jobs to
            warn!("PRODUCER | job queue closed after {} jobs", scheduled);
            break;
        }
        scheduled += 1;
    }
    debug!("PRODUCER | queued {} jobs", scheduled);
    scheduled
}

fn print_summary(summary: &RunSummary) {
    println!(
        "\nFinished file creation at {}",
        summary
            .finished_at
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    println!("Total time taken: {:.2?}", summary.wall_time);
    let mut files_line = format!(
        "Files written: {}/{} ({} failed",
        summary.stats.succeeded, summary.total_files, summary.stats.failed
    );
    if summary.cancelled {
        let skipped = summary
            .total_files
            .saturating_sub(summary.stats.succeeded + summary.stats.failed);
        files_line.push_str(&format!(", {} not written after cancellation", skipped));
    }
    println!("{})", files_line);
    println!(
        "Data written: {} ({:.2} MBps overall)",
        human_readable_size(summary.stats.total_bytes),
        summary.wall_throughput_mbps()
    );
}
