use crossbeam_channel::{Receiver, Sender};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::Shutdown;
use super::models::{CompletionEvent, JobOutcome};
use super::writer::FileWriter;
use crate::error::{GenerateError, WriteError};
use crate::planner::FileJob;

/// A fixed number of workers that drain the job queue until it is closed.
pub struct WorkerPool {
    workers: usize,
    file_size: u64,
    buffer_size: usize,
}

impl WorkerPool {
    pub fn new(workers: usize, file_size: u64, buffer_size: usize) -> Self {
        WorkerPool {
            workers: workers.max(1),
            file_size,
            buffer_size,
        }
    }

    /// Runs every worker to completion and returns once all of them have
    /// exited. Dropping `events` on return is what closes the event queue.
    pub fn run(
        &self,
        jobs: Receiver<FileJob>,
        events: Sender<CompletionEvent>,
        shutdown: &Shutdown,
    ) -> Result<(), GenerateError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("fileforge-worker-{}", i))
            .build()?;

        info!("POOL | starting {} workers", self.workers);
        pool.scope(|scope| {
            for worker_id in 0..self.workers {
                let jobs = jobs.clone();
                let events = events.clone();
                scope.spawn(move |_| self.work(worker_id, jobs, events, shutdown));
            }
        });
        info!("POOL | all workers exited");

        Ok(())
    }

    fn work(
        &self,
        worker_id: usize,
        jobs: Receiver<FileJob>,
        events: Sender<CompletionEvent>,
        shutdown: &Shutdown,
    ) {
        let mut writer = FileWriter::new(self.buffer_size);
        let mut processed = 0u64;

        while let Ok(job) = jobs.recv() {
            if shutdown.is_requested() {
                debug!("WORKER {} | shutdown requested, leaving queue", worker_id);
                break;
            }

            let event = self.process(worker_id, &mut writer, job, shutdown);
            processed += 1;
            if events.send(event).is_err() {
                warn!("WORKER {} | progress channel closed", worker_id);
            }
        }

        debug!("WORKER {} | exiting after {} jobs", worker_id, processed);
    }

    fn process(
        &self,
        worker_id: usize,
        writer: &mut FileWriter,
        job: FileJob,
        shutdown: &Shutdown,
    ) -> CompletionEvent {
        let start = Instant::now();
        let result = writer.write(&job.target_path, self.file_size, shutdown);
        let elapsed = start.elapsed();

        let (bytes_written, outcome) = match result {
            Ok(bytes) => (bytes, JobOutcome::Written),
            Err(WriteError::Cancelled { .. }) => {
                debug!("WORKER {} | cancelled {:?}", worker_id, job.target_path);
                (0, JobOutcome::Cancelled)
            }
            Err(e) => {
                error!("WORKER {} | {}", worker_id, e);
                (0, JobOutcome::Failed(e.to_string()))
            }
        };

        CompletionEvent {
            worker_id,
            index: job.index,
            target_path: job.target_path,
            bytes_written,
            elapsed,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, unbounded};
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn queue_jobs(root: &std::path::Path, count: u64) -> Receiver<FileJob> {
        let (tx, rx) = unbounded();
        for index in 1..=count {
            tx.send(FileJob {
                index,
                target_path: root.join(format!("file_{}.bin", index)),
            })
            .unwrap();
        }
        rx
    }

    #[test]
    fn test_pool_processes_every_job_once() {
        let temp_dir = TempDir::new().unwrap();
        let jobs = queue_jobs(temp_dir.path(), 20);
        let (event_tx, event_rx) = unbounded();

        WorkerPool::new(4, 256, 64)
            .run(jobs, event_tx, &Shutdown::new())
            .unwrap();

        let events: Vec<CompletionEvent> = event_rx.iter().collect();
        assert_eq!(events.len(), 20);
        let indices: HashSet<u64> = events.iter().map(|e| e.index).collect();
        assert_eq!(indices, (1..=20).collect::<HashSet<u64>>());
        assert!(events.iter().all(|e| e.outcome == JobOutcome::Written));
        assert!(events.iter().all(|e| e.worker_id < 4));
    }

    #[test]
    fn test_pool_closes_event_queue_on_return() {
        let temp_dir = TempDir::new().unwrap();
        let jobs = queue_jobs(temp_dir.path(), 3);
        let (event_tx, event_rx) = unbounded();

        WorkerPool::new(2, 16, 16)
            .run(jobs, event_tx, &Shutdown::new())
            .unwrap();

        // iter() only terminates once every sender is gone
        assert_eq!(event_rx.iter().count(), 3);
    }

    #[test]
    fn test_pool_continues_after_failure() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("file_2.bin")).unwrap();
        let jobs = queue_jobs(temp_dir.path(), 4);
        let (event_tx, event_rx) = unbounded();

        WorkerPool::new(2, 128, 64)
            .run(jobs, event_tx, &Shutdown::new())
            .unwrap();

        let events: Vec<CompletionEvent> = event_rx.iter().collect();
        assert_eq!(events.len(), 4);
        let failed: Vec<&CompletionEvent> = events
            .iter()
            .filter(|e| matches!(e.outcome, JobOutcome::Failed(_)))
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].index, 2);
        assert_eq!(failed[0].bytes_written, 0);
        for index in [1, 3, 4] {
            let path = temp_dir.path().join(format!("file_{}.bin", index));
            assert_eq!(fs::metadata(path).unwrap().len(), 128);
        }
    }

    #[test]
    fn test_pool_stops_pulling_after_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let jobs = queue_jobs(temp_dir.path(), 10);
        let (event_tx, event_rx) = bounded(16);
        let shutdown = Shutdown::new();
        shutdown.request();

        WorkerPool::new(3, 64, 64)
            .run(jobs, event_tx, &shutdown)
            .unwrap();

        assert_eq!(event_rx.iter().count(), 0);
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
