//! Parallel random-file generation.
//!
//! A producer thread walks the index range and queues [`FileJob`]s, a fixed
//! pool of workers drains the queue and writes each file with OS randomness,
//! and an aggregator thread folds their completion events into live progress.
//! The three sides only talk through two bounded channels.
//!
//! [`FileJob`]: crate::planner::FileJob

use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::error::ConfigError;
use crate::planner::PathPlan;

pub mod models;
pub mod pool;
pub mod progress;
mod run;
pub mod writer;


/// Queue capacity per worker for both the job and the event channel.
pub const QUEUE_SLOTS_PER_WORKER: usize = 2;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub root_directory: PathBuf,
    pub start_index: u64,
    pub end_index: u64,
    pub file_size_bytes: u64,
    pub files_per_subdir: u64,
    pub use_subdirs: bool,
    pub worker_count: usize,
    pub buffer_size_bytes: usize,
}

impl GenerationRequest {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_index == 0 {
            return Err(ConfigError::ZeroStartIndex);
        }
        if self.start_index > self.end_index {
            return Err(ConfigError::EmptyRange {
                start: self.start_index,
                end: self.end_index,
            });
        }
        if self.file_size_bytes == 0 {
            return Err(ConfigError::NonPositiveSize(0));
        }
        if self.files_per_subdir == 0 {
            return Err(ConfigError::ZeroFilesPerDir);
        }
        if self.worker_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.buffer_size_bytes == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        Ok(())
    }

    pub fn total_files(&self) -> u64 {
        self.end_index - self.start_index + 1
    }

    pub fn plan(&self) -> PathPlan {
        PathPlan {
            root: self.root_directory.clone(),
            indices: self.start_index..=self.end_index,
            files_per_subdir: self.files_per_subdir,
            use_subdirs: self.use_subdirs,
        }
    }
}

/// Cooperative stop signal shared by the producer, the workers and whoever
/// handles Ctrl-C.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

pub struct Generator {
    request: GenerationRequest,
    shutdown: Shutdown,
    show_progress: bool,
}

impl Generator {
    /// Validates the request and takes ownership of it for the run.
    ///
    /// # Examples
    ///
    /// ```
    /// # use fileforge::generator::{GenerationRequest, Generator};
    /// let request = GenerationRequest {
    ///     root_directory: "out".into(),
    ///     start_index: 5,
    ///     end_index: 1,
    ///     file_size_bytes: 1024,
    ///     files_per_subdir: 10_000,
    ///     use_subdirs: false,
    ///     worker_count: 2,
    ///     buffer_size_bytes: 1024 * 1024,
    /// };
    /// assert!(Generator::new(request).is_err());
    /// ```
    pub fn new(request: GenerationRequest) -> Result<Self, ConfigError> {
        request.validate()?;
        Ok(Generator {
            request,
            shutdown: Shutdown::new(),
            show_progress: true,
        })
    }

    /// Disables the startup line, progress line and summary on stdout.
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }
}
