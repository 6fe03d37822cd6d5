//! Error types shared across the generator.
//!
//! Configuration problems are fatal and surface before any file is touched.
//! Per-file [`WriteError`]s are logged by the worker that hit them and the run
//! carries on with the remaining jobs.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizeError {
    #[error("invalid size format {0:?}. Expected format: '1GB' or '1 GB'")]
    InvalidFormat(String),

    #[error("invalid number {value:?} in size {input:?}")]
    InvalidNumber { input: String, value: String },

    #[error("size {0:?} does not fit in 64 bits")]
    Overflow(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error parsing file size: {0}")]
    InvalidSize(#[from] SizeError),

    #[error("file size must be positive, got {0} bytes")]
    NonPositiveSize(i64),

    #[error("start index {start} is greater than end index {end}")]
    EmptyRange { start: u64, end: u64 },

    #[error("file indices are 1-based, start index must be at least 1")]
    ZeroStartIndex,

    #[error("files per directory must be at least 1")]
    ZeroFilesPerDir,

    #[error("worker count must be at least 1")]
    ZeroWorkers,

    #[error("buffer size must be at least 1 byte")]
    ZeroBufferSize,

    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failure while producing a single file. Every variant names the target path.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("error creating directory for file {path:?}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error creating file {path:?}: {source}")]
    FileCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error generating random data for file {path:?}: {reason}")]
    RandomSource { path: PathBuf, reason: String },

    #[error("error writing to file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error flushing buffer to file {path:?}: {source}")]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("generation of {path:?} cancelled")]
    Cancelled { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
