//! Maps file indices to target paths.
//!
//! Paths are a pure function of the index, so distinct indices never collide
//! and no two workers ever write the same file.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// One unit of work: a file to fill with random bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    pub index: u64,
    pub target_path: PathBuf,
}

/// Returns `root/file_<index>.bin`, or `root/subdir_<index / files_per_subdir>/file_<index>.bin`
/// when sharding into subdirectories.
///
/// # Examples
///
/// ```
/// # use std::path::Path;
/// # use fileforge::planner::file_path;
/// let root = Path::new("out");
/// assert_eq!(file_path(root, 7, 10_000, false), Path::new("out/file_7.bin"));
/// assert_eq!(
///     file_path(root, 12_345, 10_000, true),
///     Path::new("out/subdir_1/file_12345.bin")
/// );
/// ```
pub fn file_path(root: &Path, index: u64, files_per_subdir: u64, use_subdirs: bool) -> PathBuf {
    let file_name = format!("file_{}.bin", index);
    if use_subdirs {
        let subdir_num = index / files_per_subdir.max(1);
        root.join(format!("subdir_{}", subdir_num)).join(file_name)
    } else {
        root.join(file_name)
    }
}

/// The layout for one run: where files go and which indices to create.
#[derive(Debug, Clone)]
pub struct PathPlan {
    pub root: PathBuf,
    pub indices: RangeInclusive<u64>,
    pub files_per_subdir: u64,
    pub use_subdirs: bool,
}

impl PathPlan {
    pub fn path_for(&self, index: u64) -> PathBuf {
        file_path(&self.root, index, self.files_per_subdir, self.use_subdirs)
    }

    pub fn total_files(&self) -> u64 {
        let (start, end) = (*self.indices.start(), *self.indices.end());
        if start > end { 0 } else { end - start + 1 }
    }

    /// Jobs in ascending index order.
    pub fn jobs(&self) -> impl Iterator<Item = FileJob> + '_ {
        self.indices.clone().map(|index| FileJob {
            index,
            target_path: self.path_for(index),
        })
    }
}
