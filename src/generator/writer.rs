use rand::TryRngCore;
use rand::rngs::OsRng;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

use super::Shutdown;
use crate::error::WriteError;

/// Writes files of random bytes through one reusable buffer. Each worker owns
/// its own writer, so buffers are never shared.
pub struct FileWriter {
    buffer: Vec<u8>,
}

impl FileWriter {
    pub fn new(buffer_size: usize) -> Self {
        FileWriter {
            buffer: vec![0u8; buffer_size.max(1)],
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Creates (or truncates) `path` and fills it with `size` bytes from the OS
    /// CSPRNG, creating parent directories as needed.
    ///
    /// The shutdown flag is checked before every chunk. A cancelled file is
    /// removed instead of being left half written.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use std::path::Path;
    /// # use fileforge::generator::{Shutdown, writer::FileWriter};
    /// let mut writer = FileWriter::new(1024 * 1024);
    /// let written = writer
    ///     .write(Path::new("out/file_1.bin"), 4096, &Shutdown::new())
    ///     .unwrap();
    /// assert_eq!(written, 4096);
    /// ```
    pub fn write(&mut self, path: &Path, size: u64, shutdown: &Shutdown) -> Result<u64, WriteError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| WriteError::DirectoryCreate {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let file = File::create(path).map_err(|source| WriteError::FileCreate {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::with_capacity(self.buffer.len(), file);

        let mut rng = OsRng;
        let mut remaining = size;
        while remaining > 0 {
            if shutdown.is_requested() {
                drop(writer);
                self.discard(path);
                return Err(WriteError::Cancelled {
                    path: path.to_path_buf(),
                });
            }

            let chunk_size = remaining.min(self.buffer.len() as u64) as usize;
            let chunk = &mut self.buffer[..chunk_size];
            rng.try_fill_bytes(chunk)
                .map_err(|e| WriteError::RandomSource {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            writer.write_all(chunk).map_err(|source| WriteError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            remaining -= chunk_size as u64;
        }

        writer.flush().map_err(|source| WriteError::Flush {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("WRITER | wrote {} bytes to {:?}", size, path);
        Ok(size)
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            warn!("WRITER | could not remove cancelled file {:?}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_exact_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file_1.bin");
        let mut writer = FileWriter::new(4096);

        let written = writer.write(&path, 10_000, &Shutdown::new()).unwrap();

        assert_eq!(written, 10_000);
        assert_eq!(fs::metadata(&path).unwrap().len(), 10_000);
    }

    #[test]
    fn test_write_smaller_than_buffer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tiny.bin");
        let mut writer = FileWriter::new(1024 * 1024);

        writer.write(&path, 17, &Shutdown::new()).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 17);
    }

    #[test]
    fn test_write_creates_missing_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a/b/subdir_3/file_30.bin");
        let mut writer = FileWriter::new(512);

        writer.write(&path, 2048, &Shutdown::new()).unwrap();

        assert!(path.is_file());
        assert_eq!(fs::metadata(&path).unwrap().len(), 2048);
    }

    #[test]
    fn test_write_truncates_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file_1.bin");
        fs::write(&path, vec![0u8; 8192]).unwrap();
        let mut writer = FileWriter::new(1024);

        writer.write(&path, 100, &Shutdown::new()).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 100);
    }

    #[test]
    fn test_written_content_is_random() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("file_1.bin");
        let second = temp_dir.path().join("file_2.bin");
        let mut writer = FileWriter::new(1024);

        writer.write(&first, 4096, &Shutdown::new()).unwrap();
        writer.write(&second, 4096, &Shutdown::new()).unwrap();

        let first_bytes = fs::read(&first).unwrap();
        let second_bytes = fs::read(&second).unwrap();
        assert_ne!(first_bytes, second_bytes);
        assert!(first_bytes.iter().any(|byte| *byte != 0));
    }

    #[test]
    fn test_write_into_directory_path_fails_with_file_create() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file_1.bin");
        fs::create_dir_all(&path).unwrap();
        let mut writer = FileWriter::new(1024);

        let result = writer.write(&path, 100, &Shutdown::new());

        match result {
            Err(WriteError::FileCreate { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected FileCreate error, got {:?}", other),
        }
    }

    #[test]
    fn test_write_under_file_parent_fails_with_directory_create() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("subdir_0");
        fs::write(&blocker, b"not a directory").unwrap();
        let mut writer = FileWriter::new(1024);

        let result = writer.write(&blocker.join("file_1.bin"), 100, &Shutdown::new());

        assert!(matches!(result, Err(WriteError::DirectoryCreate { .. })));
    }

    #[test]
    fn test_cancelled_write_leaves_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file_1.bin");
        let shutdown = Shutdown::new();
        shutdown.request();
        let mut writer = FileWriter::new(1024);

        let result = writer.write(&path, 4096, &shutdown);

        assert!(matches!(result, Err(WriteError::Cancelled { .. })));
        assert!(!path.exists());
    }
}
