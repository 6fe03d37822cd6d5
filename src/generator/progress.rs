use crossbeam_channel::Receiver;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::models::{CompletionEvent, RunStats};

/// Folds completion events into [`RunStats`] and redraws a single status line.
pub struct ProgressAggregator {
    total_files: u64,
    directory: PathBuf,
    render: bool,
}

impl ProgressAggregator {
    pub fn new(total_files: u64, directory: &Path, render: bool) -> Self {
        ProgressAggregator {
            total_files,
            directory: directory.to_path_buf(),
            render,
        }
    }

    /// Consumes events until the queue is closed and drained.
    pub fn consume(self, events: Receiver<CompletionEvent>) -> RunStats {
        let mut stats = RunStats::default();
        for event in events.iter() {
            stats.record(&event);
            if self.render {
                // a broken stdout should not take the run down with it
                let _ = self.draw(&stats);
            }
        }
        stats
    }

    fn draw(&self, stats: &RunStats) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        write!(
            stdout,
            "\r{}",
            render_line(stats, self.total_files, &self.directory)
        )?;
        stdout.flush()
    }
}

/// The progress line without the leading carriage return.
pub fn render_line(stats: &RunStats, total_files: u64, directory: &Path) -> String {
    let percent = if total_files == 0 {
        100.0
    } else {
        stats.completed as f64 / total_files as f64 * 100.0
    };
    let mut line = format!(
        "Progress: {}/{} files created in directory {} ({:.2}%) - Bit Rate: {:.2} MBps",
        stats.completed,
        total_files,
        directory.display(),
        percent,
        stats.throughput_mbps()
    );
    if stats.failed > 0 {
        line.push_str(&format!(" - Failed: {}", stats.failed));
    }
    line
}
