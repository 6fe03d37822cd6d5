use sysinfo::System;

pub const MIN_BUFFER_SIZE: usize = 256 * 1024; // 256KB
pub const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024; // 16MB
const PREFERRED_BUFFER_SIZE: usize = 1024 * 1024;
const PAGES_PER_BUFFER: usize = 256;
const FALLBACK_PAGE_SIZE: usize = 4096;

/// Picks the per-write chunk size from the page size: 256 pages or 1MB,
/// whichever is larger, kept within `[256KB, 16MB]`.
///
/// # Examples
///
/// ```
/// # use fileforge::utils::determine_buffer_size;
/// assert_eq!(determine_buffer_size(4096), 1024 * 1024);
/// assert_eq!(determine_buffer_size(16 * 1024), 4 * 1024 * 1024);
/// ```
pub fn determine_buffer_size(page_size: usize) -> usize {
    let candidate = page_size
        .saturating_mul(PAGES_PER_BUFFER)
        .max(PREFERRED_BUFFER_SIZE);
    clamp_buffer_size(candidate)
}

pub fn clamp_buffer_size(size: usize) -> usize {
    size.clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE)
}

/// Buffer size for this machine. Computed once at startup and handed to the
/// generator explicitly.
pub fn optimal_buffer_size() -> usize {
    determine_buffer_size(page_size())
}

#[cfg(unix)]
pub fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions, it only reads a system constant
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        FALLBACK_PAGE_SIZE
    }
}

#[cfg(not(unix))]
pub fn page_size() -> usize {
    FALLBACK_PAGE_SIZE
}

/// CPU count + 1 to cover time spent waiting on disk, never less than 2.
pub fn default_worker_count() -> usize {
    (detect_cpu_count() + 1).max(2)
}

pub fn detect_cpu_count() -> usize {
    let mut sys = System::new();
    sys.refresh_cpu_all();
    sys.cpus().len().max(1)
}

pub fn detect_available_memory() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.available_memory()
}

/// Whether every worker holding a full buffer would use more than half of
/// `available_memory`. Unknown memory (0) never counts as oversized.
pub fn buffers_exceed_memory(workers: usize, buffer_size: usize, available_memory: u64) -> bool {
    if available_memory == 0 {
        return false;
    }
    let footprint = (workers as u64).saturating_mul(buffer_size as u64);
    footprint > available_memory / 2
}
