//! Frame counters of a source

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by `grab`.
///
/// All fields use atomic operations, grabs may run from several threads.
#[derive(Debug)]
pub struct SourceStats {
    frames_grabbed: AtomicU64,
    bytes_grabbed: AtomicU64,
    pull_failures: AtomicU64,
}

impl SourceStats {
    pub fn new() -> Self {
        Self {
            frames_grabbed: AtomicU64::new(0),
            bytes_grabbed: AtomicU64::new(0),
            pull_failures: AtomicU64::new(0),
        }
    }

    pub fn record_frame(&self, size: usize) {
        self.frames_grabbed.fetch_add(1, Ordering::Relaxed);
        self.bytes_grabbed.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn record_pull_failure(&self) {
        self.pull_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_grabbed(&self) -> u64 {
        self.frames_grabbed.load(Ordering::Relaxed)
    }

    pub fn bytes_grabbed(&self) -> u64 {
        self.bytes_grabbed.load(Ordering::Relaxed)
    }

    pub fn pull_failures(&self) -> u64 {
        self.pull_failures.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            frames_grabbed: self.frames_grabbed(),
            bytes_grabbed: self.bytes_grabbed(),
            pull_failures: self.pull_failures(),
        }
    }
}

impl Default for SourceStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`SourceStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSummary {
    pub frames_grabbed: u64,
    pub bytes_grabbed: u64,
    pub pull_failures: u64,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {} bytes, {} failed pulls",
            self.frames_grabbed, self.bytes_grabbed, self.pull_failures
        )
    }
}
