//! Storage statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics tracked by the page stores of a database.
///
/// All fields are atomic for lock-free, thread-safe updates. One instance
/// is shared by every table of a database.
///
/// # Memory Ordering
/// `Ordering::Relaxed` everywhere: counters are independent and only need
/// atomicity.
///
/// # Example
/// ```
/// use tabledb::StorageStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = StorageStats::new();
/// stats.pages_written.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().pages_written, 1);
/// ```
#[derive(Debug, Default)]
pub struct StorageStats {
    /// Pages loaded from a page file.
    pub pages_read: AtomicU64,

    /// Pages written to a page file.
    pub pages_written: AtomicU64,

    /// Pages created, either as the first page of a table or as an
    /// overflow successor.
    pub pages_allocated: AtomicU64,

    /// Blocks that did not fit in the tail page and moved on to the next.
    pub overflows: AtomicU64,

    /// Clean pages dropped from memory.
    pub evictions: AtomicU64,
}

impl StorageStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pages_read: self.pages_read.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
            pages_allocated: self.pages_allocated.load(Ordering::Relaxed),
            overflows: self.overflows.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.pages_read.store(0, Ordering::Relaxed);
        self.pages_written.store(0, Ordering::Relaxed);
        self.pages_allocated.store(0, Ordering::Relaxed);
        self.overflows.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of storage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub pages_read: u64,
    pub pages_written: u64,
    pub pages_allocated: u64,
    pub overflows: u64,
    pub evictions: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ read: {}, written: {}, allocated: {}, overflows: {}, evictions: {} }}",
            self.pages_read, self.pages_written, self.pages_allocated, self.overflows, self.evictions
        )
    }
}
