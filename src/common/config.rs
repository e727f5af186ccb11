//! Configuration for tabledb.
//!
//! Storage layout constants live here alongside the runtime [`Config`]
//! that decides where (and whether) a database is persisted.

use std::path::PathBuf;
use std::time::Duration;

use crate::common::{Error, Result};

/// Maximum payload size of a page in bytes (excluding the header).
///
/// A page holds a sequence of length-prefixed row blocks. Once the next
/// block would push the payload past this size, the write moves on to the
/// next page in the table's chain.
pub const PAGE_CAPACITY: usize = 4000;

/// Size of the page header in bytes.
///
/// Three 16-byte identifiers: self, previous page, next page.
pub const PAGE_HEADER_SIZE: usize = 48;

/// Size of the length prefix in front of every block.
pub const BLOCK_HEADER_SIZE: usize = 2;

/// Largest block a single page can ever accept.
///
/// Bounded both by the page capacity and by the 16-bit length prefix.
pub const MAX_BLOCK_SIZE: usize = {
    let by_capacity = PAGE_CAPACITY - BLOCK_HEADER_SIZE;
    if by_capacity < u16::MAX as usize {
        by_capacity
    } else {
        u16::MAX as usize
    }
};

/// Default debounce interval between the last write and the flush to disk.
pub const DEFAULT_WRITE_INTERVAL: Duration = Duration::from_millis(1000);

/// Name of the file listing every database in a data directory.
pub const META_FILE: &str = "meta.json";

/// Name of the per-database file holding descriptors and table state.
pub const SCHEMA_FILE: &str = "schema.json";

/// Runtime configuration for a [`Database`](crate::db::Database).
///
/// # Example
/// ```
/// use tabledb::Config;
/// use std::time::Duration;
///
/// let config = Config::in_memory().with_write_interval(Duration::from_millis(50));
/// assert!(config.in_memory);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding `meta.json`, schema files and page files.
    pub data_dir: Option<PathBuf>,

    /// Keep every page in memory and never touch the disk.
    pub in_memory: bool,

    /// How long after the last write the background flusher waits.
    pub write_interval: Duration,
}

impl Config {
    /// Persist under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            in_memory: false,
            write_interval: DEFAULT_WRITE_INTERVAL,
        }
    }

    /// Never persist anything.
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            in_memory: true,
            write_interval: DEFAULT_WRITE_INTERVAL,
        }
    }

    /// Set the flush debounce interval.
    pub fn with_write_interval(mut self, interval: Duration) -> Self {
        self.write_interval = interval;
        self
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    /// Returns `Error::Config` if the database is disk-backed but has no
    /// data directory, or if the write interval is zero.
    pub fn validate(&self) -> Result<()> {
        if !self.in_memory && self.data_dir.is_none() {
            return Err(Error::Config(
                "must either provide a data directory or use in-memory mode".into(),
            ));
        }
        if self.write_interval.is_zero() {
            return Err(Error::Config("write interval must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_layout_constants() {
        assert_eq!(PAGE_HEADER_SIZE, 3 * 16);
        assert_eq!(PAGE_CAPACITY, 4000);
        assert_eq!(MAX_BLOCK_SIZE, PAGE_CAPACITY - BLOCK_HEADER_SIZE);
    }

    #[test]
    fn test_max_block_fits_length_prefix() {
        assert!(MAX_BLOCK_SIZE <= u16::MAX as usize);
    }

    #[test]
    fn test_config_requires_data_dir() {
        let config = Config {
            data_dir: None,
            in_memory: false,
            write_interval: DEFAULT_WRITE_INTERVAL,
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        assert!(Config::new("/tmp/tabledb").validate().is_ok());
        assert!(Config::in_memory().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_interval() {
        let config = Config::in_memory().with_write_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
