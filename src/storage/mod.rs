//! Storage layer - page formats, page files and page chains.
//!
//! This module handles persistent storage:
//! - [`page`] - Page and header layouts
//! - [`DiskManager`] - One file per page under a table directory
//! - [`PageStore`] - In-memory arena of a table's pages
//! - [`PagingManager`] - Cursor over a table's page chain, with overflow
//!   chaining on append
//! - [`StorageStats`] - Atomic I/O counters

mod disk_manager;
pub mod page;
mod page_store;
mod paging_manager;
mod stats;

pub(crate) use disk_manager::write_synced;
pub use disk_manager::DiskManager;
pub use page_store::PageStore;
pub use paging_manager::{ChainState, PagingManager};
pub use stats::{StatsSnapshot, StorageStats};
