//! Page Store - the arena that owns every in-memory page of a table.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::common::{PageId, Result};
use crate::storage::page::Page;
use crate::storage::{DiskManager, StorageStats};

/// Arena of pages keyed by id.
///
/// The store is the only owner of page buffers; everything else refers to
/// pages by [`PageId`]. Without a [`DiskManager`] the store is purely in
/// memory and never evicts.
///
/// ```text
///              ┌─────────────── PageStore ───────────────┐
///  fetch(id) ─►│ pages: HashMap<PageId, Page>            │
///              │   hit  → &mut Page                      │
///              │   miss → DiskManager::read_page(id) ────┼──► <table dir>/<id>
///              │ write_back(id) / flush() ───────────────┼──► (dirty pages)
///              └─────────────────────────────────────────┘
/// ```
#[derive(Debug)]
pub struct PageStore {
    pages: HashMap<PageId, Page>,
    disk: Option<DiskManager>,
    stats: Arc<StorageStats>,
}

impl PageStore {
    /// A store that keeps every page in memory.
    pub fn in_memory(stats: Arc<StorageStats>) -> Self {
        Self {
            pages: HashMap::new(),
            disk: None,
            stats,
        }
    }

    /// A store backed by page files.
    pub fn on_disk(disk: DiskManager, stats: Arc<StorageStats>) -> Self {
        Self {
            pages: HashMap::new(),
            disk: Some(disk),
            stats,
        }
    }

    /// Number of pages currently held in memory.
    #[inline]
    pub fn resident(&self) -> usize {
        self.pages.len()
    }

    #[inline]
    pub fn stats(&self) -> &StorageStats {
        &self.stats
    }

    /// Get a page, loading it if it is not resident.
    ///
    /// A page with no file is created empty and unlinked.
    ///
    /// # Errors
    /// Propagates read and decode errors from the disk manager.
    pub fn fetch(&mut self, page_id: PageId) -> Result<&mut Page> {
        match self.pages.entry(page_id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let page = match &self.disk {
                    Some(disk) => {
                        let (page, from_disk) = disk.read_page(page_id)?;
                        if from_disk {
                            StorageStats::bump(&self.stats.pages_read);
                        }
                        page
                    }
                    None => Page::new(page_id),
                };
                Ok(entry.insert(page))
            }
        }
    }

    /// Create a new, empty page linked after `prev`.
    pub fn allocate(&mut self, prev: PageId) -> PageId {
        let page_id = PageId::generate();
        self.pages
            .insert(page_id, Page::with_links(page_id, prev, PageId::NIL));
        StorageStats::bump(&self.stats.pages_allocated);
        debug!(page = %page_id, prev = %prev, "allocated page");
        page_id
    }

    /// Write a resident page to disk if it is dirty.
    pub fn write_back(&mut self, page_id: PageId) -> Result<()> {
        let Some(disk) = &self.disk else {
            return Ok(());
        };
        if let Some(page) = self.pages.get_mut(&page_id) {
            if page.is_dirty() {
                disk.write_page(page)?;
                page.mark_clean();
                StorageStats::bump(&self.stats.pages_written);
            }
        }
        Ok(())
    }

    /// Drop a resident page from memory if it is clean and disk-backed.
    ///
    /// Returns `true` if the page was evicted.
    pub fn evict(&mut self, page_id: PageId) -> bool {
        if self.disk.is_none() {
            return false;
        }
        let clean = matches!(self.pages.get(&page_id), Some(page) if !page.is_dirty());
        if clean {
            self.pages.remove(&page_id);
            StorageStats::bump(&self.stats.evictions);
        }
        clean
    }

    /// Write every dirty page to disk.
    ///
    /// Returns the number of pages written.
    pub fn flush(&mut self) -> Result<usize> {
        let Some(disk) = &self.disk else {
            return Ok(0);
        };

        let mut written = 0;
        for page in self.pages.values_mut().filter(|p| p.is_dirty()) {
            disk.write_page(page)?;
            page.mark_clean();
            written += 1;
        }
        self.stats
            .pages_written
            .fetch_add(written as u64, Ordering::Relaxed);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn disk_store(dir: &std::path::Path) -> PageStore {
        PageStore::on_disk(DiskManager::open(dir).unwrap(), Arc::new(StorageStats::new()))
    }

    #[test]
    fn test_fetch_unknown_page_in_memory() {
        let mut store = PageStore::in_memory(Arc::new(StorageStats::new()));
        let id = PageId::generate();

        let page = store.fetch(id).unwrap();
        assert_eq!(page.id(), id);
        assert!(page.is_empty());
        assert_eq!(store.resident(), 1);
    }

    #[test]
    fn test_allocate_links_prev() {
        let mut store = PageStore::in_memory(Arc::new(StorageStats::new()));
        let first = store.allocate(PageId::NIL);
        let second = store.allocate(first);

        assert_eq!(store.fetch(second).unwrap().prev(), first);
        assert_eq!(store.stats().snapshot().pages_allocated, 2);
    }

    #[test]
    fn test_in_memory_never_evicts() {
        let mut store = PageStore::in_memory(Arc::new(StorageStats::new()));
        let id = store.allocate(PageId::NIL);
        store.fetch(id).unwrap().mark_clean();

        assert!(!store.evict(id));
        assert_eq!(store.flush().unwrap(), 0);
    }

    #[test]
    fn test_write_back_then_evict_then_reload() {
        let dir = tempdir().unwrap();
        let mut store = disk_store(dir.path());

        let id = store.allocate(PageId::NIL);
        store.fetch(id).unwrap().push(b"data").unwrap();

        // dirty pages stay resident
        assert!(!store.evict(id));

        store.write_back(id).unwrap();
        assert!(store.evict(id));
        assert_eq!(store.resident(), 0);

        let page = store.fetch(id).unwrap();
        assert_eq!(page.blocks().next().unwrap().unwrap(), b"data");

        let snapshot = store.stats().snapshot();
        assert_eq!(snapshot.pages_written, 1);
        assert_eq!(snapshot.pages_read, 1);
        assert_eq!(snapshot.evictions, 1);
    }

    #[test]
    fn test_flush_writes_dirty_pages_only() {
        let dir = tempdir().unwrap();
        let mut store = disk_store(dir.path());

        let a = store.allocate(PageId::NIL);
        let b = store.allocate(a);
        assert_eq!(store.flush().unwrap(), 2);
        assert_eq!(store.flush().unwrap(), 0);

        store.fetch(b).unwrap().push(b"x").unwrap();
        assert_eq!(store.flush().unwrap(), 1);
    }
}
