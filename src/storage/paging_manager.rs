//! Paging Manager - the per-table cursor over a page chain.

use serde::{Deserialize, Serialize};

use crate::common::{Error, PageId, Result};
use crate::storage::{PageStore, StorageStats};

/// The persisted ends of a page chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    pub first_page: PageId,
    pub last_page: PageId,
}

/// Tracks a table's page chain by id.
///
/// ```text
///  first_page                                   last_page (appends)
///      │                                              │
///      ▼                                              ▼
///  ┌────────┐ next ┌────────┐ next       next ┌────────┐
///  │ page 0 │─────►│ page 1 │─────► ... ─────►│ page n │
///  │        │◄─────│        │◄───── ... ◄─────│        │
///  └────────┘ prev └────────┘ prev       prev └────────┘
///                      ▲
///                   current (last page loaded for a read)
/// ```
///
/// The manager never owns page buffers; every operation borrows the
/// table's [`PageStore`]. `parsed` records whether the owner's row cache
/// reflects the current page.
#[derive(Debug)]
pub struct PagingManager {
    first_page: PageId,
    last_page: PageId,
    current: PageId,
    parsed: bool,
}

impl PagingManager {
    /// Start a new chain made of a single empty page.
    pub fn create(store: &mut PageStore) -> Self {
        let page_id = store.allocate(PageId::NIL);
        Self {
            first_page: page_id,
            last_page: page_id,
            current: page_id,
            parsed: false,
        }
    }

    /// Resume an existing chain.
    ///
    /// If `state.last_page` is nil the tail is found by following the
    /// `next` links from the first page.
    pub fn resume(store: &mut PageStore, state: ChainState) -> Result<Self> {
        let mut manager = Self {
            first_page: state.first_page,
            last_page: state.last_page,
            current: state.first_page,
            parsed: false,
        };
        if !manager.last_page.is_valid() {
            manager.last_page = manager
                .pages(store)?
                .last()
                .copied()
                .unwrap_or(state.first_page);
        }
        manager.load(store, manager.last_page)?;
        Ok(manager)
    }

    #[inline]
    pub fn first_page(&self) -> PageId {
        self.first_page
    }

    #[inline]
    pub fn last_page(&self) -> PageId {
        self.last_page
    }

    #[inline]
    pub fn current(&self) -> PageId {
        self.current
    }

    #[inline]
    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    pub fn mark_parsed(&mut self) {
        self.parsed = true;
    }

    pub fn chain_state(&self) -> ChainState {
        ChainState {
            first_page: self.first_page,
            last_page: self.last_page,
        }
    }

    /// Make `page_id` the current page.
    ///
    /// Switching pages invalidates the parsed flag. The previous page is
    /// evicted from the store unless it is the tail.
    pub fn load(&mut self, store: &mut PageStore, page_id: PageId) -> Result<()> {
        if page_id == self.current && self.parsed {
            return Ok(());
        }
        store.fetch(page_id)?;

        let previous = std::mem::replace(&mut self.current, page_id);
        self.parsed = false;
        if previous != page_id && previous != self.last_page {
            store.evict(previous);
        }
        Ok(())
    }

    /// Append a block at the tail of the chain.
    ///
    /// Returns the id of the page that received the block.
    ///
    /// # Errors
    /// `Error::MaxDataSize` if the block can never fit in a page, or any
    /// storage error raised while persisting the outgoing page.
    pub fn append(&mut self, store: &mut PageStore, block: &[u8]) -> Result<PageId> {
        let page_id = self.push_at(store, self.last_page, block)?;
        self.last_page = page_id;
        if page_id == self.current {
            self.parsed = false;
        }
        Ok(page_id)
    }

    /// Push onto `page_id`, moving on to its successor on overflow.
    fn push_at(&mut self, store: &mut PageStore, page_id: PageId, block: &[u8]) -> Result<PageId> {
        match store.fetch(page_id)?.push(block) {
            Ok(()) => Ok(page_id),
            Err(Error::PageOverflow) => {
                StorageStats::bump(&store.stats().overflows);

                let mut next = store.fetch(page_id)?.next();
                if !next.is_valid() {
                    next = store.allocate(page_id);
                    store.fetch(page_id)?.set_next(next);
                }
                store.fetch(next)?.set_prev(page_id);

                store.write_back(page_id)?;
                if page_id != self.current {
                    store.evict(page_id);
                }

                self.push_at(store, next, block)
            }
            Err(e) => Err(e),
        }
    }

    /// Page ids of the chain in link order.
    pub fn pages(&self, store: &mut PageStore) -> Result<Vec<PageId>> {
        let mut pages = Vec::new();
        let mut page_id = self.first_page;
        while page_id.is_valid() {
            if pages.contains(&page_id) {
                return Err(Error::PageCorrupt {
                    page_id,
                    reason: "page chain loops".to_string(),
                });
            }
            pages.push(page_id);

            let was_resident = store.resident();
            let next = store.fetch(page_id)?.next();
            if store.resident() > was_resident && page_id != self.current && page_id != self.last_page
            {
                store.evict(page_id);
            }
            page_id = next;
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DiskManager;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn memory_store() -> PageStore {
        PageStore::in_memory(Arc::new(StorageStats::new()))
    }

    #[test]
    fn test_create_single_page_chain() {
        let mut store = memory_store();
        let pager = PagingManager::create(&mut store);

        assert_eq!(pager.first_page(), pager.last_page());
        assert_eq!(pager.current(), pager.first_page());
        assert!(!pager.is_parsed());
        assert_eq!(pager.pages(&mut store).unwrap(), vec![pager.first_page()]);
    }

    #[test]
    fn test_append_overflows_into_linked_page() {
        let mut store = memory_store();
        let mut pager = PagingManager::create(&mut store);
        let first = pager.first_page();

        let block = vec![1u8; 1500];
        assert_eq!(pager.append(&mut store, &block).unwrap(), first);
        assert_eq!(pager.append(&mut store, &block).unwrap(), first);

        let second = pager.append(&mut store, &block).unwrap();
        assert_ne!(second, first);
        assert_eq!(pager.last_page(), second);

        assert_eq!(store.fetch(first).unwrap().next(), second);
        assert_eq!(store.fetch(second).unwrap().prev(), first);
        assert_eq!(store.fetch(first).unwrap().blocks().count(), 2);
        assert_eq!(store.fetch(second).unwrap().blocks().count(), 1);
        assert_eq!(pager.pages(&mut store).unwrap(), vec![first, second]);
        assert_eq!(store.stats().snapshot().overflows, 1);
    }

    #[test]
    fn test_append_too_large_block() {
        let mut store = memory_store();
        let mut pager = PagingManager::create(&mut store);

        let err = pager.append(&mut store, &vec![0u8; 5000]).unwrap_err();
        assert!(matches!(err, Error::MaxDataSize { size: 5000 }));
        assert_eq!(pager.pages(&mut store).unwrap().len(), 1);
    }

    #[test]
    fn test_load_resets_parsed() {
        let mut store = memory_store();
        let mut pager = PagingManager::create(&mut store);
        let first = pager.first_page();
        for _ in 0..3 {
            pager.append(&mut store, &[0u8; 1500]).unwrap();
        }
        let last = pager.last_page();

        pager.load(&mut store, first).unwrap();
        pager.mark_parsed();
        pager.load(&mut store, first).unwrap();
        assert!(pager.is_parsed());

        pager.load(&mut store, last).unwrap();
        assert_eq!(pager.current(), last);
        assert!(!pager.is_parsed());
    }

    #[test]
    fn test_resume_from_disk() {
        let dir = tempdir().unwrap();
        let stats = Arc::new(StorageStats::new());

        let state = {
            let mut store =
                PageStore::on_disk(DiskManager::open(dir.path()).unwrap(), stats.clone());
            let mut pager = PagingManager::create(&mut store);
            for _ in 0..5 {
                pager.append(&mut store, &[9u8; 1500]).unwrap();
            }
            store.flush().unwrap();
            pager.chain_state()
        };

        let mut store = PageStore::on_disk(DiskManager::open(dir.path()).unwrap(), stats);
        let pager = PagingManager::resume(
            &mut store,
            ChainState {
                first_page: state.first_page,
                last_page: PageId::NIL,
            },
        )
        .unwrap();

        assert_eq!(pager.last_page(), state.last_page);
        assert_eq!(pager.pages(&mut store).unwrap().len(), 3);
    }
}
