//! Row Store - primary-key access to a table's rows over its page chain.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::common::{Error, PageId, Result};
use crate::rows::Row;
use crate::storage::{ChainState, DiskManager, PageStore, PagingManager, StorageStats};

/// Persisted state of a row store.
///
/// The primary index is persisted rather than rebuilt from the pages, since
/// the pages still hold every version of deleted rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowStoreState {
    pub chain: ChainState,
    pub primary: BTreeMap<i64, PageId>,
}

/// Rows of one table, addressed by primary key.
///
/// Every write appends a new version of the row at the tail of the page
/// chain and repoints the primary index; nothing is rewritten in place and
/// deleted versions are never reclaimed.
///
/// # Thread Safety
/// All state sits behind one `RwLock`. Reads that only consult the index
/// (`has`, `len`) share it; anything that may load or parse a page takes it
/// exclusively.
///
/// # Failure
/// A fatal storage error (corrupt page, failed I/O) marks the store as
/// poisoned. Every later call returns `Error::TableUnavailable`.
///
/// # Example
/// ```
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
/// use tabledb::rows::{Row, RowStore};
/// use tabledb::StorageStats;
///
/// let store = RowStore::in_memory("users", Arc::new(StorageStats::new()));
/// store.insert(Row::new(1, BTreeMap::new()).with("name", "ada")).unwrap();
///
/// let row = store.get(1).unwrap().unwrap();
/// assert_eq!(row.get("name").as_str(), Some("ada"));
/// assert!(store.insert(Row::new(1, BTreeMap::new())).is_err());
/// ```
#[derive(Debug)]
pub struct RowStore {
    table: String,
    inner: RwLock<RowStoreInner>,
}

#[derive(Debug)]
struct RowStoreInner {
    /// Primary key → page holding the latest version.
    primary: BTreeMap<i64, PageId>,
    store: PageStore,
    pager: PagingManager,
    /// Rows of the current page, valid while `pager.is_parsed()`.
    cache: BTreeMap<i64, Row>,
    /// State as of the last successful flush (or open).
    durable: RowStoreState,
    poisoned: bool,
}

impl RowStore {
    /// A store whose pages never leave memory.
    pub fn in_memory(table: impl Into<String>, stats: Arc<StorageStats>) -> Self {
        let mut store = PageStore::in_memory(stats);
        let pager = PagingManager::create(&mut store);
        Self::from_parts(table.into(), store, pager, BTreeMap::new())
    }

    /// Open a store, resuming from `state` if given.
    ///
    /// # Errors
    /// Returns a storage error if the tail page cannot be loaded.
    pub fn open(
        table: impl Into<String>,
        disk: Option<DiskManager>,
        stats: Arc<StorageStats>,
        state: Option<RowStoreState>,
    ) -> Result<Self> {
        let mut store = match disk {
            Some(disk) => PageStore::on_disk(disk, stats),
            None => PageStore::in_memory(stats),
        };
        let (pager, primary) = match state {
            Some(state) => (PagingManager::resume(&mut store, state.chain)?, state.primary),
            None => (PagingManager::create(&mut store), BTreeMap::new()),
        };
        Ok(Self::from_parts(table.into(), store, pager, primary))
    }

    fn from_parts(
        table: String,
        store: PageStore,
        pager: PagingManager,
        primary: BTreeMap<i64, PageId>,
    ) -> Self {
        let durable = RowStoreState {
            chain: pager.chain_state(),
            primary: primary.clone(),
        };
        Self {
            table,
            inner: RwLock::new(RowStoreInner {
                primary,
                store,
                pager,
                cache: BTreeMap::new(),
                durable,
                poisoned: false,
            }),
        }
    }

    /// Name of the owning table.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn is_poisoned(&self) -> bool {
        self.inner.read().poisoned
    }

    // ========================================================================
    // Lock helpers
    // ========================================================================

    fn read<T>(&self, op: impl FnOnce(&RowStoreInner) -> T) -> Result<T> {
        let inner = self.inner.read();
        if inner.poisoned {
            return Err(Error::TableUnavailable(self.table.clone()));
        }
        Ok(op(&inner))
    }

    fn write<T>(&self, op: impl FnOnce(&mut RowStoreInner) -> Result<T>) -> Result<T> {
        let mut inner = self.inner.write();
        if inner.poisoned {
            return Err(Error::TableUnavailable(self.table.clone()));
        }
        let result = op(&mut inner);
        if let Err(e) = &result {
            if e.is_fatal() {
                inner.poisoned = true;
                error!(table = %self.table, error = %e, "storage failure, table taken out of service");
            }
        }
        result
    }

    // ========================================================================
    // Row operations
    // ========================================================================

    /// Latest version of the row with `key`.
    pub fn get(&self, key: i64) -> Result<Option<Row>> {
        self.write(|inner| inner.get(key))
    }

    /// Whether a live row has `key`. Consults the index only.
    pub fn has(&self, key: i64) -> Result<bool> {
        self.read(|inner| inner.primary.contains_key(&key))
    }

    /// Number of live rows. Consults the index only.
    pub fn len(&self) -> Result<usize> {
        self.read(|inner| inner.primary.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    /// Live primary keys in ascending order.
    pub fn keys(&self) -> Result<Vec<i64>> {
        self.read(|inner| inner.primary.keys().copied().collect())
    }

    /// Add a row under a key that is not yet live.
    ///
    /// # Errors
    /// `Error::PrimaryKeyConflict` if the key is live.
    pub fn insert(&self, row: Row) -> Result<()> {
        self.write(|inner| {
            if inner.primary.contains_key(&row.key()) {
                return Err(Error::PrimaryKeyConflict { key: row.key() });
            }
            inner.append(&row)
        })
    }

    /// Write a new version of a row, live or not.
    pub fn replace(&self, row: Row) -> Result<()> {
        self.write(|inner| inner.append(&row))
    }

    /// Drop a key from the index. The stored versions stay in their pages.
    ///
    /// Returns `true` if the key was live.
    pub fn delete(&self, key: i64) -> Result<bool> {
        self.write(|inner| Ok(inner.primary.remove(&key).is_some()))
    }

    /// Every live row, in ascending key order.
    ///
    /// Each page holding a live row is parsed at most once.
    pub fn scan(&self) -> Result<Vec<Row>> {
        self.write(|inner| inner.scan())
    }

    /// Write dirty pages to disk. Returns the number of pages written.
    pub fn flush(&self) -> Result<usize> {
        self.write(|inner| {
            let written = inner.store.flush()?;
            inner.durable = inner.snapshot();
            Ok(written)
        })
    }

    /// Snapshot for persistence.
    ///
    /// A poisoned store reports the state of its last successful flush, so
    /// nothing points at pages that never reached the disk.
    pub fn state(&self) -> RowStoreState {
        let inner = self.inner.read();
        if inner.poisoned {
            inner.durable.clone()
        } else {
            inner.snapshot()
        }
    }
}

impl RowStoreInner {
    fn snapshot(&self) -> RowStoreState {
        RowStoreState {
            chain: self.pager.chain_state(),
            primary: self.primary.clone(),
        }
    }

    fn append(&mut self, row: &Row) -> Result<()> {
        let block = row.encode()?;
        let page_id = self.pager.append(&mut self.store, &block)?;
        self.primary.insert(row.key(), page_id);
        Ok(())
    }

    fn get(&mut self, key: i64) -> Result<Option<Row>> {
        let Some(&page_id) = self.primary.get(&key) else {
            return Ok(None);
        };

        if self.pager.current() != page_id || !self.pager.is_parsed() {
            self.pager.load(&mut self.store, page_id)?;
            self.cache = decode_page(&mut self.store, page_id)?;
            self.pager.mark_parsed();
        }

        match self.cache.get(&key) {
            Some(row) => Ok(Some(row.clone())),
            None => Err(missing_row(page_id, key)),
        }
    }

    fn scan(&mut self) -> Result<Vec<Row>> {
        let mut by_page: HashMap<PageId, Vec<i64>> = HashMap::new();
        for (&key, &page_id) in &self.primary {
            by_page.entry(page_id).or_default().push(key);
        }

        let mut rows = BTreeMap::new();
        for (page_id, keys) in by_page {
            let reuse_cache = page_id == self.pager.current() && self.pager.is_parsed();
            let decoded;
            let parsed = if reuse_cache {
                &self.cache
            } else {
                decoded = decode_page(&mut self.store, page_id)?;
                if page_id != self.pager.current() && page_id != self.pager.last_page() {
                    self.store.evict(page_id);
                }
                &decoded
            };

            for key in keys {
                let row = parsed.get(&key).ok_or_else(|| missing_row(page_id, key))?;
                rows.insert(key, row.clone());
            }
        }
        Ok(rows.into_values().collect())
    }
}

/// Parse every block of a page. Later versions of a key replace earlier ones.
fn decode_page(store: &mut PageStore, page_id: PageId) -> Result<BTreeMap<i64, Row>> {
    let mut rows = BTreeMap::new();
    for block in store.fetch(page_id)?.blocks() {
        let row = Row::decode(block?)?;
        rows.insert(row.key(), row);
    }
    Ok(rows)
}

fn missing_row(page_id: PageId, key: i64) -> Error {
    Error::PageCorrupt {
        page_id,
        reason: format!("indexed row {} is missing from the page", key),
    }
}
