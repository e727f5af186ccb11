//! Table - fields, indexes and row storage of one table.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::rows::{RowStore, RowStoreState, UniqueIndex};
use crate::schema::props::IndexLevel;
use crate::schema::{Field, TableDescriptor};

/// The last id handed out by a table.
///
/// Monotonic: ids are never reused, even after deletes, and explicit keys
/// push the tracker past them. Fresh ids are `current() + 1` onwards.
#[derive(Debug, Default)]
pub struct IdTracker(AtomicI64);

impl IdTracker {
    pub fn new(last: i64) -> Self {
        Self(AtomicI64::new(last))
    }

    /// Record an id chosen by the caller.
    pub fn observe(&self, id: i64) {
        self.0.fetch_max(id, Ordering::SeqCst);
    }

    /// The last id minted or observed.
    pub fn current(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Persisted per-table state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableState {
    pub last_id: i64,
    #[serde(default)]
    pub counters: BTreeMap<String, i64>,
    pub rows: RowStoreState,
    #[serde(default)]
    pub unique: BTreeMap<String, HashMap<String, i64>>,
}

/// A table definition before storage is attached.
#[derive(Debug)]
pub(crate) struct TableDef {
    pub(crate) name: String,
    pub(crate) fields: BTreeMap<String, Field>,
    pub(crate) indexes: Vec<String>,
}

impl TableDef {
    /// Resolve a table descriptor: fields, duplicates, primary key.
    pub(crate) fn from_descriptor(desc: &TableDescriptor) -> Result<Self> {
        if desc.name.trim().is_empty() {
            return Err(Error::parse(desc.line, "Table name cannot be empty"));
        }

        let mut fields = BTreeMap::new();
        let mut indexes = Vec::new();
        let mut has_primary = false;

        for field_desc in &desc.fields {
            if fields.contains_key(&field_desc.name) {
                return Err(Error::parse(
                    field_desc.line,
                    format!("Duplicate field {}", field_desc.name),
                ));
            }
            let field = Field::from_descriptor(field_desc)?;

            match field.index_level() {
                IndexLevel::Primary => {
                    if has_primary {
                        return Err(Error::parse(
                            field_desc.line,
                            "Table can't have multiple primary keys",
                        ));
                    }
                    has_primary = true;
                    indexes.insert(0, field.name().to_string());
                }
                IndexLevel::Unique => indexes.push(field.name().to_string()),
                IndexLevel::None => {}
            }
            fields.insert(field_desc.name.clone(), field);
        }

        Ok(Self {
            name: desc.name.clone(),
            fields,
            indexes,
        })
    }
}

/// A table: its fields, index list, id tracker, rows and unique indexes.
///
/// The index list holds the primary key first (if any), then the unique
/// fields in declaration order. Every non-primary entry has a
/// [`UniqueIndex`].
#[derive(Debug)]
pub struct Table {
    name: String,
    fields: BTreeMap<String, Field>,
    indexes: Vec<String>,
    ids: IdTracker,
    rows: RowStore,
    unique: HashMap<String, UniqueIndex>,
}

impl Table {
    pub(crate) fn new(def: TableDef, rows: RowStore, state: Option<TableState>) -> Self {
        let TableDef {
            name,
            fields,
            indexes,
        } = def;

        let (last_id, counters, mut saved_unique) = match state {
            Some(state) => (state.last_id, state.counters, state.unique),
            None => (0, BTreeMap::new(), BTreeMap::new()),
        };

        for (field_name, value) in counters {
            if let Some(field) = fields.get(&field_name) {
                field.observe(value);
            }
        }

        let unique = indexes
            .iter()
            .filter(|name| fields.get(*name).is_some_and(|f| !f.is_primary_key()))
            .map(|name| {
                let entries = saved_unique.remove(name).unwrap_or_default();
                (name.clone(), UniqueIndex::from_entries(entries))
            })
            .collect();

        Self {
            name,
            fields,
            indexes,
            ids: IdTracker::new(last_id),
            rows,
            unique,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &BTreeMap<String, Field> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Indexed field names, primary key first.
    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    pub fn primary_key(&self) -> Option<&Field> {
        self.indexes
            .first()
            .and_then(|name| self.fields.get(name))
            .filter(|field| field.is_primary_key())
    }

    /// The secondary index of a unique field.
    pub fn unique_index(&self, field: &str) -> Option<&UniqueIndex> {
        self.unique.get(field)
    }

    #[inline]
    pub fn ids(&self) -> &IdTracker {
        &self.ids
    }

    #[inline]
    pub fn rows(&self) -> &RowStore {
        &self.rows
    }

    /// Snapshot for persistence.
    pub fn state(&self) -> TableState {
        TableState {
            last_id: self.ids.current(),
            counters: self
                .fields
                .values()
                .filter(|f| f.increment_state() > 0)
                .map(|f| (f.name().to_string(), f.increment_state()))
                .collect(),
            rows: self.rows.state(),
            unique: self
                .unique
                .iter()
                .map(|(name, index)| (name.clone(), index.entries()))
                .collect(),
        }
    }
}

/// Equality is structural: rows and counters do not take part.
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields && self.indexes == other.indexes
    }
}
