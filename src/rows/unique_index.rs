//! Secondary index over one unique field.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::Value;

/// Map from a unique field's value to the primary key of the row holding it.
///
/// Keys are the value's display form, so lookups must use values already
/// coerced to the field's type. Each index carries its own lock and can be
/// read while other indexes of the table are being updated.
#[derive(Debug, Default)]
pub struct UniqueIndex {
    entries: RwLock<HashMap<String, i64>>,
}

impl UniqueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: HashMap<String, i64>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn get(&self, value: &Value) -> Option<i64> {
        self.entries.read().get(&value.to_string()).copied()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.entries.read().contains_key(&value.to_string())
    }

    /// Point `value` at `key`, returning the previous key.
    pub fn insert(&self, value: &Value, key: i64) -> Option<i64> {
        self.entries.write().insert(value.to_string(), key)
    }

    /// Remove `value` only if it still points at `key`.
    pub fn remove_if(&self, value: &Value, key: i64) -> bool {
        let mut entries = self.entries.write();
        let index_key = value.to_string();
        if entries.get(&index_key) == Some(&key) {
            entries.remove(&index_key);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of the entries, for persistence.
    pub fn entries(&self) -> HashMap<String, i64> {
        self.entries.read().clone()
    }
}
