//! Row - one record of a table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::Result;
use crate::types::Value;

/// Attribute name the primary key is rendered under.
///
/// It is not a column: user fields can never collide with it because the
/// key is stored beside the values, not among them.
pub const PRIMARY_KEY_ATTR: &str = "__tdb_id__";

static NULL: Value = Value::Null;

/// A row: its primary key plus field values ordered by field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    key: i64,
    values: BTreeMap<String, Value>,
}

impl Row {
    pub fn new(key: i64, values: BTreeMap<String, Value>) -> Self {
        Self { key, values }
    }

    /// Builder-style setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    #[inline]
    pub fn key(&self) -> i64 {
        self.key
    }

    /// Value of `field`; `Null` when the row has none.
    pub fn get(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&NULL)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.values.insert(field.into(), value);
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Render as a JSON object, primary key included.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object: serde_json::Map<String, serde_json::Value> = self
            .values
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        object.insert(PRIMARY_KEY_ATTR.to_string(), self.key.into());
        serde_json::Value::Object(object)
    }

    /// Encode as a page block: the `(primary key, values)` pair.
    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&(self.key, &self.values))?)
    }

    /// Decode a page block written by [`Row::encode`].
    pub(crate) fn decode(block: &[u8]) -> Result<Self> {
        let (key, values): (i64, BTreeMap<String, Value>) = bincode::deserialize(block)?;
        Ok(Self { key, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_field_is_null() {
        let row = Row::new(1, BTreeMap::new()).with("a", 5);
        assert_eq!(row.get("a"), &Value::Int(5));
        assert_eq!(row.get("b"), &Value::Null);
    }

    #[test]
    fn test_to_json_includes_key() {
        let row = Row::new(7, BTreeMap::new()).with("b", "hello").with("c", Value::Null);
        assert_eq!(
            row.to_json(),
            json!({"b": "hello", "c": null, "__tdb_id__": 7})
        );
    }

    #[test]
    fn test_block_codec() {
        let row = Row::new(42, BTreeMap::new())
            .with("name", "x")
            .with("tags", vec![Value::Int(1), Value::Int(2)]);
        let block = row.encode().unwrap();
        assert_eq!(Row::decode(&block).unwrap(), row);
    }

    #[test]
    fn test_decode_garbage() {
        let err = Row::decode(&[0xff, 0x01]).unwrap_err();
        assert!(err.is_fatal());
    }
}
