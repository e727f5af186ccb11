//! Row creation.

use std::collections::BTreeMap;

use tracing::debug;

use crate::common::{Error, Result};
use crate::query::checks::{check_relation, check_unique};
use crate::query::{json_input, reject_unknown_fields, QueryArg};
use crate::rows::Row;
use crate::schema::{DefaultValue, Field, Resolved, Schema, Table};
use crate::types::Value;

/// Create a row in `table_name` from `data`.
///
/// Every field is validated (defaults allowed), relations must resolve and
/// unique values must be free before the row is written. The row store is
/// written first, then the unique indexes.
///
/// The key is the explicit primary-key value when one is given, otherwise
/// a fresh id from the table's tracker. Ids and autoincrement values are
/// only taken from the table once the row is accepted.
///
/// # Errors
/// - `Error::TableNotFound` for an unknown table
/// - `Error::BadRequest` for a field the table does not have
/// - `Error::InvalidFieldType` for a value that cannot be coerced
/// - `Error::RelationTargetMissing`, `Error::UniqueConflict`,
///   `Error::PrimaryKeyConflict`
pub fn create(schema: &Schema, table_name: &str, data: &QueryArg) -> Result<Row> {
    let table = schema
        .table(table_name)
        .ok_or_else(|| Error::TableNotFound(table_name.to_string()))?;
    reject_unknown_fields(table, data)?;

    let explicit_key = explicit_primary_key(table, data)?;

    let mut resolved = Vec::new();
    for field in table.fields().values().filter(|f| !f.is_primary_key()) {
        let input = json_input(field, data.get(field.name()))?;
        resolved.push((field, field.resolve(&input)?));
    }

    let mut draws = Draws::new(table, explicit_key);
    let mut values = BTreeMap::new();
    for (field, resolved) in resolved {
        let value = draws.take(field, resolved);
        check_relation(schema, table, field, None, &value)?;
        check_unique(table, field, &value, None)?;
        values.insert(field.name().to_string(), value);
    }

    let key = explicit_key.unwrap_or_else(|| draws.table_id());
    if let Some(pk) = table.primary_key() {
        values.insert(pk.name().to_string(), Value::Int(key));
    }

    let row = Row::new(key, values);
    table.rows().insert(row.clone())?;
    draws.commit();
    index_row(table, &row);

    debug!(table = table.name(), key, "row created");
    Ok(row)
}

/// The caller-chosen key, if the table has a primary key and `data` sets it.
fn explicit_primary_key(table: &Table, data: &QueryArg) -> Result<Option<i64>> {
    let Some(pk) = table.primary_key() else {
        return Ok(None);
    };
    let input = json_input(pk, data.get(pk.name()))?;
    if input.is_null() {
        return Ok(None);
    }

    let key = pk
        .validate(&input)?
        .as_int()
        .ok_or_else(|| Error::invalid_type(pk.name(), input.kind()))?;
    if table.rows().has(key)? {
        return Err(Error::PrimaryKeyConflict { key });
    }
    Ok(Some(key))
}

/// Counter values taken for one row. The table's counters only move on
/// [`commit`](Draws::commit).
struct Draws<'t> {
    table: &'t Table,
    last_id: i64,
    increments: Vec<(&'t Field, i64)>,
}

impl<'t> Draws<'t> {
    fn new(table: &'t Table, explicit_key: Option<i64>) -> Self {
        let current = table.ids().current();
        Self {
            table,
            last_id: explicit_key.map_or(current, |key| current.max(key)),
            increments: Vec::new(),
        }
    }

    fn table_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn take(&mut self, field: &'t Field, resolved: Resolved) -> Value {
        match resolved {
            Resolved::Value(value) => {
                if let (Some(DefaultValue::AutoIncrement), Some(n)) =
                    (&field.props().default, value.as_int())
                {
                    self.increments.push((field, n));
                }
                value
            }
            Resolved::TableId => Value::Int(self.table_id()),
            Resolved::Increment => {
                let n = field.increment_state() + 1;
                self.increments.push((field, n));
                Value::Int(n)
            }
        }
    }

    fn commit(self) {
        self.table.ids().observe(self.last_id);
        for (field, n) in self.increments {
            field.observe(n);
        }
    }
}

fn index_row(table: &Table, row: &Row) {
    for name in table.indexes() {
        let value = row.get(name);
        if let (Some(index), false) = (table.unique_index(name), value.is_null()) {
            index.insert(value, row.key());
        }
    }
}
