//! Query engine: create, update, find and delete over a schema's tables.
//!
//! Payloads arrive as decoded JSON objects ([`QueryArg`]). Every value is
//! coerced through the field's type before it is compared, indexed or
//! stored, and a row is fully validated before anything is written.
//!
//! ```text
//!   where / data (JSON)
//!          │
//!          ▼
//!   Field::validate / Constraint::from_json
//!          │
//!          ├── indexed literal ──► UniqueIndex / primary key ──► RowStore::get
//!          └── anything else   ──► RowStore::scan + compare
//! ```

mod checks;
mod create;
mod delete;
mod find;
mod update;

#[cfg(test)]
pub(crate) mod fixtures;

pub use create::create;
pub use delete::delete;
pub use find::{find, find_unique, find_with_args, FindArgs, Order};
pub use update::update;

use crate::common::{Error, Result};
use crate::rows::Row;
use crate::schema::{Field, Table};
use crate::types::{compare, validate_type, Constraint, Value};

/// A decoded `data` or `where` payload: field name → JSON value.
pub type QueryArg = serde_json::Map<String, serde_json::Value>;

/// Fail on payload keys that are not fields of `table`.
fn reject_unknown_fields(table: &Table, arg: &QueryArg) -> Result<()> {
    match arg.keys().find(|name| table.field(name).is_none()) {
        Some(name) => Err(Error::BadRequest(format!(
            "Field {} does not exist in table {}",
            name,
            table.name()
        ))),
        None => Ok(()),
    }
}

/// Convert a field's JSON input. Absent input is `Null`; an object is not
/// a value.
fn json_input(field: &Field, json: Option<&serde_json::Value>) -> Result<Value> {
    match json {
        None => Ok(Value::Null),
        Some(json) => Value::from_json(json).ok_or_else(|| Error::invalid_type(field.name(), "object")),
    }
}

/// Parse a `where` payload into per-field constraints.
fn parse_constraints<'t>(table: &'t Table, arg: &QueryArg) -> Result<Vec<(&'t Field, Constraint)>> {
    reject_unknown_fields(table, arg)?;
    Ok(arg
        .iter()
        .filter_map(|(name, json)| {
            let field = table.field(name)?;
            Some((field, Constraint::from_json(field.field_type(), json)))
        })
        .collect())
}

fn matches_all(row: &Row, constraints: &[(&Field, Constraint)]) -> bool {
    constraints
        .iter()
        .all(|(field, constraint)| compare(field.field_type(), row.get(field.name()), constraint))
}

/// Direct lookup of an indexed field's literal.
///
/// A value that does not coerce to the field's type finds nothing.
fn lookup(table: &Table, field: &Field, value: &Value) -> Result<Option<Row>> {
    let Ok(value) = validate_type(field.name(), field.field_type(), value) else {
        return Ok(None);
    };

    let key = if field.is_primary_key() {
        value.as_int()
    } else {
        table.unique_index(field.name()).and_then(|index| index.get(&value))
    };
    match key {
        Some(key) => table.rows().get(key),
        None => Ok(None),
    }
}
