//! Row deletion.

use tracing::debug;

use crate::common::Result;
use crate::rows::Row;
use crate::schema::Table;

/// Delete `row` from `table` and release its unique values.
///
/// Returns `false` if the row was already gone. Index entries are removed
/// only while they still point at this row.
pub fn delete(table: &Table, row: &Row) -> Result<bool> {
    let removed = table.rows().delete(row.key())?;

    for name in table.indexes() {
        let value = row.get(name);
        if let (Some(index), false) = (table.unique_index(name), value.is_null()) {
            index.remove_if(value, row.key());
        }
    }

    debug!(table = table.name(), key = row.key(), removed, "row deleted");
    Ok(removed)
}
