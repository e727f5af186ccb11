//! Relation and uniqueness checks shared by create and update.

use crate::common::{Error, Result};
use crate::rows::Row;
use crate::schema::{Field, IndexLevel, Schema, Table};
use crate::types::{compare, Constraint, FieldType, Value};

use super::lookup;

/// Fail if another row already holds `value` in a unique field.
///
/// `own_key` is the row being updated, which may keep its own value.
pub(super) fn check_unique(table: &Table, field: &Field, value: &Value, own_key: Option<i64>) -> Result<()> {
    if field.index_level() != IndexLevel::Unique || value.is_null() {
        return Ok(());
    }
    match table.unique_index(field.name()).and_then(|index| index.get(value)) {
        Some(holder) if Some(holder) != own_key => Err(Error::UniqueConflict {
            field: field.name().to_string(),
        }),
        _ => Ok(()),
    }
}

/// Fail if a relation field points at a row that does not exist, or (on
/// update) at the row itself.
///
/// Vector relation fields are not checked.
pub(super) fn check_relation(
    schema: &Schema,
    table: &Table,
    field: &Field,
    own_key: Option<i64>,
    value: &Value,
) -> Result<()> {
    let Some(relation) = field.relation() else {
        return Ok(());
    };
    if field.field_type().is_vector() || value.is_null() {
        return Ok(());
    }

    let missing = || Error::RelationTargetMissing {
        table: table.name().to_string(),
        field: field.name().to_string(),
        rel_table: relation.table.clone(),
        rel_field: relation.field.clone(),
    };
    let Some(rel_table) = schema.table(&relation.table) else {
        return Err(missing());
    };
    let Some(rel_field) = rel_table.field(&relation.field) else {
        return Err(missing());
    };

    let target = find_first(rel_table, rel_field, value)?.ok_or_else(missing)?;
    if rel_table.name() == table.name() && Some(target.key()) == own_key {
        return Err(Error::SelfRelation {
            table: table.name().to_string(),
            field: field.name().to_string(),
        });
    }
    Ok(())
}

/// First row whose `field` equals `value`, or contains it when `field` is
/// a vector.
fn find_first(table: &Table, field: &Field, value: &Value) -> Result<Option<Row>> {
    if field.index_level() != IndexLevel::None {
        return lookup(table, field, value);
    }

    let field_type = field.field_type();
    let wanted = Constraint::Literal(value.clone());
    let matches = |row: &Row| match (field_type.item_type(), row.get(field.name())) {
        (Some(item_type), Value::Vector(items)) => contains(&item_type, items, &wanted),
        (Some(_), _) => false,
        (None, stored) => compare(field_type, stored, &wanted),
    };
    Ok(table.rows().scan()?.into_iter().find(|row| matches(row)))
}

fn contains(item_type: &FieldType, items: &[Value], wanted: &Constraint) -> bool {
    items.iter().any(|item| compare(item_type, item, wanted))
}
