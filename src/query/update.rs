//! Row updates, including the `push`, `increment` and `decrement`
//! operators.

use tracing::debug;

use crate::common::{Error, Result};
use crate::query::checks::{check_relation, check_unique};
use crate::query::{json_input, reject_unknown_fields, QueryArg};
use crate::rows::Row;
use crate::schema::{DefaultValue, Field, Schema, Table};
use crate::types::{validate_type, FieldType, Value};

/// Apply `data` to `row` of `table_name` and store the result.
///
/// Only the fields named in `data` change. A plain value replaces the
/// stored one (no defaults); an object applies operators:
///
/// | field type | operator                  | effect                        |
/// |------------|---------------------------|-------------------------------|
/// | Vector     | `{"push": [..]}`          | append validated items        |
/// | Int        | `{"increment": n}`        | add `n`; `Null` counts as 0   |
/// | Int        | `{"decrement": n}`        | subtract `n`; `Null` as 0     |
///
/// Relations may not point at the row itself. A unique value may stay on
/// the row that already holds it.
///
/// # Errors
/// - `Error::Forbidden` if `data` names the primary key
/// - `Error::BadRequest` for an unknown field or operator
/// - the validation, relation and uniqueness errors of [`create`](super::create)
pub fn update(schema: &Schema, table_name: &str, row: &Row, data: &QueryArg) -> Result<Row> {
    let table = schema
        .table(table_name)
        .ok_or_else(|| Error::TableNotFound(table_name.to_string()))?;
    reject_unknown_fields(table, data)?;

    let mut updated = row.clone();
    let mut increments = Vec::new();
    for field in table.fields().values() {
        let Some(input) = data.get(field.name()) else {
            continue;
        };
        if field.is_primary_key() {
            return Err(Error::Forbidden("primary key cannot be updated".to_string()));
        }

        let value = match input {
            serde_json::Value::Object(ops) => apply_ops(field, row.get(field.name()), ops)?,
            other => {
                let input = json_input(field, Some(other))?;
                field.validate(&input)?
            }
        };

        check_relation(schema, table, field, Some(row.key()), &value)?;
        check_unique(table, field, &value, Some(row.key()))?;

        if let (Some(DefaultValue::AutoIncrement), Some(n)) = (&field.props().default, value.as_int()) {
            increments.push((field, n));
        }
        updated.set(field.name(), value);
    }

    table.rows().replace(updated.clone())?;
    for (field, n) in increments {
        field.observe(n);
    }
    reindex_row(table, row, &updated);

    debug!(table = table.name(), key = row.key(), "row updated");
    Ok(updated)
}

fn apply_ops(field: &Field, current: &Value, ops: &QueryArg) -> Result<Value> {
    let unsupported = |op: &str| {
        Error::BadRequest(format!(
            "Unsupported update operation {} for field {}",
            op,
            field.name()
        ))
    };

    match field.field_type() {
        FieldType::Vector { .. } => {
            let mut items = match current {
                Value::Vector(items) => items.clone(),
                _ => Vec::new(),
            };
            for (op, operand) in ops {
                if op != "push" {
                    return Err(unsupported(op));
                }
                let operand = json_input(field, Some(operand))?;
                if let Value::Vector(pushed) = validate_type(field.name(), field.field_type(), &operand)? {
                    items.extend(pushed);
                }
            }
            Ok(Value::Vector(items))
        }
        FieldType::Int => {
            let mut n = current.as_int().unwrap_or(0);
            for (op, operand) in ops {
                let operand = json_input(field, Some(operand))?;
                let Value::Int(delta) = validate_type(field.name(), &FieldType::Int, &operand)? else {
                    return Err(Error::invalid_type(field.name(), operand.kind()));
                };
                let next = match op.as_str() {
                    "increment" => n.checked_add(delta),
                    "decrement" => n.checked_sub(delta),
                    other => return Err(unsupported(other)),
                };
                n = next.ok_or_else(|| {
                    Error::BadRequest(format!("Integer overflow in field {}", field.name()))
                })?;
            }
            Ok(Value::Int(n))
        }
        _ => Err(Error::invalid_type(field.name(), "object")),
    }
}

/// Move unique index entries from the old row's values to the new row's.
fn reindex_row(table: &Table, old: &Row, new: &Row) {
    for name in table.indexes() {
        let Some(index) = table.unique_index(name) else {
            continue;
        };
        let (before, after) = (old.get(name), new.get(name));
        if before == after {
            continue;
        }
        if !before.is_null() {
            index.remove_if(before, old.key());
        }
        if !after.is_null() {
            index.insert(after, new.key());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::create;
    use crate::query::fixtures::{arg, schema, seed_users};
    use crate::schema::{FieldDescriptor, TableDescriptor};
    use serde_json::json;

    fn user(schema: &Schema, key: i64) -> Row {
        schema.table("users").unwrap().rows().get(key).unwrap().unwrap()
    }

    #[test]
    fn test_update_moves_unique_entry() {
        let schema = schema();
        let row = create(&schema, "a", &arg(json!({"b": "hello"}))).unwrap();
        let updated = update(&schema, "a", &row, &arg(json!({"b": "world"}))).unwrap();
        assert_eq!(updated.get("b"), &Value::from("world"));

        let index = schema.table("a").unwrap().unique_index("b").unwrap();
        assert_eq!(index.get(&"world".into()), Some(row.key()));
        assert_eq!(index.get(&"hello".into()), None);

        // the old value is free again
        create(&schema, "a", &arg(json!({"b": "hello"}))).unwrap();
    }

    #[test]
    fn test_update_unique_conflict_and_own_value() {
        let schema = schema();
        seed_users(&schema);

        let err = update(&schema, "users", &user(&schema, 1), &arg(json!({"name": "bob"}))).unwrap_err();
        assert!(matches!(err, Error::UniqueConflict { .. }));
        assert_eq!(user(&schema, 1).get("name"), &Value::from("ann"));

        let same = update(&schema, "users", &user(&schema, 1), &arg(json!({"name": "ann", "age": 32}))).unwrap();
        assert_eq!(same.get("age"), &Value::Int(32));
    }

    #[test]
    fn test_update_primary_key_forbidden() {
        let schema = schema();
        let row = create(&schema, "a", &arg(json!({"b": "x"}))).unwrap();
        let err = update(&schema, "a", &row, &arg(json!({"id": 5}))).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert_eq!(err.status(), 403);
    }

    #[test]
    fn test_increment_and_decrement() {
        let schema = schema();
        seed_users(&schema);

        let row = update(&schema, "users", &user(&schema, 2), &arg(json!({"age": {"increment": 5}}))).unwrap();
        assert_eq!(row.get("age"), &Value::Int(30));
        let row = update(&schema, "users", &row, &arg(json!({"age": {"decrement": 40}}))).unwrap();
        assert_eq!(row.get("age"), &Value::Int(-10));

        // null counts as zero
        let fresh = create(&schema, "users", &arg(json!({"name": "dan"}))).unwrap();
        let row = update(&schema, "users", &fresh, &arg(json!({"age": {"increment": 2}}))).unwrap();
        assert_eq!(row.get("age"), &Value::Int(2));

        let err = update(&schema, "users", &row, &arg(json!({"age": {"multiply": 2}}))).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn test_push() {
        let schema = schema();
        seed_users(&schema);

        let row = update(&schema, "users", &user(&schema, 1), &arg(json!({"tags": {"push": ["a"]}}))).unwrap();
        let row = update(&schema, "users", &row, &arg(json!({"tags": {"push": ["b", "c"]}}))).unwrap();
        assert_eq!(
            row.get("tags"),
            &Value::Vector(vec!["a".into(), "b".into(), "c".into()])
        );

        let err = update(&schema, "users", &row, &arg(json!({"tags": {"push": [1]}}))).unwrap_err();
        assert!(matches!(err, Error::InvalidFieldType { .. }));
    }

    #[test]
    fn test_operators_on_other_types() {
        let schema = schema();
        seed_users(&schema);
        let err = update(&schema, "users", &user(&schema, 1), &arg(json!({"name": {"push": ["x"]}}))).unwrap_err();
        assert!(matches!(err, Error::InvalidFieldType { .. }));
    }

    #[test]
    fn test_update_rejects_self_relation() {
        let schema = schema();
        seed_users(&schema);
        let first = create(&schema, "posts", &arg(json!({"title": "a", "author": 1}))).unwrap();
        let second = create(&schema, "posts", &arg(json!({"title": "b", "author": 1}))).unwrap();

        let err = update(&schema, "posts", &first, &arg(json!({"parent": first.key()}))).unwrap_err();
        assert!(matches!(err, Error::SelfRelation { .. }));

        let row = update(&schema, "posts", &first, &arg(json!({"parent": second.key()}))).unwrap();
        assert_eq!(row.get("parent"), &Value::Int(second.key()));

        let err = update(&schema, "posts", &row, &arg(json!({"author": 77}))).unwrap_err();
        assert!(matches!(err, Error::RelationTargetMissing { .. }));
    }

    #[test]
    fn test_rejected_update_leaves_counter() {
        let schema = Schema::from_descriptors(
            "test",
            vec![TableDescriptor::new("t")
                .field(FieldDescriptor::new("id", "Int").prop("key", "primary"))
                .field(FieldDescriptor::new("n", "Int").prop("default", "autoincrement"))
                .field(FieldDescriptor::new("z", "String").prop("unique", "true"))],
        )
        .unwrap();
        create(&schema, "t", &arg(json!({"z": "x"}))).unwrap();
        let row = create(&schema, "t", &arg(json!({"z": "y"}))).unwrap();
        let counter = schema.table("t").unwrap().field("n").unwrap();
        assert_eq!(counter.increment_state(), 2);

        update(&schema, "t", &row, &arg(json!({"n": 50, "z": "x"}))).unwrap_err();
        assert_eq!(counter.increment_state(), 2);

        update(&schema, "t", &row, &arg(json!({"n": 50}))).unwrap();
        assert_eq!(counter.increment_state(), 50);
    }

    #[test]
    fn test_update_requires_value_without_defaults() {
        let schema = schema();
        seed_users(&schema);
        let err = update(&schema, "users", &user(&schema, 1), &arg(json!({"name": null}))).unwrap_err();
        assert!(matches!(err, Error::InvalidFieldType { .. }));

        // optional fields may be cleared
        let row = update(&schema, "users", &user(&schema, 1), &arg(json!({"age": null}))).unwrap();
        assert_eq!(row.get("age"), &Value::Null);
    }
}
