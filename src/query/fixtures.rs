//! Schemas shared by the query tests.

use serde_json::json;

use crate::query::QueryArg;
use crate::schema::{FieldDescriptor, Schema, TableDescriptor};

/// `a { id Int key(primary), b String unique(true) }`
pub(crate) fn table_a() -> TableDescriptor {
    TableDescriptor::new("a")
        .field(FieldDescriptor::new("id", "Int").prop("key", "primary"))
        .field(FieldDescriptor::new("b", "String").prop("unique", "true"))
}

pub(crate) fn users() -> TableDescriptor {
    TableDescriptor::new("users")
        .at_line(5)
        .field(FieldDescriptor::new("id", "Int").prop("key", "primary"))
        .field(FieldDescriptor::new("name", "String").prop("unique", "true"))
        .field(FieldDescriptor::new("age", "Int").prop("optional", "true"))
        .field(FieldDescriptor::new("score", "Float").prop("default", "0.5"))
        .field(
            FieldDescriptor::new("tags", "Vector")
                .prop("vector", "String")
                .prop("optional", "true"),
        )
}

pub(crate) fn posts() -> TableDescriptor {
    TableDescriptor::new("posts")
        .at_line(20)
        .field(FieldDescriptor::new("id", "Int").prop("key", "primary"))
        .field(FieldDescriptor::new("title", "String"))
        .field(FieldDescriptor::new("author", "Int").prop("relation", "users.id"))
        .field(
            FieldDescriptor::new("parent", "Int")
                .prop("optional", "true")
                .prop("relation", "posts.id"),
        )
}

pub(crate) fn schema() -> Schema {
    Schema::from_descriptors("test", vec![table_a(), users(), posts()]).unwrap()
}

/// Build a payload from a `json!` object literal.
pub(crate) fn arg(value: serde_json::Value) -> QueryArg {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

pub(crate) fn seed_users(schema: &Schema) {
    for (name, age) in [("ann", 31), ("bob", 25), ("cat", 40)] {
        crate::query::create(schema, "users", &arg(json!({"name": name, "age": age}))).unwrap();
    }
}
