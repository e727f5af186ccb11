//! Type system: values, declared field types, coercion and comparison.
//!
//! This module has no dependency on schemas or storage. Field-level rules
//! that need schema context (defaults, optional fields, primary key
//! minting) live on [`crate::schema::Field`].

mod compare;
mod field_type;
mod validate;
mod value;

pub use compare::{compare, order, Constraint, IntOp, StrOp};
pub use field_type::{BuiltinType, FieldType};
pub use validate::validate_type;
pub(crate) use validate::parse_bool;
pub use value::Value;
