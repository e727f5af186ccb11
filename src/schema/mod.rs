//! Schema model: descriptors, fields, tables and relation validation.

mod descriptor;
mod field;
pub mod props;
#[allow(clippy::module_inception)]
mod schema;
mod table;

pub use descriptor::{FieldDescriptor, PropDescriptor, TableDescriptor};
pub use field::{Field, Resolved};
pub use props::{DefaultValue, FieldProps, IndexLevel, Relation};
pub use schema::{Schema, SchemaState};
pub use table::{IdTracker, Table, TableState};
