//! Schema - the named set of tables of one database.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::common::{Error, Result};
use crate::rows::RowStore;
use crate::schema::table::{TableDef, TableState};
use crate::schema::{Table, TableDescriptor};
use crate::storage::{DiskManager, StorageStats};
use crate::types::FieldType;

/// Persisted state of every table of a schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaState {
    pub tables: BTreeMap<String, TableState>,
}

/// A validated schema with row storage attached to every table.
///
/// Descriptors are kept so the schema can be persisted and reopened.
///
/// # Example
/// ```
/// use tabledb::schema::{FieldDescriptor, Schema, TableDescriptor};
///
/// let schema = Schema::from_descriptors(
///     "shop",
///     vec![TableDescriptor::new("item").field(FieldDescriptor::new("id", "Int").prop("key", "primary"))],
/// )
/// .unwrap();
/// assert!(schema.table("item").is_some());
/// ```
#[derive(Debug)]
pub struct Schema {
    name: String,
    descriptors: Vec<TableDescriptor>,
    tables: BTreeMap<String, Table>,
}

impl Schema {
    /// Build a schema whose tables live in memory.
    pub fn from_descriptors(name: impl Into<String>, descriptors: Vec<TableDescriptor>) -> Result<Self> {
        Self::open(name, descriptors, None, Arc::new(StorageStats::new()), None)
    }

    /// Build a schema, storing each table's pages under `dir/<table>` when
    /// a directory is given, and resuming from `state` if present.
    ///
    /// # Errors
    /// - `Error::SchemaParse` for a malformed descriptor
    /// - `Error::InvalidRelation` for an unresolvable relation
    /// - storage errors while reopening a table
    pub fn open(
        name: impl Into<String>,
        descriptors: Vec<TableDescriptor>,
        dir: Option<&Path>,
        stats: Arc<StorageStats>,
        state: Option<SchemaState>,
    ) -> Result<Self> {
        let defs = define_tables(&descriptors)?;
        validate_relations(&defs)?;

        let mut saved = state.unwrap_or_default().tables;
        let mut tables = BTreeMap::new();
        for (table_name, def) in defs {
            let table_state = saved.remove(&table_name);
            let disk = match dir {
                Some(dir) => Some(DiskManager::open(dir.join(&table_name))?),
                None => None,
            };
            let rows = RowStore::open(
                table_name.clone(),
                disk,
                stats.clone(),
                table_state.as_ref().map(|s| s.rows.clone()),
            )?;
            tables.insert(table_name, Table::new(def, rows, table_state));
        }

        let name = name.into();
        debug!(schema = %name, tables = tables.len(), "schema opened");
        Ok(Self {
            name,
            descriptors,
            tables,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptors(&self) -> &[TableDescriptor] {
        &self.descriptors
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Write the dirty pages of every table. Returns the pages written.
    ///
    /// A table that cannot be flushed does not stop the others; the first
    /// failure is returned once every table has been tried.
    pub fn flush(&self) -> Result<usize> {
        let mut written = 0;
        let mut failure = None;
        for table in self.tables.values() {
            if table.rows().is_poisoned() {
                error!(schema = %self.name, table = table.name(), "table out of service, not flushed");
                failure.get_or_insert_with(|| Error::TableUnavailable(table.name().to_string()));
                continue;
            }
            match table.rows().flush() {
                Ok(pages) => written += pages,
                Err(e) => {
                    error!(schema = %self.name, table = table.name(), error = %e, "table not flushed");
                    failure.get_or_insert(e);
                }
            }
        }
        failure.map_or(Ok(written), Err)
    }

    /// Snapshot for persistence.
    pub fn state(&self) -> SchemaState {
        SchemaState {
            tables: self
                .tables
                .iter()
                .map(|(name, table)| (name.clone(), table.state()))
                .collect(),
        }
    }
}

/// Equality is structural: table definitions only.
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.tables == other.tables
    }
}

fn define_tables(descriptors: &[TableDescriptor]) -> Result<BTreeMap<String, TableDef>> {
    let mut defs = BTreeMap::new();
    for desc in descriptors {
        if defs.contains_key(&desc.name) {
            return Err(Error::parse(desc.line, format!("Duplicate table {}", desc.name)));
        }
        defs.insert(desc.name.clone(), TableDef::from_descriptor(desc)?);
    }
    Ok(defs)
}

/// Check that every relation points at an existing, type-compatible field.
///
/// | field        | target       | rule                                   |
/// |--------------|--------------|----------------------------------------|
/// | scalar T     | scalar T     | same type                              |
/// | Vector(T, 1) | scalar T     | one-to-many                            |
/// | scalar T     | Vector(T, 1) | many-to-one                            |
/// | Vector(T, 1) | Vector(T, 1) | many-to-many, same element and level   |
///
/// Nested vectors are never relation endpoints, and a field cannot relate
/// to itself.
fn validate_relations(defs: &BTreeMap<String, TableDef>) -> Result<()> {
    for (table_name, def) in defs {
        for (field_name, field) in &def.fields {
            let Some(relation) = field.relation() else {
                continue;
            };
            let invalid = |reason: String| Error::InvalidRelation {
                table: table_name.clone(),
                rel_table: relation.table.clone(),
                field: field_name.clone(),
                reason,
            };

            let rel_table = defs
                .get(&relation.table)
                .ok_or_else(|| invalid(format!("{} is not a valid table", relation.table)))?;
            let rel_field = rel_table.fields.get(&relation.field).ok_or_else(|| {
                invalid(format!(
                    "{} is not a valid field on table {}",
                    relation.field, relation.table
                ))
            })?;

            if relation.table == *table_name && relation.field == *field_name {
                return Err(invalid("a field cannot relate to itself".to_string()));
            }
            if field.field_type().level() > 1 || rel_field.field_type().level() > 1 {
                return Err(invalid("nested vector fields cannot be relations".to_string()));
            }
            if !relation_types_match(field.field_type(), rel_field.field_type()) {
                return Err(invalid("field types must match".to_string()));
            }
        }
    }
    Ok(())
}

fn relation_types_match(field: &FieldType, target: &FieldType) -> bool {
    field.base() == target.base()
}
