//! Error types for tabledb.

use thiserror::Error;

use crate::common::PageId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in tabledb.
///
/// Validation and lookup errors are returned to the caller as structured
/// responses (see [`Error::status`]). Storage corruption is fatal for the
/// affected table (see [`Error::is_fatal`]).
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A row block could not be encoded or decoded.
    #[error("row encoding error: {0}")]
    Codec(#[from] bincode::Error),

    /// A JSON payload or metadata file could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unusable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A table or field descriptor was rejected.
    #[error("Error parsing line {line}: {reason}")]
    SchemaParse { line: usize, reason: String },

    /// A value does not match the declared type and no default applies.
    #[error("Invalid field type for {field}: {found}")]
    InvalidFieldType { field: String, found: String },

    /// The field's type cannot be handled here.
    ///
    /// Schema validation should make this unreachable.
    #[error("Unsupported field type for {field}: {field_type}")]
    UnsupportedFieldType { field: String, field_type: String },

    /// A relation property does not resolve to a compatible field.
    #[error("Invalid relation between {table} and {rel_table} in field {field}; {reason}")]
    InvalidRelation {
        table: String,
        rel_table: String,
        field: String,
        reason: String,
    },

    /// No row holds the value a relation field points at.
    #[error("No row found for relation {table}.{field} -> {rel_table}.{rel_field}")]
    RelationTargetMissing {
        table: String,
        field: String,
        rel_table: String,
        rel_field: String,
    },

    /// A row was updated to point at itself through a relation.
    #[error("Row cannot create a relation to itself ({table}.{field})")]
    SelfRelation { table: String, field: String },

    /// A strict find was issued without constraints.
    #[error("Where constraints cannot be empty")]
    MissingWhereConstraint,

    /// `findUnique` was issued without naming an indexed field.
    #[error("Unique fields not included in findUnique request")]
    NoUniqueFieldInWhere,

    /// `findUnique` was issued against a table without indexed fields.
    #[error("Table does not have any unique fields")]
    TableHasNoUniqueFields,

    /// Another row already holds this unique value.
    #[error("Value for unique field {field} already exists")]
    UniqueConflict { field: String },

    /// Another row already holds this primary key.
    #[error("Primary key {key} already exists")]
    PrimaryKeyConflict { key: i64 },

    /// The request shape is not understood.
    #[error("{0}")]
    BadRequest(String),

    /// The request is well-formed but not permitted.
    #[error("{0}")]
    Forbidden(String),

    /// The named table does not exist in the schema.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// No row matched the unique selector of an update or delete.
    #[error("Row not found in table {0}")]
    RowNotFound(String),

    /// The named database does not exist.
    #[error("Database not found with name {0}")]
    DatabaseNotFound(String),

    /// A database with this name already exists.
    #[error("Database already exists with name {0}")]
    DatabaseExists(String),

    /// Pushing the block would exceed the page capacity.
    ///
    /// Internal: the paging manager always retries on the next page.
    #[error("page overflow")]
    PageOverflow,

    /// A single block can never fit in a page.
    #[error("maximum data size exceeded: {size} bytes")]
    MaxDataSize { size: usize },

    /// The 48-byte page header could not be decoded.
    #[error("invalid page header: {0}")]
    PageHeaderCorrupt(String),

    /// The header of a loaded page names a different page.
    #[error("page id mismatch: requested {requested}, header holds {found}")]
    PageIdMismatch { requested: PageId, found: PageId },

    /// The block sequence inside a page is truncated or unreadable.
    #[error("page {page_id} is corrupted: {reason}")]
    PageCorrupt { page_id: PageId, reason: String },

    /// A previous fatal storage error took the table out of service.
    #[error("table {0} is unavailable after a storage failure")]
    TableUnavailable(String),
}

impl Error {
    /// Build an `InvalidFieldType` error for `field`, describing `found`.
    pub fn invalid_type(field: impl Into<String>, found: impl Into<String>) -> Self {
        Error::InvalidFieldType {
            field: field.into(),
            found: found.into(),
        }
    }

    /// Build a `SchemaParse` error for the descriptor on `line`.
    pub fn parse(line: usize, reason: impl Into<String>) -> Self {
        Error::SchemaParse {
            line,
            reason: reason.into(),
        }
    }

    /// HTTP-style status code reported to the caller.
    pub fn status(&self) -> u16 {
        match self {
            Error::UniqueConflict { .. }
            | Error::PrimaryKeyConflict { .. }
            | Error::DatabaseExists(_) => 409,
            Error::TableNotFound(_) | Error::RowNotFound(_) | Error::DatabaseNotFound(_) => 404,
            Error::Forbidden(_) => 403,
            Error::Io(_)
            | Error::Codec(_)
            | Error::PageOverflow
            | Error::PageHeaderCorrupt(_)
            | Error::PageIdMismatch { .. }
            | Error::PageCorrupt { .. }
            | Error::TableUnavailable(_)
            | Error::UnsupportedFieldType { .. } => 500,
            _ => 400,
        }
    }

    /// Whether this error means on-disk state can no longer be trusted.
    ///
    /// Fatal errors take the affected table out of service; recovery is a
    /// restart from the last flushed snapshot.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Codec(_)
                | Error::PageHeaderCorrupt(_)
                | Error::PageIdMismatch { .. }
                | Error::PageCorrupt { .. }
        )
    }
}
