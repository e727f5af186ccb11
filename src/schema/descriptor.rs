//! Pre-parsed schema input.
//!
//! The textual schema language is tokenized elsewhere; the engine consumes
//! these descriptors. Line numbers are carried through for error messages.

use serde::{Deserialize, Serialize};

/// One `name(value)` property as written on a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropDescriptor {
    pub name: String,
    pub value: String,
}

/// A field as declared: name, type name and raw properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub line: usize,
    pub type_name: String,
    #[serde(default)]
    pub props: Vec<PropDescriptor>,
}

/// A table as declared.
///
/// # Example
/// ```
/// use tabledb::schema::{FieldDescriptor, TableDescriptor};
///
/// let table = TableDescriptor::new("a")
///     .field(FieldDescriptor::new("id", "Int").prop("key", "primary"))
///     .field(FieldDescriptor::new("b", "String").prop("unique", "true"));
/// assert_eq!(table.fields[1].line, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub line: usize,
    pub fields: Vec<FieldDescriptor>,
}

impl TableDescriptor {
    /// Start a table declared on line 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            line: 1,
            fields: Vec::new(),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Append a field. Fields without an explicit line are numbered after
    /// the table line and the preceding fields.
    pub fn field(mut self, mut field: FieldDescriptor) -> Self {
        if field.line == 0 {
            field.line = self.line + self.fields.len() + 1;
        }
        self.fields.push(field);
        self
    }
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            line: 0,
            type_name: type_name.into(),
            props: Vec::new(),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.push(PropDescriptor {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}
