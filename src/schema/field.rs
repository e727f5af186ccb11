//! Field - a typed column of a table.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::common::{Error, Result};
use crate::schema::props::{DefaultValue, FieldProps, IndexLevel, Relation};
use crate::schema::FieldDescriptor;
use crate::types::{validate_type, BuiltinType, FieldType, Value};

/// A validated value for a new row, or a counter draw still to be made.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value(Value),
    /// A fresh id from the table's tracker.
    TableId,
    /// The next value of the field's autoincrement counter.
    Increment,
}

/// A field of a table: name, resolved type and properties.
///
/// Carries its own counter for `default(autoincrement)`.
pub struct Field {
    name: String,
    field_type: FieldType,
    props: FieldProps,
    increment: AtomicI64,
}

impl Field {
    /// Resolve a field descriptor.
    ///
    /// # Errors
    /// `Error::SchemaParse` on the descriptor's line for an unknown type,
    /// an invalid property or a broken field rule.
    pub fn from_descriptor(desc: &FieldDescriptor) -> Result<Self> {
        let builtin: BuiltinType = desc
            .type_name
            .parse()
            .map_err(|reason| Error::parse(desc.line, reason))?;
        let props = FieldProps::parse(&desc.name, builtin, &desc.props)
            .map_err(|reason| Error::parse(desc.line, reason))?;
        let field_type = props.field_type(builtin).ok_or_else(|| {
            Error::parse(desc.line, format!("field({} {}) must have vector prop", desc.name, builtin))
        })?;

        Ok(Self::new(desc.name.clone(), field_type, props))
    }

    pub fn new(name: impl Into<String>, field_type: FieldType, props: FieldProps) -> Self {
        Self {
            name: name.into(),
            field_type,
            props,
            increment: AtomicI64::new(0),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    #[inline]
    pub fn props(&self) -> &FieldProps {
        &self.props
    }

    #[inline]
    pub fn index_level(&self) -> IndexLevel {
        self.props.index_level()
    }

    #[inline]
    pub fn is_primary_key(&self) -> bool {
        self.props.primary
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.props.optional
    }

    pub fn relation(&self) -> Option<&Relation> {
        self.props.relation.as_ref()
    }

    /// Validate input without defaults.
    ///
    /// Present input is coerced by [`validate_type`]; absent (`Null`) input
    /// is only accepted for an optional field.
    ///
    /// # Errors
    /// `Error::InvalidFieldType` if the value cannot be coerced or is
    /// absent on a required field.
    pub fn validate(&self, input: &Value) -> Result<Value> {
        if !input.is_null() {
            return validate_type(&self.name, &self.field_type, input);
        }
        self.absent()
    }

    /// Validate input for a new row, applying defaults when it is absent.
    ///
    /// Absent input resolves, in order, to: the default, a fresh id for a
    /// primary key, `Null` for an optional field, or an error. Defaults
    /// backed by a counter come back pending and draw nothing.
    ///
    /// # Errors
    /// The errors of [`validate`](Field::validate).
    pub fn resolve(&self, input: &Value) -> Result<Resolved> {
        if !input.is_null() {
            return validate_type(&self.name, &self.field_type, input).map(Resolved::Value);
        }

        match &self.props.default {
            Some(DefaultValue::Literal(value)) => return Ok(Resolved::Value(value.clone())),
            Some(DefaultValue::Auto) => return Ok(Resolved::TableId),
            Some(DefaultValue::AutoIncrement) => return Ok(Resolved::Increment),
            Some(DefaultValue::Now) => return Ok(Resolved::Value(Value::Date(Utc::now()))),
            None => {}
        }
        if self.is_primary_key() {
            return Ok(Resolved::TableId);
        }
        self.absent().map(Resolved::Value)
    }

    fn absent(&self) -> Result<Value> {
        if self.is_optional() {
            Ok(Value::Null)
        } else {
            Err(Error::invalid_type(&self.name, "null"))
        }
    }

    /// Move the counter to `value` unless it is already past it.
    pub fn observe(&self, value: i64) {
        self.increment.fetch_max(value, Ordering::SeqCst);
    }

    /// The last autoincrement value drawn or observed.
    pub fn increment_state(&self) -> i64 {
        self.increment.load(Ordering::SeqCst)
    }
}

/// Equality is structural: the counter does not take part.
impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.field_type == other.field_type && self.props == other.props
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("props", &self.props)
            .finish()
    }
}
