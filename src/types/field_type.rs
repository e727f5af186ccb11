//! Declared field types.

use std::fmt;
use std::str::FromStr;

/// A type name as it appears in a field descriptor.
///
/// `Vector` here is only the marker; its element type and level come from
/// the field's `vector(type, level)` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Int,
    Float,
    String,
    Bool,
    Date,
    Bytes,
    Vector,
}

impl BuiltinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinType::Int => "Int",
            BuiltinType::Float => "Float",
            BuiltinType::String => "String",
            BuiltinType::Bool => "Bool",
            BuiltinType::Date => "Date",
            BuiltinType::Bytes => "Bytes",
            BuiltinType::Vector => "Vector",
        }
    }
}

impl FromStr for BuiltinType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Int" => Ok(BuiltinType::Int),
            "Float" => Ok(BuiltinType::Float),
            "String" => Ok(BuiltinType::String),
            "Bool" => Ok(BuiltinType::Bool),
            "Date" => Ok(BuiltinType::Date),
            "Bytes" => Ok(BuiltinType::Bytes),
            "Vector" => Ok(BuiltinType::Vector),
            other => Err(format!("{} is not a valid type", other)),
        }
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved type of a field.
///
/// A vector's `element` is never itself a `Vector`; nesting is expressed by
/// `level` (a `Vector(Int, 2)` holds vectors of ints).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Float,
    String,
    Bool,
    Date,
    Bytes,
    Vector { element: Box<FieldType>, level: usize },
}

impl FieldType {
    /// Resolve a scalar builtin. Returns `None` for `Vector`, which needs its
    /// element type and level.
    pub fn scalar(builtin: BuiltinType) -> Option<FieldType> {
        Some(match builtin {
            BuiltinType::Int => FieldType::Int,
            BuiltinType::Float => FieldType::Float,
            BuiltinType::String => FieldType::String,
            BuiltinType::Bool => FieldType::Bool,
            BuiltinType::Date => FieldType::Date,
            BuiltinType::Bytes => FieldType::Bytes,
            BuiltinType::Vector => return None,
        })
    }

    /// Build `Vector(element, level)`.
    pub fn vector(element: FieldType, level: usize) -> FieldType {
        debug_assert!(level >= 1);
        debug_assert!(!element.is_vector());
        FieldType::Vector {
            element: Box::new(element),
            level,
        }
    }

    #[inline]
    pub fn is_vector(&self) -> bool {
        matches!(self, FieldType::Vector { .. })
    }

    /// Nesting depth; 0 for scalars.
    pub fn level(&self) -> usize {
        match self {
            FieldType::Vector { level, .. } => *level,
            _ => 0,
        }
    }

    /// Type of the items of a vector: the scalar element at level 1, or
    /// the vector one level shallower.
    pub fn item_type(&self) -> Option<FieldType> {
        match self {
            FieldType::Vector { element, level } if *level > 1 => {
                Some(FieldType::vector((**element).clone(), level - 1))
            }
            FieldType::Vector { element, .. } => Some((**element).clone()),
            _ => None,
        }
    }

    /// The innermost scalar type.
    pub fn base(&self) -> &FieldType {
        match self {
            FieldType::Vector { element, .. } => element,
            other => other,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::String => write!(f, "String"),
            FieldType::Bool => write!(f, "Bool"),
            FieldType::Date => write!(f, "Date"),
            FieldType::Bytes => write!(f, "Bytes"),
            FieldType::Vector { element, level } => write!(f, "Vector({}, {})", element, level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_parse() {
        assert_eq!("Int".parse::<BuiltinType>(), Ok(BuiltinType::Int));
        assert_eq!("Vector".parse::<BuiltinType>(), Ok(BuiltinType::Vector));
        assert_eq!(
            "Integer".parse::<BuiltinType>(),
            Err("Integer is not a valid type".to_string())
        );
    }

    #[test]
    fn test_item_type() {
        let nested = FieldType::vector(FieldType::Int, 2);
        assert_eq!(nested.item_type(), Some(FieldType::vector(FieldType::Int, 1)));
        assert_eq!(
            FieldType::vector(FieldType::Int, 1).item_type(),
            Some(FieldType::Int)
        );
        assert_eq!(FieldType::Int.item_type(), None);
        assert_eq!(nested.base(), &FieldType::Int);
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldType::vector(FieldType::String, 3).to_string(), "Vector(String, 3)");
        assert_eq!(FieldType::Date.to_string(), "Date");
    }
}
