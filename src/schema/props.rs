//! Field properties: parsing and field-local rules.

use crate::schema::PropDescriptor;
use crate::types::{parse_bool, BuiltinType, FieldType, Value};

/// How a field participates in indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexLevel {
    None,
    Unique,
    Primary,
}

/// A field's default, resolved against its type.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// `default(auto)` on an `Int`: a fresh id from the table's tracker.
    Auto,
    /// `default(autoincrement)` on an `Int`: the field's own counter.
    AutoIncrement,
    /// `default(now)` on a `Date`.
    Now,
    Literal(Value),
}

/// Target of a `relation(table.field)` property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub table: String,
    pub field: String,
}

/// The typed property set of one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldProps {
    pub optional: bool,
    pub unique: bool,
    pub primary: bool,
    pub default: Option<DefaultValue>,
    pub relation: Option<Relation>,
    /// `vector(type, level)`: element type and nesting level.
    pub vector: Option<(BuiltinType, usize)>,
}

impl FieldProps {
    /// Parse the raw properties of field `name` declared as `builtin`,
    /// enforcing the field-local rules.
    ///
    /// Errors are reasons; the caller attaches the line.
    pub fn parse(name: &str, builtin: BuiltinType, raw: &[PropDescriptor]) -> Result<Self, String> {
        let mut props = FieldProps::default();
        let mut raw_default: Option<&str> = None;
        let mut seen: Vec<&str> = Vec::with_capacity(raw.len());

        for prop in raw {
            let value = prop.value.trim();
            if seen.contains(&prop.name.as_str()) {
                return Err(format!("Duplicate prop {} on field {}", prop.name, name));
            }
            seen.push(&prop.name);

            match prop.name.as_str() {
                "optional" => props.optional = parse_flag(&prop.name, value)?,
                "unique" => props.unique = parse_flag(&prop.name, value)?,
                "key" => {
                    if value != "primary" {
                        return Err(format!("key({}) is not a valid prop", value));
                    }
                    props.primary = true;
                }
                "default" => raw_default = Some(value),
                "relation" => props.relation = Some(parse_relation(value)?),
                "vector" => props.vector = Some(parse_vector(value)?),
                other => return Err(format!("{} is not a valid prop", other)),
            }
        }

        check_field_rules(name, builtin, &props, raw_default.is_some())?;

        if let Some(raw) = raw_default {
            props.default = Some(resolve_default(builtin, raw)?);
        }
        Ok(props)
    }

    pub fn index_level(&self) -> IndexLevel {
        if self.primary {
            IndexLevel::Primary
        } else if self.unique {
            IndexLevel::Unique
        } else {
            IndexLevel::None
        }
    }

    /// The resolved field type for a field declared as `builtin`.
    ///
    /// Only meaningful once the rules have passed.
    pub(crate) fn field_type(&self, builtin: BuiltinType) -> Option<FieldType> {
        match (builtin, self.vector) {
            (BuiltinType::Vector, Some((element, level))) => {
                Some(FieldType::vector(FieldType::scalar(element)?, level))
            }
            (BuiltinType::Vector, None) => None,
            (scalar, _) => FieldType::scalar(scalar),
        }
    }
}

/// Parse `table.field`.
pub fn parse_relation(value: &str) -> Result<Relation, String> {
    let invalid = || format!("Invalid syntax: relation({})", value);

    let mut parts = value.split('.');
    let (Some(table), Some(field), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let (table, field) = (table.trim(), field.trim());
    if table.is_empty() || field.is_empty() {
        return Err(invalid());
    }
    Ok(Relation {
        table: table.to_string(),
        field: field.to_string(),
    })
}

/// Parse `type` or `type, level`; the level defaults to 1.
pub fn parse_vector(value: &str) -> Result<(BuiltinType, usize), String> {
    let parts: Vec<&str> = value.split(',').collect();
    if parts.len() > 2 {
        return Err(format!("Invalid syntax: vector({})", value));
    }

    let element: BuiltinType = parts[0]
        .trim()
        .parse()
        .map_err(|reason| format!("vector({}) is not a valid prop; {}", value, reason))?;

    let Some(level) = parts.get(1) else {
        return Ok((element, 1));
    };
    let level: i64 = level
        .trim()
        .parse()
        .map_err(|e| format!("vector({}) is not a valid prop; {}", value, e))?;
    if level < 1 {
        return Err(format!("vector({}) is not a valid prop; level must be >= 1", value));
    }
    Ok((element, level as usize))
}

fn parse_flag(prop: &str, value: &str) -> Result<bool, String> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format!("{}({}) is not a valid prop; expected true or false", prop, value)),
    }
}

fn check_field_rules(
    name: &str,
    builtin: BuiltinType,
    props: &FieldProps,
    has_default: bool,
) -> Result<(), String> {
    if props.primary {
        if builtin != BuiltinType::Int {
            return Err(format!("field({} {} key(primary)) must be type Int", name, builtin));
        }
        if props.optional {
            return Err(format!("field({} {} key(primary)) cannot be optional", name, builtin));
        }
    }

    if matches!(builtin, BuiltinType::Vector | BuiltinType::Bytes) && has_default {
        return Err(format!("field({} {}) cannot have default prop", name, builtin));
    }

    if builtin == BuiltinType::Vector {
        if props.unique {
            return Err(format!("field({} {}) cannot have unique prop", name, builtin));
        }
        match props.vector {
            None => return Err(format!("field({} {}) must have vector prop", name, builtin)),
            Some((BuiltinType::Vector, _)) => return Err("vector(Vector) is not allowed".to_string()),
            Some(_) => {}
        }
    } else if props.vector.is_some() {
        return Err(format!("field({} {}) cannot have vector prop", name, builtin));
    }

    Ok(())
}

fn resolve_default(builtin: BuiltinType, raw: &str) -> Result<DefaultValue, String> {
    let invalid = || format!("default({}) is not a valid default for type {}", raw, builtin);

    match builtin {
        BuiltinType::Int => match raw {
            "auto" => Ok(DefaultValue::Auto),
            "autoincrement" => Ok(DefaultValue::AutoIncrement),
            _ => raw
                .parse::<i64>()
                .map(|v| DefaultValue::Literal(Value::Int(v)))
                .map_err(|_| invalid()),
        },
        BuiltinType::Float => raw
            .parse::<f64>()
            .map(|v| DefaultValue::Literal(Value::Float(v)))
            .map_err(|_| invalid()),
        BuiltinType::String => Ok(DefaultValue::Literal(Value::Str(strip_quotes(raw).to_string()))),
        BuiltinType::Bool => parse_bool(raw)
            .map(|v| DefaultValue::Literal(Value::Bool(v)))
            .ok_or_else(invalid),
        BuiltinType::Date if raw == "now" => Ok(DefaultValue::Now),
        _ => Err(invalid()),
    }
}

fn strip_quotes(raw: &str) -> &str {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> Vec<PropDescriptor> {
        pairs
            .iter()
            .map(|(name, value)| PropDescriptor {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_parse_relation() {
        assert_eq!(
            parse_relation("users.id"),
            Ok(Relation {
                table: "users".into(),
                field: "id".into()
            })
        );
        assert_eq!(parse_relation(" users . id ").unwrap().field, "id");
        assert_eq!(parse_relation("users"), Err("Invalid syntax: relation(users)".into()));
        assert!(parse_relation("a.b.c").is_err());
        assert!(parse_relation(".id").is_err());
    }

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("Int"), Ok((BuiltinType::Int, 1)));
        assert_eq!(parse_vector("String, 3"), Ok((BuiltinType::String, 3)));
        assert_eq!(
            parse_vector("Number"),
            Err("vector(Number) is not a valid prop; Number is not a valid type".into())
        );
        assert_eq!(
            parse_vector("Int, 0"),
            Err("vector(Int, 0) is not a valid prop; level must be >= 1".into())
        );
        assert!(parse_vector("Int, 1, 2").is_err());
        assert!(parse_vector("Int, x").is_err());
    }

    #[test]
    fn test_primary_key_rules() {
        let p = FieldProps::parse("id", BuiltinType::Int, &props(&[("key", "primary")])).unwrap();
        assert_eq!(p.index_level(), IndexLevel::Primary);

        assert_eq!(
            FieldProps::parse("id", BuiltinType::String, &props(&[("key", "primary")])),
            Err("field(id String key(primary)) must be type Int".into())
        );
        assert!(FieldProps::parse(
            "id",
            BuiltinType::Int,
            &props(&[("key", "primary"), ("optional", "true")])
        )
        .is_err());
        assert!(FieldProps::parse("id", BuiltinType::Int, &props(&[("key", "foreign")])).is_err());
    }

    #[test]
    fn test_vector_rules() {
        let ok = FieldProps::parse("v", BuiltinType::Vector, &props(&[("vector", "Int, 2")])).unwrap();
        assert_eq!(ok.field_type(BuiltinType::Vector), Some(FieldType::vector(FieldType::Int, 2)));

        for (builtin, raw) in [
            (BuiltinType::Vector, vec![]),
            (BuiltinType::Vector, vec![("vector", "Vector")]),
            (BuiltinType::Vector, vec![("vector", "Int"), ("unique", "true")]),
            (BuiltinType::Vector, vec![("vector", "Int"), ("default", "1")]),
            (BuiltinType::Bytes, vec![("default", "x")]),
            (BuiltinType::Int, vec![("vector", "Int")]),
        ] {
            assert!(FieldProps::parse("v", builtin, &props(&raw)).is_err(), "{:?}", raw);
        }
    }

    #[test]
    fn test_defaults() {
        let parse = |builtin, raw: &str| {
            FieldProps::parse("f", builtin, &props(&[("default", raw)])).map(|p| p.default)
        };

        assert_eq!(parse(BuiltinType::Int, "auto"), Ok(Some(DefaultValue::Auto)));
        assert_eq!(parse(BuiltinType::Int, "autoincrement"), Ok(Some(DefaultValue::AutoIncrement)));
        assert_eq!(parse(BuiltinType::Int, "7"), Ok(Some(DefaultValue::Literal(Value::Int(7)))));
        assert!(parse(BuiltinType::Int, "seven").is_err());
        assert_eq!(
            parse(BuiltinType::String, "\"hi there\""),
            Ok(Some(DefaultValue::Literal(Value::Str("hi there".into()))))
        );
        assert_eq!(
            parse(BuiltinType::String, "'x'"),
            Ok(Some(DefaultValue::Literal(Value::Str("x".into()))))
        );
        assert_eq!(parse(BuiltinType::Date, "now"), Ok(Some(DefaultValue::Now)));
        assert!(parse(BuiltinType::Date, "yesterday").is_err());
        assert_eq!(
            parse(BuiltinType::Bool, "true"),
            Ok(Some(DefaultValue::Literal(Value::Bool(true))))
        );
        assert_eq!(
            parse(BuiltinType::Float, "1.5"),
            Ok(Some(DefaultValue::Literal(Value::Float(1.5))))
        );
    }

    #[test]
    fn test_unknown_and_duplicate_props() {
        assert_eq!(
            FieldProps::parse("f", BuiltinType::Int, &props(&[("indexed", "true")])),
            Err("indexed is not a valid prop".into())
        );
        assert!(FieldProps::parse(
            "f",
            BuiltinType::Int,
            &props(&[("optional", "true"), ("optional", "false")])
        )
        .is_err());
        assert!(FieldProps::parse("f", BuiltinType::Int, &props(&[("optional", "maybe")])).is_err());
    }
}
