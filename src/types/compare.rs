//! Comparison operators and ordering for `where` constraints.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::types::{validate_type, FieldType, Value};

/// Operators accepted on `Int` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl FromStr for IntOp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(IntOp::Eq),
            "ne" => Ok(IntOp::Ne),
            "gt" => Ok(IntOp::Gt),
            "lt" => Ok(IntOp::Lt),
            "gte" => Ok(IntOp::Gte),
            "lte" => Ok(IntOp::Lte),
            _ => Err(()),
        }
    }
}

impl IntOp {
    fn holds(self, stored: i64, operand: i64) -> bool {
        match self {
            IntOp::Eq => stored == operand,
            IntOp::Ne => stored != operand,
            IntOp::Gt => stored > operand,
            IntOp::Lt => stored < operand,
            IntOp::Gte => stored >= operand,
            IntOp::Lte => stored <= operand,
        }
    }
}

/// Operators accepted on `String` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrOp {
    Contains,
    StartsWith,
    EndsWith,
}

impl FromStr for StrOp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contains" => Ok(StrOp::Contains),
            "startsWith" => Ok(StrOp::StartsWith),
            "endsWith" => Ok(StrOp::EndsWith),
            _ => Err(()),
        }
    }
}

impl StrOp {
    fn holds(self, stored: &str, operand: &str) -> bool {
        match self {
            StrOp::Contains => stored.contains(operand),
            StrOp::StartsWith => stored.starts_with(operand),
            StrOp::EndsWith => stored.ends_with(operand),
        }
    }
}

/// One field's constraint from a `where` clause.
///
/// A JSON object is an operator set; anything else is a literal. Every
/// operator in a set must hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Literal(Value),
    Int(Vec<(IntOp, Value)>),
    Str(Vec<(StrOp, Value)>),
    /// Empty operator set, unknown operator, or operators on a type that
    /// has none. Never matches.
    Never,
}

impl Constraint {
    /// Interpret `json` as a constraint on a field of type `ty`.
    pub fn from_json(ty: &FieldType, json: &serde_json::Value) -> Constraint {
        let ops = match json {
            serde_json::Value::Object(ops) => ops,
            other => {
                return Value::from_json(other)
                    .map(Constraint::Literal)
                    .unwrap_or(Constraint::Never)
            }
        };
        if ops.is_empty() {
            return Constraint::Never;
        }

        match ty {
            FieldType::Int => ops
                .iter()
                .map(|(name, operand)| Some((name.parse().ok()?, Value::from_json(operand)?)))
                .collect::<Option<Vec<_>>>()
                .map(Constraint::Int)
                .unwrap_or(Constraint::Never),
            FieldType::String => ops
                .iter()
                .map(|(name, operand)| Some((name.parse().ok()?, Value::from_json(operand)?)))
                .collect::<Option<Vec<_>>>()
                .map(Constraint::Str)
                .unwrap_or(Constraint::Never),
            _ => Constraint::Never,
        }
    }

    /// The literal value, if this constraint is a plain equality.
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Constraint::Literal(v) => Some(v),
            _ => None,
        }
    }
}

/// Whether a stored value satisfies `constraint` for a field of type `ty`.
///
/// Both sides are normalized through [`validate_type`] first, so a float
/// epoch and an int epoch of the same instant compare equal. Vectors match
/// a like-shaped vector pointwise.
pub fn compare(ty: &FieldType, stored: &Value, constraint: &Constraint) -> bool {
    if stored.is_null() {
        return matches!(constraint, Constraint::Literal(Value::Null));
    }
    let Ok(stored) = validate_type("", ty, stored) else {
        return false;
    };

    match constraint {
        Constraint::Never => false,
        Constraint::Literal(query) => compare_literal(ty, &stored, query),
        Constraint::Int(ops) => {
            let Value::Int(stored) = stored else {
                return false;
            };
            ops.iter().all(|(op, operand)| {
                match validate_type("", &FieldType::Int, operand) {
                    Ok(Value::Int(operand)) => op.holds(stored, operand),
                    _ => false,
                }
            })
        }
        Constraint::Str(ops) => {
            let Value::Str(stored) = stored else {
                return false;
            };
            ops.iter().all(|(op, operand)| match operand {
                Value::Str(operand) => op.holds(&stored, operand),
                _ => false,
            })
        }
    }
}

fn compare_literal(ty: &FieldType, stored: &Value, query: &Value) -> bool {
    match (ty.item_type(), stored, query) {
        (Some(item_type), Value::Vector(stored), Value::Vector(query)) => {
            stored.len() == query.len()
                && stored
                    .iter()
                    .zip(query)
                    .all(|(s, q)| compare(&item_type, s, &Constraint::Literal(q.clone())))
        }
        (Some(_), _, _) => false,
        (None, stored, query) => match validate_type("", ty, query) {
            Ok(query) => *stored == query,
            Err(_) => false,
        },
    }
}

/// Total order used by `orderBy`. `Null` sorts first; vectors are unordered.
pub fn order(ty: &FieldType, a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => return Ordering::Equal,
        (Value::Null, _) => return Ordering::Less,
        (_, Value::Null) => return Ordering::Greater,
        _ => {}
    }
    if ty.is_vector() {
        return Ordering::Equal;
    }
    let (Ok(a), Ok(b)) = (validate_type("", ty, a), validate_type("", ty, b)) else {
        return Ordering::Equal;
    };

    match (&a, &b) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Date(a), Value::Date(b)) => a.cmp(b),
        (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}
