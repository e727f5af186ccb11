//! Lookups: `find_unique`, `find` and the paginated `find_with_args`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::query::{lookup, matches_all, parse_constraints, QueryArg};
use crate::rows::Row;
use crate::schema::{Field, Table};
use crate::types::{compare, order, Constraint};

/// Sort direction of an `orderBy` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

/// Arguments of a paginated find.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindArgs {
    pub where_: QueryArg,
    /// Sort keys, applied in order.
    pub order_by: Vec<(String, Order)>,
    /// Start at the first row matching this constraint set.
    pub cursor: Option<QueryArg>,
    pub skip: usize,
    /// Maximum rows to return; `0` means no limit.
    pub take: usize,
}

/// Find the single row selected by an indexed field of `where_`.
///
/// The first of the table's indexes (primary key first) named in `where_`
/// selects the candidate, which must carry a plain value. The candidate is
/// returned only if it also satisfies every other constraint.
///
/// # Errors
/// - `Error::MissingWhereConstraint` for an empty `where_`
/// - `Error::TableHasNoUniqueFields` if the table has no index at all
/// - `Error::NoUniqueFieldInWhere` if no indexed field is constrained
/// - `Error::BadRequest` for an operator set on the selecting field
pub fn find_unique(table: &Table, where_: &QueryArg) -> Result<Option<Row>> {
    if where_.is_empty() {
        return Err(Error::MissingWhereConstraint);
    }
    let constraints = parse_constraints(table, where_)?;

    let selector = table
        .indexes()
        .iter()
        .find_map(|name| constraints.iter().find(|(field, _)| field.name() == name.as_str()));
    let Some((field, constraint)) = selector else {
        return Err(if table.indexes().is_empty() {
            Error::TableHasNoUniqueFields
        } else {
            Error::NoUniqueFieldInWhere
        });
    };
    let Some(value) = constraint.as_literal() else {
        return Err(Error::BadRequest(format!(
            "findUnique needs a plain value for unique field {}",
            field.name()
        )));
    };

    let row = lookup(table, field, value)?;
    Ok(row.filter(|row| matches_all(row, &constraints)))
}

/// Find every row satisfying all constraints of `where_`.
///
/// A plain value on an indexed field is resolved through the index; the
/// remaining constraints filter that candidate set. Without an indexed
/// literal the table is scanned in key order.
///
/// An empty `where_` returns every row when `allow_empty`, otherwise it is
/// an error.
pub fn find(table: &Table, where_: &QueryArg, allow_empty: bool) -> Result<Vec<Row>> {
    if where_.is_empty() {
        return if allow_empty {
            table.rows().scan()
        } else {
            Err(Error::MissingWhereConstraint)
        };
    }

    let mut constraints = parse_constraints(table, where_)?;
    // indexed literals first so they seed the candidate set
    constraints.sort_by_key(|(field, constraint)| !is_indexed_literal(table, field, constraint));

    let mut candidates: Option<Vec<Row>> = None;
    for (field, constraint) in &constraints {
        candidates = Some(match candidates {
            Some(rows) => rows
                .into_iter()
                .filter(|row| compare(field.field_type(), row.get(field.name()), constraint))
                .collect(),
            None => seed(table, field, constraint)?,
        });
    }
    Ok(candidates.unwrap_or_default())
}

/// [`find`], then sort, cursor, skip and take.
pub fn find_with_args(table: &Table, args: &FindArgs, allow_empty: bool) -> Result<Vec<Row>> {
    let mut rows = find(table, &args.where_, allow_empty)?;

    let mut keys: Vec<(&Field, Order)> = Vec::with_capacity(args.order_by.len());
    for (name, direction) in &args.order_by {
        let field = table.field(name).ok_or_else(|| {
            Error::BadRequest(format!("Field {} does not exist in table {}", name, table.name()))
        })?;
        keys.push((field, *direction));
    }
    if !keys.is_empty() {
        rows.sort_by(|a, b| {
            keys.iter()
                .map(|(field, direction)| {
                    let ord = order(field.field_type(), a.get(field.name()), b.get(field.name()));
                    match direction {
                        Order::Asc => ord,
                        Order::Desc => ord.reverse(),
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    if let Some(cursor) = &args.cursor {
        let constraints = parse_constraints(table, cursor)?;
        if let Some(start) = rows.iter().position(|row| matches_all(row, &constraints)) {
            rows.drain(..start);
        }
    }

    if args.skip >= rows.len() {
        rows.clear();
    } else {
        rows.drain(..args.skip);
    }
    if args.take > 0 {
        rows.truncate(args.take);
    }
    Ok(rows)
}

fn is_indexed_literal(table: &Table, field: &Field, constraint: &Constraint) -> bool {
    table.indexes().iter().any(|name| name == field.name())
        && constraint.as_literal().is_some_and(|value| !value.is_null())
}

fn seed(table: &Table, field: &Field, constraint: &Constraint) -> Result<Vec<Row>> {
    if is_indexed_literal(table, field, constraint) {
        if let Some(value) = constraint.as_literal() {
            return Ok(lookup(table, field, value)?.into_iter().collect());
        }
    }
    Ok(table
        .rows()
        .scan()?
        .into_iter()
        .filter(|row| compare(field.field_type(), row.get(field.name()), constraint))
        .collect())
}
