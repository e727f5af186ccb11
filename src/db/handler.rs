//! Dispatch of a [`Request`] to the query engine.

use serde_json::Value as Json;

use crate::common::{Error, Result};
use crate::db::{Action, Request, Response};
use crate::query::{self, FindArgs, QueryArg};
use crate::rows::Row;
use crate::schema::Schema;

/// Run `request` against `schema`.
///
/// The caller holds the schema lock matching [`Action::is_read_only`].
pub(crate) fn handle(schema: &Schema, request: &Request) -> Result<Response> {
    let table = schema
        .table(&request.table)
        .ok_or_else(|| Error::TableNotFound(request.table.clone()))?;
    let name = table.name();
    let where_ = request.where_.clone().unwrap_or_default();

    let response = match request.action {
        Action::Create => {
            let row = query::create(schema, name, &object(request.data.as_ref())?)?;
            Response::new(201, format!("Created new row in table {name}"), row.to_json())
        }
        Action::CreateMany => {
            let items = match &request.data {
                Some(Json::Array(items)) => items,
                _ => return Err(Error::BadRequest("createMany data must be an array".into())),
            };
            let mut rows = Vec::with_capacity(items.len());
            for item in items {
                rows.push(query::create(schema, name, &object(Some(item))?)?);
            }
            Response::new(
                201,
                format!("Created {} new rows in table {name}", rows.len()),
                rows_json(&rows),
            )
        }
        Action::FindUnique => {
            let row = query::find_unique(table, &where_)?.ok_or_else(|| Error::RowNotFound(name.to_string()))?;
            Response::new(200, format!("Found row in table {name}"), row.to_json())
        }
        Action::FindMany => {
            let args = FindArgs {
                where_,
                order_by: request.order_by.as_ref().map(|o| o.keys()).unwrap_or_default(),
                cursor: request.cursor.clone(),
                skip: request.skip.unwrap_or(0),
                take: request.take.unwrap_or(0),
            };
            let rows = query::find_with_args(table, &args, true)?;
            Response::new(
                200,
                format!("Found {} rows in table {name}", rows.len()),
                rows_json(&rows),
            )
        }
        Action::UpdateUnique => {
            let row = query::find_unique(table, &where_)?.ok_or_else(|| Error::RowNotFound(name.to_string()))?;
            let row = query::update(schema, name, &row, &object(request.data.as_ref())?)?;
            Response::new(200, format!("Updated row in table {name}"), row.to_json())
        }
        Action::UpdateMany => {
            let data = object(request.data.as_ref())?;
            let mut rows = query::find(table, &where_, false)?;
            for row in rows.iter_mut() {
                *row = query::update(schema, name, row, &data)?;
            }
            Response::new(
                200,
                format!("Updated {} rows in table {name}", rows.len()),
                rows_json(&rows),
            )
        }
        Action::DeleteUnique => {
            let row = query::find_unique(table, &where_)?.ok_or_else(|| Error::RowNotFound(name.to_string()))?;
            query::delete(table, &row)?;
            Response::new(200, format!("Deleted row in table {name}"), row.to_json())
        }
        Action::DeleteMany => {
            let rows = query::find(table, &where_, false)?;
            for row in &rows {
                query::delete(table, row)?;
            }
            Response::new(
                200,
                format!("Deleted {} rows in table {name}", rows.len()),
                rows_json(&rows),
            )
        }
    };
    Ok(response)
}

fn object(data: Option<&Json>) -> Result<QueryArg> {
    match data {
        None | Some(Json::Null) => Ok(QueryArg::new()),
        Some(Json::Object(map)) => Ok(map.clone()),
        Some(_) => Err(Error::BadRequest("data must be an object".into())),
    }
}

fn rows_json(rows: &[Row]) -> Json {
    Json::Array(rows.iter().map(Row::to_json).collect())
}
