//! Request and response envelopes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::Error;
use crate::query::{Order, QueryArg};

/// Row action carried by a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Create,
    CreateMany,
    FindUnique,
    FindMany,
    UpdateUnique,
    UpdateMany,
    DeleteUnique,
    DeleteMany,
}

impl Action {
    /// Read-only actions run under the schema's shared lock.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Action::FindUnique | Action::FindMany)
    }
}

/// `orderBy`: one object of `field: direction` pairs, or a list of them
/// when the order of the sort keys matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderBy {
    Fields(BTreeMap<String, Order>),
    List(Vec<BTreeMap<String, Order>>),
}

impl OrderBy {
    /// Sort keys in application order.
    pub fn keys(&self) -> Vec<(String, Order)> {
        let flatten = |map: &BTreeMap<String, Order>| {
            map.iter()
                .map(|(name, order)| (name.clone(), *order))
                .collect::<Vec<_>>()
        };
        match self {
            OrderBy::Fields(map) => flatten(map),
            OrderBy::List(maps) => maps.iter().flat_map(flatten).collect(),
        }
    }
}

/// A row request against one table of a database.
///
/// ```
/// use tabledb::{Action, Request};
///
/// let request: Request = serde_json::from_str(
///     r#"{"action": "findMany", "table": "users", "where": {"age": {"gt": 30}}, "take": 10}"#,
/// )
/// .unwrap();
/// assert_eq!(request.action, Action::FindMany);
/// assert_eq!(request.take, Some(10));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub action: Action,
    pub table: String,
    /// An object, or an array of objects for `createMany`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_: Option<QueryArg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<QueryArg>,
}

impl Request {
    pub fn new(action: Action, table: impl Into<String>) -> Self {
        Self {
            action,
            table: table.into(),
            data: None,
            where_: None,
            take: None,
            skip: None,
            order_by: None,
            cursor: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_where(mut self, where_: QueryArg) -> Self {
        self.where_ = Some(where_);
        self
    }
}

/// Outcome of a request: HTTP-style status, message and JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub message: String,
    pub data: serde_json::Value,
}

impl Response {
    pub fn new(status: u16, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            status,
            message: message.into(),
            data,
        }
    }

    /// Error response carrying the error's status and message.
    pub fn error(err: &Error) -> Self {
        Self::new(err.status(), err.to_string(), serde_json::Value::Null)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

impl From<Error> for Response {
    fn from(err: Error) -> Self {
        Response::error(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_names() {
        let actions: Vec<Action> = serde_json::from_value(json!([
            "create", "createMany", "findUnique", "findMany",
            "updateUnique", "updateMany", "deleteUnique", "deleteMany"
        ]))
        .unwrap();
        assert_eq!(actions.len(), 8);
        assert!(actions[2].is_read_only());
        assert!(actions[3].is_read_only());
        assert!(!actions[0].is_read_only());

        assert!(serde_json::from_value::<Action>(json!("dropTable")).is_err());
    }

    #[test]
    fn test_request_fields() {
        let request: Request = serde_json::from_value(json!({
            "action": "findMany",
            "table": "users",
            "where": {"name": "ann"},
            "orderBy": [{"age": "desc"}, {"name": "asc"}],
            "cursor": {"id": 3},
            "skip": 1
        }))
        .unwrap();
        assert_eq!(request.where_.as_ref().map(|w| w.len()), Some(1));
        assert_eq!(
            request.order_by.unwrap().keys(),
            vec![("age".to_string(), Order::Desc), ("name".to_string(), Order::Asc)]
        );
        assert_eq!(request.skip, Some(1));
        assert_eq!(request.take, None);
    }

    #[test]
    fn test_order_by_object() {
        let order_by: OrderBy = serde_json::from_value(json!({"age": "asc"})).unwrap();
        assert_eq!(order_by.keys(), vec![("age".to_string(), Order::Asc)]);
    }

    #[test]
    fn test_error_response() {
        let response = Response::from(Error::UniqueConflict { field: "b".into() });
        assert_eq!(response.status, 409);
        assert_eq!(response.message, "Value for unique field b already exists");
        assert!(response.is_error());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": 409, "message": "Value for unique field b already exists", "data": null})
        );
    }
}
