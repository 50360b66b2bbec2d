//! Client-side request builder: the encoder matched by the server-side parsers.
//!
//! `QueryRequest::from_params` and `MutationRequest::from_parts` accept exactly
//! what this module produces.

use crate::codec::{decode_body, TypedValue};
use crate::error::AppError;
use crate::request::{MutationRequest, QueryRequest};
use serde_json::Value;

/// A write ready to send: always POST.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedMutation {
    pub url: String,
    /// JSON body; `None` for delete.
    pub body: Option<String>,
}

impl PreparedMutation {
    pub fn method(&self) -> &'static str {
        "POST"
    }
}

#[derive(Clone, Debug)]
pub struct RequestBuilder {
    path: String,
}

impl RequestBuilder {
    /// `path` is the endpoint both routes live on, e.g. `/api/db`.
    pub fn new(path: impl Into<String>) -> Self {
        RequestBuilder { path: path.into() }
    }

    /// Encoded `select`, `from`, `where`, `order`, `limit`, `offset`, in that order.
    pub fn query_string(&self, req: &QueryRequest) -> String {
        encode_pairs(&query_pairs(req))
    }

    pub fn query_url(&self, req: &QueryRequest) -> String {
        format!("{}?{}", self.path, self.query_string(req))
    }

    /// Update and delete put their filter on the query string; the body carries the record.
    pub fn mutation(&self, req: &MutationRequest) -> PreparedMutation {
        let mut pairs = vec![
            ("action", req.action().as_str().to_string()),
            ("table", req.table().to_string()),
        ];
        let body = match req {
            MutationRequest::Insert { record, .. } => Some(Value::Object(record.clone()).to_string()),
            MutationRequest::Update { filter, changes, .. } => {
                if let Some(f) = filter {
                    pairs.push(("where", f.to_json().to_string()));
                }
                Some(Value::Object(changes.clone()).to_string())
            }
            MutationRequest::Delete { filter, .. } => {
                if let Some(f) = filter {
                    pairs.push(("where", f.to_json().to_string()));
                }
                None
            }
        };
        PreparedMutation {
            url: format!("{}?{}", self.path, encode_pairs(&pairs)),
            body,
        }
    }

    /// Stable cache key for a read: `["db", table, query string]`.
    pub fn query_key(&self, req: &QueryRequest) -> Vec<String> {
        vec!["db".to_string(), req.table.clone(), self.query_string(req)]
    }

    /// Decode a read response body into typed rows.
    pub fn decode_rows(&self, body: &str) -> Result<Vec<TypedValue>, AppError> {
        match decode_body(body) {
            Ok(TypedValue::List(rows)) => Ok(rows),
            Ok(_) => Err(AppError::validation("response body is not a JSON array")),
            Err(e) => Err(AppError::validation(format!("invalid response body: {}", e))),
        }
    }
}

fn query_pairs(req: &QueryRequest) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("select", req.projection.to_param()),
        ("from", req.table.clone()),
    ];
    if let Some(f) = req.filter.as_ref().filter(|f| !f.is_empty()) {
        pairs.push(("where", f.to_json().to_string()));
    }
    if !req.order.is_empty() {
        pairs.push(("order", req.order.to_json().to_string()));
    }
    if let Some(n) = req.limit {
        pairs.push(("limit", n.to_string()));
    }
    if let Some(n) = req.offset {
        pairs.push(("offset", n.to_string()));
    }
    pairs
}

fn encode_pairs(pairs: &[(&str, String)]) -> String {
    // serializing a slice of string pairs cannot fail
    serde_urlencoded::to_string(pairs).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterNode, Operator};
    use crate::request::{Direction, Projection};
    use std::collections::HashMap;

    fn parse_query(url: &str) -> HashMap<String, String> {
        let (_, qs) = url.split_once('?').unwrap();
        serde_urlencoded::from_str(qs).unwrap()
    }

    #[test]
    fn query_url_shape() {
        let b = RequestBuilder::new("/api/db");
        let req = QueryRequest::new("posts", Projection::new(["id", "title"]))
            .filter(FilterNode::new().field("title", Operator::Like, "%test%"))
            .order_by("title", Direction::Asc)
            .limit(2);
        let url = b.query_url(&req);
        assert!(url.starts_with("/api/db?select=id%2Ctitle&from=posts&where="));
        let params = parse_query(&url);
        assert_eq!(params["where"], r#"{"title":{"like":"%test%"}}"#);
        assert_eq!(params["order"], r#"{"title":"asc"}"#);
        assert_eq!(params["limit"], "2");
        assert!(!params.contains_key("offset"));
    }

    #[test]
    fn query_key_is_stable() {
        let b = RequestBuilder::new("/api/db");
        let req = QueryRequest::new("posts", Projection::new(["id"])).offset(5);
        assert_eq!(b.query_key(&req), b.query_key(&req.clone()));
        assert_eq!(b.query_key(&req)[..2], ["db".to_string(), "posts".to_string()]);
    }

    #[test]
    fn delete_has_no_body() {
        let b = RequestBuilder::new("/api/db");
        let prepared = b.mutation(&MutationRequest::Delete {
            table: "posts".into(),
            filter: Some(FilterNode::new().field("id", Operator::Eq, "1")),
        });
        assert_eq!(prepared.method(), "POST");
        assert!(prepared.body.is_none());
        let params = parse_query(&prepared.url);
        assert_eq!(params["action"], "delete");
        assert_eq!(params["where"], r#"{"id":{"eq":"1"}}"#);
    }

    #[test]
    fn decode_rows_types_wire_values() {
        let b = RequestBuilder::new("/api/db");
        let rows = b.decode_rows(r#"[{"id":"1","title":"test A","published":true}]"#).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&TypedValue::Integer(1)));
        assert_eq!(rows[0].get("published"), Some(&TypedValue::Bool(true)));
        assert!(b.decode_rows(r#"{"id":1}"#).is_err());
    }
}
