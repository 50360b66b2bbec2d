//! Write requests: tagged insert/update/delete and their query-string + body parsing.

use crate::error::AppError;
use crate::filter::FilterNode;
use crate::store::Row;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Insert,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Action::Insert),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(AppError::validation(format!(
                "unrecognized action '{}' (expected insert, update or delete)",
                other
            ))),
        }
    }
}

/// `filter` stays optional so an absent filter reaches the dispatcher and is
/// rejected there with `MissingFilter`.
#[derive(Clone, Debug, PartialEq)]
pub enum MutationRequest {
    Insert { table: String, record: Row },
    Update { table: String, filter: Option<FilterNode>, changes: Row },
    Delete { table: String, filter: Option<FilterNode> },
}

impl MutationRequest {
    pub fn action(&self) -> Action {
        match self {
            MutationRequest::Insert { .. } => Action::Insert,
            MutationRequest::Update { .. } => Action::Update,
            MutationRequest::Delete { .. } => Action::Delete,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            MutationRequest::Insert { table, .. }
            | MutationRequest::Update { table, .. }
            | MutationRequest::Delete { table, .. } => table,
        }
    }

    /// Parse `action`, `table`, optional `where` from the query string and the raw body.
    pub fn from_parts(params: &HashMap<String, String>, body: &[u8]) -> Result<Self, AppError> {
        let action: Action = non_empty(params, "action")
            .ok_or_else(|| AppError::validation("missing required parameter 'action'"))?
            .parse()?;
        let table = non_empty(params, "table")
            .ok_or_else(|| AppError::validation("missing required parameter 'table'"))?
            .to_string();
        let query_filter = non_empty(params, "where").map(FilterNode::parse).transpose()?;
        let body = parse_body(body)?;

        Ok(match action {
            Action::Insert => MutationRequest::Insert {
                table,
                record: into_record(body, "insert")?,
            },
            Action::Update => match (query_filter, body) {
                (None, Some(Value::Object(mut obj))) if is_envelope(&obj) => {
                    let filter = obj.remove("where").map(|w| FilterNode::from_json(&w)).transpose()?;
                    let changes = into_record(obj.remove("data"), "update")?;
                    MutationRequest::Update { table, filter, changes }
                }
                (filter, body) => MutationRequest::Update {
                    table,
                    filter,
                    changes: into_record(body, "update")?,
                },
            },
            Action::Delete => {
                let filter = match (query_filter, body) {
                    (Some(f), _) => Some(f),
                    (None, Some(Value::Object(mut obj))) => {
                        obj.remove("where").map(|w| FilterNode::from_json(&w)).transpose()?
                    }
                    (None, _) => None,
                };
                MutationRequest::Delete { table, filter }
            }
        })
    }
}

/// `{ "where": ..., "data": ... }` and nothing else.
fn is_envelope(obj: &Row) -> bool {
    obj.len() == 2 && obj.contains_key("where") && obj.contains_key("data")
}

fn parse_body(body: &[u8]) -> Result<Option<Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| AppError::validation(format!("invalid JSON body: {}", e)))
}

fn into_record(body: Option<Value>, action: &str) -> Result<Row, AppError> {
    match body {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(AppError::validation(format!("{} body must be a JSON object", action))),
        None => Err(AppError::validation(format!("{} requires a JSON object body", action))),
    }
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn insert_takes_body_record() {
        let req = MutationRequest::from_parts(
            &params(&[("action", "insert"), ("table", "posts")]),
            br#"{"title":"New","content":"c"}"#,
        )
        .unwrap();
        let MutationRequest::Insert { table, record } = req else { panic!("expected insert") };
        assert_eq!(table, "posts");
        assert_eq!(record.get("title"), Some(&json!("New")));
    }

    #[test]
    fn update_with_where_in_query() {
        let req = MutationRequest::from_parts(
            &params(&[("action", "update"), ("table", "posts"), ("where", r#"{"id":{"eq":"1"}}"#)]),
            br#"{"title":"Updated"}"#,
        )
        .unwrap();
        let MutationRequest::Update { filter, changes, .. } = req else { panic!("expected update") };
        assert_eq!(filter.unwrap().fields[0].field, "id");
        assert_eq!(changes.get("title"), Some(&json!("Updated")));
    }

    #[test]
    fn update_with_envelope_body() {
        let req = MutationRequest::from_parts(
            &params(&[("action", "update"), ("table", "posts")]),
            br#"{"where":{"id":2},"data":{"title":"x"}}"#,
        )
        .unwrap();
        let MutationRequest::Update { filter, changes, .. } = req else { panic!("expected update") };
        assert!(filter.is_some());
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn delete_without_where_parses_to_no_filter() {
        let req = MutationRequest::from_parts(&params(&[("action", "delete"), ("table", "posts")]), b"").unwrap();
        assert_eq!(
            req,
            MutationRequest::Delete {
                table: "posts".into(),
                filter: None
            }
        );
    }

    #[test]
    fn delete_with_body_where() {
        let req = MutationRequest::from_parts(
            &params(&[("action", "delete"), ("table", "posts")]),
            br#"{"where":{"id":3}}"#,
        )
        .unwrap();
        assert!(matches!(req, MutationRequest::Delete { filter: Some(_), .. }));
    }

    #[test]
    fn rejects_unknown_action_and_bad_bodies() {
        let err = MutationRequest::from_parts(&params(&[("action", "upsert"), ("table", "t")]), b"{}").unwrap_err();
        assert!(err.to_string().contains("upsert"));

        let err = MutationRequest::from_parts(&params(&[("action", "insert"), ("table", "t")]), b"[1]").unwrap_err();
        assert!(matches!(err, AppError::RequestValidation(_)));

        let err = MutationRequest::from_parts(&params(&[("action", "insert"), ("table", "t")]), b"{oops").unwrap_err();
        assert!(err.to_string().contains("invalid JSON body"));

        let err = MutationRequest::from_parts(&params(&[("table", "t")]), b"{}").unwrap_err();
        assert!(err.to_string().contains("action"));
    }
}
