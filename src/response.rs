//! Response helpers for the data routes.

use crate::codec::json_to_wire;
use crate::store::Row;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// 200 with the rows as a JSON array of wire values.
pub fn rows_ok(rows: Vec<Row>) -> Response {
    let body = Value::Array(rows.into_iter().map(|r| json_to_wire(Value::Object(r))).collect());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

/// 200 with an empty plain-text body.
pub fn write_ok() -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "").into_response()
}
