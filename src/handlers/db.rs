//! Data endpoint handlers: GET reads, POST writes.

use crate::error::AppError;
use crate::request::{MutationRequest, QueryRequest};
use crate::response::{rows_ok, write_ok};
use crate::service::{MutationDispatcher, QueryPlanner};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    response::Response,
};
use std::collections::HashMap;

pub async fn query(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let result = async {
        let req = QueryRequest::from_params(&params)?;
        QueryPlanner::new(state.store.as_ref(), &state.registry)
            .with_max_limit(state.settings.max_limit)
            .execute(&req)
            .await
    }
    .await;
    match result {
        Ok(rows) => Ok(rows_ok(rows)),
        Err(e) => Err(report(&state, "query", e)),
    }
}

pub async fn mutate(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let result = async {
        let req = MutationRequest::from_parts(&params, &body)?;
        MutationDispatcher::new(state.store.as_ref(), &state.registry)
            .execute(&req)
            .await
    }
    .await;
    match result {
        Ok(affected) => {
            tracing::debug!(affected, "mutation applied");
            Ok(write_ok())
        }
        Err(e) => Err(report(&state, "mutation", e)),
    }
}

/// Log a failed request. Backend detail is kept out of production logs.
fn report(state: &AppState, kind: &str, err: AppError) -> AppError {
    if !err.is_internal() {
        tracing::debug!(kind, error = %err, "rejected request");
    } else if state.settings.is_production() {
        tracing::error!(kind, backend = state.store.backend(), "{}", err.client_message());
    } else {
        tracing::error!(kind, backend = state.store.backend(), error = %err, "request failed");
    }
    err
}
