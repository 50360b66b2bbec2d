//! Data routes: one path, GET for reads and POST for writes.

use crate::handlers::db::{mutate, query};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// `GET /db` and `POST /db`; nest under the API path.
pub fn db_routes(state: AppState) -> Router {
    let body_limit = state.settings.body_limit_bytes;
    Router::new()
        .route("/db", get(query).post(mutate))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
