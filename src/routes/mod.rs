//! Router assembly.

mod common;
mod db;
pub use common::common_routes;
pub use db::db_routes;

use crate::state::AppState;
use axum::Router;

/// Health routes at the root and the data endpoint at `<api_path>/db`.
pub fn app(state: AppState) -> Router {
    let api_path = format!("/{}", state.settings.api_path.trim_matches('/'));
    let data = db_routes(state.clone());
    let router = Router::new().merge(common_routes(state));
    if api_path == "/" {
        router.merge(data)
    } else {
        router.nest(&api_path, data)
    }
}
