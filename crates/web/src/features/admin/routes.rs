use axum::{Router, middleware, routing::post};

use super::handlers::run_sweep;
use crate::middleware::auth::{ApiKeys, require_auth};
use crate::state::AppState;

pub fn routes(api_keys: ApiKeys) -> Router<AppState> {
    Router::new()
        .route("/sweep", post(run_sweep))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth))
}
