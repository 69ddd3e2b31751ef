pub mod admin;
pub mod challenges;
pub mod segments;
pub mod users;

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::middleware::auth::ApiKeys;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up")
    ),
    tag = "health"
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: AppState, api_keys: ApiKeys) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/challenges", challenges::routes::routes())
        .nest("/api/users", users::routes::routes())
        .nest("/api/segments", segments::routes::routes())
        .nest("/api/admin", admin::routes::routes(api_keys))
        .with_state(state)
}
