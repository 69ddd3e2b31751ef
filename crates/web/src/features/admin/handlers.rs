use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use storage::services::SweepReport;

use crate::error::WebError;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/admin/sweep",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Sweep finished", body = SweepReport),
        (status = 401, description = "Unauthorized")
    ),
    tag = "admin"
)]
pub async fn run_sweep(State(state): State<AppState>) -> Result<Response, WebError> {
    let report = state.challenges.scheduler().sweep().await;

    Ok(Json(report).into_response())
}
