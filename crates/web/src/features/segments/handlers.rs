use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use storage::models::{EffortSummary, Segment};

use super::services;
use crate::error::WebError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/segments/{id}",
    params(
        ("id" = i64, Path, description = "Strava segment id")
    ),
    responses(
        (status = 200, description = "Cached segment", body = Segment),
        (status = 404, description = "Segment not cached")
    ),
    tag = "segments"
)]
pub async fn get_segment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let segment = services::get_segment(state.db.pool(), id).await?;

    Ok(Json(segment).into_response())
}

#[utoipa::path(
    get,
    path = "/api/segments/{id}/strava",
    params(
        ("id" = i64, Path, description = "Strava segment id")
    ),
    responses(
        (status = 200, description = "Segment fetched from Strava and cached", body = Segment),
        (status = 404, description = "Segment unknown to Strava"),
        (status = 503, description = "Strava unavailable")
    ),
    tag = "segments"
)]
pub async fn refresh_segment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let segment = services::refresh_segment(
        state.db.pool(),
        &state.strava,
        state.strava_token.as_deref(),
        id,
    )
    .await?;

    Ok(Json(segment).into_response())
}

#[utoipa::path(
    get,
    path = "/api/segments/{id}/efforts/{user_id}",
    params(
        ("id" = i64, Path, description = "Strava segment id"),
        ("user_id" = i64, Path, description = "Registered athlete id")
    ),
    responses(
        (status = 200, description = "Athlete efforts on the segment, earliest first", body = Vec<EffortSummary>),
        (status = 404, description = "User not registered or segment unknown to Strava"),
        (status = 503, description = "Strava unavailable")
    ),
    tag = "segments"
)]
pub async fn list_athlete_efforts(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i64, i64)>,
) -> Result<Response, WebError> {
    let efforts = services::athlete_efforts(state.db.pool(), &state.strava, id, user_id).await?;

    Ok(Json(efforts).into_response())
}
