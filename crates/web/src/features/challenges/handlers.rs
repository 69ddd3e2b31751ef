use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::{
    dto::challenge::{CreateChallengeRequest, IngestionResponse},
    models::Challenge,
    services::Resolution,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/challenges",
    request_body = CreateChallengeRequest,
    responses(
        (status = 201, description = "Challenge created in pending state", body = Challenge),
        (status = 400, description = "Validation error or completion day before today"),
        (status = 404, description = "Unknown user or segment")
    ),
    tag = "challenges"
)]
pub async fn create_challenge(
    State(state): State<AppState>,
    Json(req): Json<CreateChallengeRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let challenge = state.challenges.create(&req).await?;

    Ok((StatusCode::CREATED, Json(challenge)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/challenges/{id}",
    params(
        ("id" = Uuid, Path, description = "Challenge id")
    ),
    responses(
        (status = 200, description = "Challenge found", body = Challenge),
        (status = 404, description = "Challenge not found")
    ),
    tag = "challenges"
)]
pub async fn get_challenge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let challenge = state.challenges.find(id).await?;

    Ok(Json(challenge).into_response())
}

#[utoipa::path(
    put,
    path = "/api/challenges/{id}/accept",
    params(
        ("id" = Uuid, Path, description = "Challenge id")
    ),
    responses(
        (status = 200, description = "Challenge is now active", body = Challenge),
        (status = 400, description = "Challenge is not pending"),
        (status = 404, description = "Challenge not found")
    ),
    tag = "challenges"
)]
pub async fn accept_challenge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let challenge = state.challenges.accept(id).await?;

    Ok(Json(challenge).into_response())
}

#[utoipa::path(
    put,
    path = "/api/challenges/{id}/decline",
    params(
        ("id" = Uuid, Path, description = "Challenge id")
    ),
    responses(
        (status = 204, description = "Challenge declined and removed"),
        (status = 400, description = "Challenge is not pending"),
        (status = 404, description = "Challenge not found")
    ),
    tag = "challenges"
)]
pub async fn decline_challenge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    state.challenges.decline(id).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[utoipa::path(
    post,
    path = "/api/challenges/{id}/complete",
    params(
        ("id" = Uuid, Path, description = "Challenge id")
    ),
    responses(
        (status = 200, description = "Challenge settled", body = Resolution),
        (status = 400, description = "Window still open and efforts missing"),
        (status = 404, description = "Challenge not found"),
        (status = 409, description = "Challenge already resolved")
    ),
    tag = "challenges"
)]
pub async fn complete_challenge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let resolution = state.challenges.complete(id).await?;

    Ok(Json(resolution).into_response())
}

#[utoipa::path(
    post,
    path = "/api/challenges/{id}/efforts/{athlete_id}",
    params(
        ("id" = Uuid, Path, description = "Challenge id"),
        ("athlete_id" = i64, Path, description = "Participant whose effort is fetched")
    ),
    responses(
        (status = 200, description = "Effort ingested, or no qualifying effort yet", body = IngestionResponse),
        (status = 400, description = "Athlete is not part of the challenge"),
        (status = 404, description = "Challenge not found"),
        (status = 409, description = "Challenge already resolved"),
        (status = 503, description = "Strava unavailable")
    ),
    tag = "challenges"
)]
pub async fn ingest_effort(
    State(state): State<AppState>,
    Path((id, athlete_id)): Path<(Uuid, i64)>,
) -> Result<Response, WebError> {
    let response = state.challenges.ingest_effort(id, athlete_id).await?;

    Ok(Json(response).into_response())
}
