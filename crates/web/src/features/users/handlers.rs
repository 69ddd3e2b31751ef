use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use storage::{
    dto::{challenge::ChallengeListQuery, user::UserProfileResponse},
    models::Challenge,
};

use super::services;
use crate::error::WebError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = i64, Path, description = "Strava athlete id")
    ),
    responses(
        (status = 200, description = "User profile with challenge statistics", body = UserProfileResponse),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let profile = services::get_profile(state.db.pool(), id).await?;

    Ok(Json(profile).into_response())
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/challenges",
    params(
        ("id" = i64, Path, description = "Strava athlete id"),
        ChallengeListQuery
    ),
    responses(
        (status = 200, description = "Challenges the user takes part in, newest first", body = Vec<Challenge>),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn list_user_challenges(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ChallengeListQuery>,
) -> Result<Response, WebError> {
    let challenges = state.challenges.list_for_user(id, query.status).await?;

    Ok(Json(challenges).into_response())
}
