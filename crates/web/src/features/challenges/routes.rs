use axum::{
    Router,
    routing::{get, post, put},
};

use super::handlers::{
    accept_challenge, complete_challenge, create_challenge, decline_challenge, get_challenge,
    ingest_effort,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_challenge))
        .route("/:id", get(get_challenge))
        .route("/:id/accept", put(accept_challenge))
        .route("/:id/decline", put(decline_challenge))
        .route("/:id/complete", post(complete_challenge))
        .route("/:id/efforts/:athlete_id", post(ingest_effort))
}
