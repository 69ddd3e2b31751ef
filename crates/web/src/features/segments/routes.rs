use axum::{Router, routing::get};

use super::handlers::{get_segment, list_athlete_efforts, refresh_segment};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_segment))
        .route("/:id/strava", get(refresh_segment))
        .route("/:id/efforts/:user_id", get(list_athlete_efforts))
}
