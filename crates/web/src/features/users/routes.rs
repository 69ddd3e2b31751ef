use axum::{Router, routing::get};

use super::handlers::{get_user, list_user_challenges};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_user))
        .route("/:id/challenges", get(list_user_challenges))
}
