use std::sync::Arc;

use storage::Database;
use storage::services::ChallengeService;
use strava::StravaClient;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub challenges: Arc<ChallengeService>,
    pub strava: StravaClient,
    pub strava_token: Option<String>,
}
