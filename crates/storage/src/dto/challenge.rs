use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::{Challenge, ChallengeStatus};
use crate::services::ingestion::IngestOutcome;

/// Request payload for creating a new challenge
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateChallengeRequest {
    #[validate(range(min = 1, message = "segment_id must be positive"))]
    pub segment_id: i64,

    #[validate(range(min = 1, message = "challenger_id must be positive"))]
    pub challenger_id: i64,

    #[validate(range(min = 1, message = "challengee_id must be positive"))]
    pub challengee_id: i64,

    /// Unix timestamp (seconds) of the last day efforts are accepted
    #[validate(range(min = 0, message = "completion_date must be a unix timestamp"))]
    pub completion_date: i64,
}

impl CreateChallengeRequest {
    /// Additional validation that requires multiple fields
    pub fn validate_participants(&self) -> Result<(), &'static str> {
        if self.challenger_id == self.challengee_id {
            return Err("Challenger and challengee must be different athletes");
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ChallengeListQuery {
    /// Only return challenges in this status
    pub status: Option<ChallengeStatus>,
}

/// Result of ingesting one participant's effort
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngestionResponse {
    pub challenge: Challenge,
    pub outcome: IngestOutcome,
    /// Set when the ingestion completed the pair and the challenge was resolved right away
    pub resolved: bool,
}
