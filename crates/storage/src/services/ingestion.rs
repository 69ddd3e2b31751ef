use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::{ChallengeError, Result};
use crate::gateway::{ChallengeStore, Clock, CredentialStore, EffortProvider};
use crate::models::{Challenge, ChallengeWindow, EffortSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// A qualifying effort was stored for the participant.
    Recorded { opponent_completed: bool },
    /// The participant has no effort inside the window yet. Not an error.
    NoQualifyingEffort,
}

#[derive(Debug, Clone)]
pub struct Ingestion {
    pub challenge: Challenge,
    pub outcome: IngestOutcome,
}

impl Ingestion {
    /// Both sides are complete, so the caller should resolve the challenge now.
    pub fn ready_to_resolve(&self) -> bool {
        matches!(
            self.outcome,
            IngestOutcome::Recorded {
                opponent_completed: true
            }
        )
    }
}

/// The effort that counts for a challenge: the first one in the provider's
/// earliest-first ordering that belongs to the athlete and started inside the
/// window. Faster attempts later in the window do not replace it.
pub fn qualifying_effort<'a>(
    efforts: &'a [EffortSummary],
    athlete_id: i64,
    window: &ChallengeWindow,
) -> Option<&'a EffortSummary> {
    efforts
        .iter()
        .find(|e| e.athlete_id == athlete_id && window.contains(e.start_date))
}

/// Pulls a participant's qualifying effort from the provider and merges it
/// into their side of the challenge.
pub struct EffortIngestor {
    challenges: Arc<dyn ChallengeStore>,
    credentials: Arc<dyn CredentialStore>,
    provider: Arc<dyn EffortProvider>,
    clock: Arc<dyn Clock>,
}

impl EffortIngestor {
    pub fn new(
        challenges: Arc<dyn ChallengeStore>,
        credentials: Arc<dyn CredentialStore>,
        provider: Arc<dyn EffortProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            challenges,
            credentials,
            provider,
            clock,
        }
    }

    /// Re-running this is safe: it re-derives the same earliest effort as long
    /// as the provider data has not changed.
    pub async fn ingest(&self, challenge_id: Uuid, athlete_id: i64) -> Result<Ingestion> {
        let challenge = self
            .challenges
            .find_by_id(challenge_id)
            .await
            .map_err(ChallengeError::storage(format!("Challenge {}", challenge_id)))?;

        let side = challenge
            .side_of(athlete_id)
            .ok_or(ChallengeError::InvalidParticipant {
                challenge_id,
                athlete_id,
            })?;

        if challenge.expired {
            return Err(ChallengeError::AlreadyResolved(challenge_id));
        }

        let token = self
            .credentials
            .access_token(athlete_id)
            .await
            .map_err(ChallengeError::storage(format!("User {}", athlete_id)))?;

        let window = challenge.window();
        let efforts = self
            .provider
            .segment_efforts(&token, challenge.segment_id, athlete_id, &window)
            .await?;

        debug!(
            challenge_id = %challenge_id,
            athlete_id,
            segment_id = challenge.segment_id,
            candidates = efforts.len(),
            "Fetched segment efforts"
        );

        let Some(effort) = qualifying_effort(&efforts, athlete_id, &window) else {
            info!(
                challenge_id = %challenge_id,
                athlete_id,
                "No qualifying effort inside the challenge window"
            );
            return Ok(Ingestion {
                challenge,
                outcome: IngestOutcome::NoQualifyingEffort,
            });
        };

        let mut opponent = challenge.opponent(side).clone();
        opponent.record_effort(effort);

        // Writes this side only; the other side comes back as currently stored.
        let Some(challenge) = self
            .challenges
            .update_opponent(challenge_id, side, &opponent, self.clock.now())
            .await
            .map_err(ChallengeError::PersistenceFailure)?
        else {
            return Err(ChallengeError::AlreadyResolved(challenge_id));
        };

        let opponent_completed = challenge.opponent(side.other()).completed;
        info!(
            challenge_id = %challenge_id,
            athlete_id,
            side = %side,
            elapsed_time = effort.elapsed_time,
            opponent_completed,
            "Recorded qualifying effort"
        );

        Ok(Ingestion {
            challenge,
            outcome: IngestOutcome::Recorded { opponent_completed },
        })
    }
}
