use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::{ChallengeError, Result};
use crate::error::StorageError;
use crate::gateway::{ChallengeStore, Clock, UserStatsStore};
use crate::models::{Challenge, ChallengeStatus, Side};

/// Outcome derived from the two opponent records, before any side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Neither side rode the segment in the window.
    Void,
    Decided { winner: Side, by_default: bool },
    Tie,
}

/// Decide a challenge from its completion flags and elapsed times.
///
/// A single completed side wins by default. When both completed, the
/// strictly lower elapsed time wins and equal times tie. A completed side
/// without a recorded time loses to one that has it.
pub fn decide(challenge: &Challenge) -> Verdict {
    match (challenge.challenger.completed, challenge.challengee.completed) {
        (false, false) => Verdict::Void,
        (true, false) => Verdict::Decided {
            winner: Side::Challenger,
            by_default: true,
        },
        (false, true) => Verdict::Decided {
            winner: Side::Challengee,
            by_default: true,
        },
        (true, true) => match (challenge.challenger.time, challenge.challengee.time) {
            (Some(challenger), Some(challengee)) => match challenger.cmp(&challengee) {
                Ordering::Less => Verdict::Decided {
                    winner: Side::Challenger,
                    by_default: false,
                },
                Ordering::Greater => Verdict::Decided {
                    winner: Side::Challengee,
                    by_default: false,
                },
                Ordering::Equal => Verdict::Tie,
            },
            (Some(_), None) => Verdict::Decided {
                winner: Side::Challenger,
                by_default: true,
            },
            (None, Some(_)) => Verdict::Decided {
                winner: Side::Challengee,
                by_default: true,
            },
            (None, None) => Verdict::Tie,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// The record was deleted, no statistics changed.
    Voided,
    Won {
        winner_id: i64,
        loser_id: i64,
        by_default: bool,
    },
    Tied,
    /// Another resolution finalized this challenge first. Nothing was changed.
    AlreadyResolved,
}

pub struct ChallengeResolver {
    challenges: Arc<dyn ChallengeStore>,
    stats: Arc<dyn UserStatsStore>,
    clock: Arc<dyn Clock>,
}

impl ChallengeResolver {
    pub fn new(
        challenges: Arc<dyn ChallengeStore>,
        stats: Arc<dyn UserStatsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            challenges,
            stats,
            clock,
        }
    }

    /// Finalize a challenge whose window has elapsed or whose two sides are complete.
    ///
    /// The challenge row is claimed with a conditional write on `expired`
    /// before any statistic is touched, so concurrent resolutions of the same
    /// challenge apply the side effects at most once.
    pub async fn resolve(&self, challenge_id: Uuid) -> Result<Resolution> {
        let challenge = self
            .challenges
            .find_by_id(challenge_id)
            .await
            .map_err(ChallengeError::storage(format!("Challenge {}", challenge_id)))?;

        if challenge.expired {
            info!(challenge_id = %challenge_id, "Challenge already resolved, skipping");
            return Ok(Resolution::AlreadyResolved);
        }

        let verdict = decide(&challenge);

        if verdict == Verdict::Void {
            return match self.challenges.remove_by_id(challenge_id).await {
                Ok(()) => {
                    info!(challenge_id = %challenge_id, "Neither athlete completed, challenge removed");
                    Ok(Resolution::Voided)
                }
                Err(StorageError::NotFound) => Ok(Resolution::AlreadyResolved),
                Err(e) => Err(ChallengeError::PersistenceFailure(e)),
            };
        }

        let finalized = finalize(challenge, verdict, self.clock.now());

        let claimed = self
            .challenges
            .update_full(&finalized)
            .await
            .map_err(ChallengeError::PersistenceFailure)?;
        if !claimed {
            warn!(challenge_id = %challenge_id, "Lost resolution race, statistics left untouched");
            return Ok(Resolution::AlreadyResolved);
        }

        self.apply_statistics(&finalized, verdict)
            .await
            .inspect_err(|e| {
                error!(
                    challenge_id = %challenge_id,
                    error = %e,
                    "Challenge finalized but statistics update failed"
                )
            })?;

        let resolution = match verdict {
            Verdict::Decided { winner, by_default } => Resolution::Won {
                winner_id: finalized.opponent(winner).id,
                loser_id: finalized.opponent(winner.other()).id,
                by_default,
            },
            _ => Resolution::Tied,
        };

        info!(challenge_id = %challenge_id, ?resolution, "Challenge resolved");
        Ok(resolution)
    }

    async fn apply_statistics(&self, challenge: &Challenge, verdict: Verdict) -> Result<()> {
        if let Verdict::Decided { winner, .. } = verdict {
            let winner_id = challenge.opponent(winner).id;
            let loser_id = challenge.opponent(winner.other()).id;

            self.stats
                .increment_wins(winner_id, loser_id)
                .await
                .map_err(ChallengeError::PersistenceFailure)?;
            self.stats
                .increment_losses(loser_id, winner_id)
                .await
                .map_err(ChallengeError::PersistenceFailure)?;
        }

        for side in [Side::Challenger, Side::Challengee] {
            self.stats
                .increment_segment_count(challenge.opponent(side).id, challenge.segment_id)
                .await
                .map_err(ChallengeError::PersistenceFailure)?;
        }

        Ok(())
    }
}

fn finalize(mut challenge: Challenge, verdict: Verdict, now: DateTime<Utc>) -> Challenge {
    if let Verdict::Decided { winner, .. } = verdict {
        let (winner_id, winner_name) = {
            let w = challenge.opponent(winner);
            (w.id, w.name.clone())
        };
        let (loser_id, loser_name) = {
            let l = challenge.opponent(winner.other());
            (l.id, l.name.clone())
        };
        challenge.winner_id = Some(winner_id);
        challenge.winner_name = Some(winner_name);
        challenge.loser_id = Some(loser_id);
        challenge.loser_name = Some(loser_name);
    }

    challenge.status = ChallengeStatus::Complete;
    challenge.expired = true;
    challenge.completed_at = Some(now);
    challenge.updated_at = now;
    challenge
}
