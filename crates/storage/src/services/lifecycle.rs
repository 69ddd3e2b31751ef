use std::sync::Arc;

use chrono::FixedOffset;
use tracing::info;
use uuid::Uuid;

use super::error::{ChallengeError, Result};
use super::ingestion::EffortIngestor;
use super::resolution::{ChallengeResolver, Resolution};
use super::scheduler::{ChallengeScheduler, SchedulerConfig};
use super::window::{target_day_from_timestamp, window_for};
use crate::dto::challenge::{CreateChallengeRequest, IngestionResponse};
use crate::Database;
use crate::gateway::{ChallengeStore, Clock, EffortProvider, SegmentCatalog, UserDirectory};
use crate::models::{Challenge, ChallengeStatus, Opponent};

/// User-facing challenge operations: create, accept, decline, complete and
/// participant-triggered ingestion.
pub struct ChallengeService {
    challenges: Arc<dyn ChallengeStore>,
    users: Arc<dyn UserDirectory>,
    segments: Arc<dyn SegmentCatalog>,
    scheduler: Arc<ChallengeScheduler>,
    clock: Arc<dyn Clock>,
    reference_offset: FixedOffset,
}

impl ChallengeService {
    pub fn new(
        challenges: Arc<dyn ChallengeStore>,
        users: Arc<dyn UserDirectory>,
        segments: Arc<dyn SegmentCatalog>,
        scheduler: Arc<ChallengeScheduler>,
        clock: Arc<dyn Clock>,
        reference_offset: FixedOffset,
    ) -> Self {
        Self {
            challenges,
            users,
            segments,
            scheduler,
            clock,
            reference_offset,
        }
    }

    /// Wire every gateway to PostgreSQL and efforts to `provider`.
    pub fn with_database(
        db: Database,
        provider: Arc<dyn EffortProvider>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
        reference_offset: FixedOffset,
    ) -> Self {
        let db = Arc::new(db);
        let ingestor = Arc::new(EffortIngestor::new(
            db.clone(),
            db.clone(),
            provider,
            clock.clone(),
        ));
        let resolver = Arc::new(ChallengeResolver::new(db.clone(), db.clone(), clock.clone()));
        let scheduler = Arc::new(ChallengeScheduler::new(
            db.clone(),
            ingestor,
            resolver,
            clock.clone(),
            config,
        ));

        Self::new(db.clone(), db.clone(), db, scheduler, clock, reference_offset)
    }

    pub fn scheduler(&self) -> &Arc<ChallengeScheduler> {
        &self.scheduler
    }

    /// Create a pending challenge whose window runs from the start of today
    /// to the end of the completion day, both in the reference timezone.
    pub async fn create(&self, request: &CreateChallengeRequest) -> Result<Challenge> {
        request
            .validate_participants()
            .map_err(|msg| ChallengeError::Validation(msg.to_string()))?;

        let challenger = self
            .users
            .find_user(request.challenger_id)
            .await
            .map_err(ChallengeError::storage(format!("User {}", request.challenger_id)))?;
        let challengee = self
            .users
            .find_user(request.challengee_id)
            .await
            .map_err(ChallengeError::storage(format!("User {}", request.challengee_id)))?;
        let segment = self
            .segments
            .find_segment(request.segment_id)
            .await
            .map_err(ChallengeError::storage(format!("Segment {}", request.segment_id)))?;

        let now = self.clock.now();
        let target_day = target_day_from_timestamp(request.completion_date, &self.reference_offset)?;
        let window = window_for(now, target_day, &self.reference_offset)?;

        let challenge = Challenge::new(
            &segment,
            Opponent::new(challenger.user_id, challenger.full_name, challenger.photo),
            Opponent::new(challengee.user_id, challengee.full_name, challengee.photo),
            window,
            now,
        );

        self.challenges
            .insert(&challenge)
            .await
            .map_err(ChallengeError::PersistenceFailure)?;

        info!(
            challenge_id = %challenge.challenge_id,
            segment_id = challenge.segment_id,
            challenger_id = challenge.challenger.id,
            challengee_id = challenge.challengee.id,
            expires = %challenge.expires,
            "Challenge created"
        );

        Ok(challenge)
    }

    pub async fn find(&self, challenge_id: Uuid) -> Result<Challenge> {
        self.challenges
            .find_by_id(challenge_id)
            .await
            .map_err(ChallengeError::storage(format!("Challenge {}", challenge_id)))
    }

    /// Challenges the user takes part in, newest first.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        status: Option<ChallengeStatus>,
    ) -> Result<Vec<Challenge>> {
        self.users
            .find_user(user_id)
            .await
            .map_err(ChallengeError::storage(format!("User {}", user_id)))?;

        self.challenges
            .list_for_user(user_id, status)
            .await
            .map_err(ChallengeError::PersistenceFailure)
    }

    pub async fn accept(&self, challenge_id: Uuid) -> Result<Challenge> {
        let mut challenge = self.find(challenge_id).await?;
        if challenge.expired {
            return Err(ChallengeError::AlreadyResolved(challenge_id));
        }
        if !challenge.status.can_advance_to(ChallengeStatus::Active) {
            return Err(ChallengeError::InvalidTransition(format!(
                "cannot accept a challenge that is {}",
                challenge.status
            )));
        }

        let now = self.clock.now();
        let moved = self
            .challenges
            .update_status(challenge_id, ChallengeStatus::Pending, ChallengeStatus::Active, now)
            .await
            .map_err(ChallengeError::PersistenceFailure)?;
        if !moved {
            return Err(ChallengeError::InvalidTransition(format!(
                "challenge {} is no longer pending",
                challenge_id
            )));
        }

        challenge.status = ChallengeStatus::Active;
        challenge.updated_at = now;
        info!(challenge_id = %challenge_id, "Challenge accepted");
        Ok(challenge)
    }

    pub async fn decline(&self, challenge_id: Uuid) -> Result<()> {
        let challenge = self.find(challenge_id).await?;
        if challenge.status != ChallengeStatus::Pending {
            return Err(ChallengeError::InvalidTransition(format!(
                "cannot decline a challenge that is {}",
                challenge.status
            )));
        }

        let removed = self
            .challenges
            .remove_if_pending(challenge_id)
            .await
            .map_err(ChallengeError::PersistenceFailure)?;
        if !removed {
            return Err(ChallengeError::InvalidTransition(format!(
                "challenge {} is no longer pending",
                challenge_id
            )));
        }

        info!(challenge_id = %challenge_id, "Challenge declined");
        Ok(())
    }

    /// Settle a challenge on request, once its window has elapsed or both
    /// sides already have an effort on record.
    pub async fn complete(&self, challenge_id: Uuid) -> Result<Resolution> {
        let challenge = self.find(challenge_id).await?;
        if challenge.expired {
            return Err(ChallengeError::AlreadyResolved(challenge_id));
        }
        if !challenge.window_elapsed(self.clock.now()) && !challenge.both_completed() {
            return Err(ChallengeError::InvalidTransition(format!(
                "challenge {} is still open until {}",
                challenge_id, challenge.expires
            )));
        }

        self.scheduler.settle(&challenge).await
    }

    /// Pull one participant's effort and resolve right away when the
    /// opponent had already completed.
    pub async fn ingest_effort(
        &self,
        challenge_id: Uuid,
        athlete_id: i64,
    ) -> Result<IngestionResponse> {
        let ingestion = self
            .scheduler
            .ingestor()
            .ingest(challenge_id, athlete_id)
            .await?;

        if !ingestion.ready_to_resolve() {
            return Ok(IngestionResponse {
                challenge: ingestion.challenge,
                outcome: ingestion.outcome,
                resolved: false,
            });
        }

        let resolution = self.scheduler.resolve(challenge_id).await?;
        let challenge = self.find(challenge_id).await?;

        Ok(IngestionResponse {
            challenge,
            outcome: ingestion.outcome,
            resolved: matches!(resolution, Resolution::Won { .. } | Resolution::Tied),
        })
    }
}
