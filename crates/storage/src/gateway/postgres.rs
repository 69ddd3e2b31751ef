use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ChallengeStore, CredentialStore, SegmentCatalog, UserDirectory, UserStatsStore};
use crate::Database;
use crate::error::Result;
use crate::models::{Challenge, ChallengeStatus, Opponent, Segment, Side, User};
use crate::repository::challenge::ChallengeRepository;
use crate::repository::segment::SegmentRepository;
use crate::repository::user::UserRepository;

#[async_trait]
impl ChallengeStore for Database {
    async fn find_by_id(&self, id: Uuid) -> Result<Challenge> {
        ChallengeRepository::new(self.pool()).find_by_id(id).await
    }

    async fn insert(&self, challenge: &Challenge) -> Result<()> {
        ChallengeRepository::new(self.pool()).create(challenge).await
    }

    async fn remove_by_id(&self, id: Uuid) -> Result<()> {
        ChallengeRepository::new(self.pool()).delete(id).await
    }

    async fn remove_if_pending(&self, id: Uuid) -> Result<bool> {
        ChallengeRepository::new(self.pool()).delete_pending(id).await
    }

    async fn update_full(&self, challenge: &Challenge) -> Result<bool> {
        ChallengeRepository::new(self.pool())
            .update_unexpired(challenge)
            .await
    }

    async fn update_opponent(
        &self,
        id: Uuid,
        side: Side,
        opponent: &Opponent,
        at: DateTime<Utc>,
    ) -> Result<Option<Challenge>> {
        ChallengeRepository::new(self.pool())
            .update_side(id, side, opponent, at)
            .await
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: ChallengeStatus,
        to: ChallengeStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        ChallengeRepository::new(self.pool())
            .transition_status(id, from, to, at)
            .await
    }

    async fn find_expired_unresolved(&self, now: DateTime<Utc>) -> Result<Vec<Challenge>> {
        ChallengeRepository::new(self.pool())
            .find_expired_unresolved(now)
            .await
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        status: Option<ChallengeStatus>,
    ) -> Result<Vec<Challenge>> {
        ChallengeRepository::new(self.pool())
            .list_for_user(user_id, status)
            .await
    }
}

#[async_trait]
impl UserStatsStore for Database {
    async fn increment_wins(&self, user_id: i64, opponent_id: i64) -> Result<()> {
        UserRepository::new(self.pool())
            .increment_wins(user_id, opponent_id)
            .await
    }

    async fn increment_losses(&self, user_id: i64, opponent_id: i64) -> Result<()> {
        UserRepository::new(self.pool())
            .increment_losses(user_id, opponent_id)
            .await
    }

    async fn increment_segment_count(&self, user_id: i64, segment_id: i64) -> Result<()> {
        UserRepository::new(self.pool())
            .increment_segment_count(user_id, segment_id)
            .await
    }
}

#[async_trait]
impl CredentialStore for Database {
    async fn access_token(&self, user_id: i64) -> Result<String> {
        UserRepository::new(self.pool()).access_token(user_id).await
    }
}

#[async_trait]
impl UserDirectory for Database {
    async fn find_user(&self, user_id: i64) -> Result<User> {
        UserRepository::new(self.pool()).find_by_id(user_id).await
    }
}

#[async_trait]
impl SegmentCatalog for Database {
    async fn find_segment(&self, segment_id: i64) -> Result<Segment> {
        SegmentRepository::new(self.pool()).find_by_id(segment_id).await
    }
}
