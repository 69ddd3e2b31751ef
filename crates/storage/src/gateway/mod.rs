//! Narrow interfaces the challenge engine talks to.
//!
//! The engine never touches the connection pool or the HTTP client directly;
//! everything it needs is injected as one of these traits. [`crate::Database`]
//! implements the persistence side in [`postgres`].

mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Challenge, ChallengeStatus, ChallengeWindow, EffortSummary, Opponent, Segment, Side, User,
};

#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Challenge>;

    async fn insert(&self, challenge: &Challenge) -> Result<()>;

    /// Fails with `NotFound` when nothing was deleted.
    async fn remove_by_id(&self, id: Uuid) -> Result<()>;

    /// Deletes the record only while it is still pending. Returns whether a row was removed.
    async fn remove_if_pending(&self, id: Uuid) -> Result<bool>;

    /// Replaces the stored record, but only while the stored copy is still
    /// unexpired. Returns `false` when the record had already been finalized,
    /// which makes this the compare-and-swap used to claim a resolution.
    async fn update_full(&self, challenge: &Challenge) -> Result<bool>;

    /// Replaces one side's record while the challenge is unexpired, leaving
    /// the other side untouched. Returns the record as stored after the write,
    /// or `None` when it had already been finalized.
    async fn update_opponent(
        &self,
        id: Uuid,
        side: Side,
        opponent: &Opponent,
        at: DateTime<Utc>,
    ) -> Result<Option<Challenge>>;

    /// Moves `from -> to`. Returns `false` when the stored status was not `from`.
    async fn update_status(
        &self,
        id: Uuid,
        from: ChallengeStatus,
        to: ChallengeStatus,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Records with `expired = false AND expires < now`, unordered.
    async fn find_expired_unresolved(&self, now: DateTime<Utc>) -> Result<Vec<Challenge>>;

    async fn list_for_user(
        &self,
        user_id: i64,
        status: Option<ChallengeStatus>,
    ) -> Result<Vec<Challenge>>;
}

#[async_trait]
pub trait UserStatsStore: Send + Sync {
    async fn increment_wins(&self, user_id: i64, opponent_id: i64) -> Result<()>;

    async fn increment_losses(&self, user_id: i64, opponent_id: i64) -> Result<()>;

    async fn increment_segment_count(&self, user_id: i64, segment_id: i64) -> Result<()>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn access_token(&self, user_id: i64) -> Result<String>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, user_id: i64) -> Result<User>;
}

#[async_trait]
pub trait SegmentCatalog: Send + Sync {
    async fn find_segment(&self, segment_id: i64) -> Result<Segment>;
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider rate limit reached")]
    RateLimited,

    #[error("provider rejected the access token")]
    Unauthorized,

    #[error("provider answered with status {0}")]
    UnexpectedStatus(u16),

    #[error("could not decode provider response: {0}")]
    Decode(String),
}

/// Source of externally recorded segment efforts.
#[async_trait]
pub trait EffortProvider: Send + Sync {
    /// Efforts by `athlete_id` on `segment_id` inside `window`, earliest first.
    async fn segment_efforts(
        &self,
        access_token: &str,
        segment_id: i64,
        athlete_id: i64,
        window: &ChallengeWindow,
    ) -> std::result::Result<Vec<EffortSummary>, ProviderError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
