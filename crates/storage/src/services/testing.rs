//! In-memory gateway implementations for engine tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::gateway::{
    ChallengeStore, Clock, CredentialStore, EffortProvider, ProviderError, SegmentCatalog,
    UserDirectory, UserStatsStore,
};
use crate::models::{
    Challenge, ChallengeStatus, ChallengeWindow, EffortSummary, Opponent, Segment, Side, User,
};

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

pub fn segment(id: i64) -> Segment {
    let now = at(2023, 12, 1, 0, 0, 0);
    Segment {
        segment_id: id,
        name: "Hawk Hill".to_string(),
        activity_type: "Ride".to_string(),
        distance: 2400.0,
        average_grade: 5.2,
        maximum_grade: 9.8,
        elevation_high: 280.0,
        elevation_low: 150.0,
        total_elevation_gain: 130.0,
        climb_category: 2,
        city: Some("Sausalito".to_string()),
        state: Some("CA".to_string()),
        country: Some("United States".to_string()),
        polyline: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn user(id: i64, first: &str, last: &str) -> User {
    let now = at(2023, 12, 1, 0, 0, 0);
    User {
        user_id: id,
        first_name: first.to_string(),
        last_name: last.to_string(),
        full_name: format!("{} {}", first, last),
        photo: None,
        email: None,
        token: format!("token-{}", id),
        wins: 0,
        losses: 0,
        challenge_count: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Challenge between athletes 1 (challenger) and 2 (challengee) on segment 42,
/// window 2024-01-01 00:00:00 .. 2024-01-08 23:59:59 UTC.
pub fn challenge(status: ChallengeStatus) -> Challenge {
    let window = ChallengeWindow {
        start: at(2024, 1, 1, 0, 0, 0),
        end: at(2024, 1, 8, 23, 59, 59),
    };
    let mut challenge = Challenge::new(
        &segment(42),
        Opponent::new(1, "Ada Lovelace", None),
        Opponent::new(2, "Grace Hopper", None),
        window,
        at(2024, 1, 1, 9, 0, 0),
    );
    challenge.status = status;
    challenge
}

pub fn effort(athlete_id: i64, start_date: DateTime<Utc>, elapsed_time: i32) -> EffortSummary {
    EffortSummary {
        athlete_id,
        start_date,
        elapsed_time,
        average_cadence: Some(85.0),
        average_watts: Some(250.0),
        average_heart_rate: Some(160.0),
        max_heart_rate: Some(182.0),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatEvent {
    Win { user_id: i64, opponent_id: i64 },
    Loss { user_id: i64, opponent_id: i64 },
    Segment { user_id: i64, segment_id: i64 },
}

#[derive(Default)]
pub struct MemoryStore {
    pub challenges: Mutex<HashMap<Uuid, Challenge>>,
    pub users: Mutex<HashMap<i64, User>>,
    pub segments: Mutex<HashMap<i64, Segment>>,
    pub stats: Mutex<Vec<StatEvent>>,
    pub fail_updates: Mutex<bool>,
    /// Simulates a concurrent writer finalizing the row before our conditional write.
    pub lose_claims: Mutex<bool>,
    pub fail_stats: Mutex<bool>,
    /// Slows down every statistics write.
    pub stats_delay: Mutex<Option<Duration>>,
    pub fail_find_for: Mutex<Option<Uuid>>,
}

impl MemoryStore {
    pub fn with_fixtures() -> Self {
        let store = Self::default();
        store.add_user(user(1, "Ada", "Lovelace"));
        store.add_user(user(2, "Grace", "Hopper"));
        store.segments.lock().unwrap().insert(42, segment(42));
        store
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.user_id, user);
    }

    pub fn put(&self, challenge: Challenge) -> Uuid {
        let id = challenge.challenge_id;
        self.challenges.lock().unwrap().insert(id, challenge);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Challenge> {
        self.challenges.lock().unwrap().get(&id).cloned()
    }

    pub fn stats(&self) -> Vec<StatEvent> {
        self.stats.lock().unwrap().clone()
    }

    async fn record(&self, event: StatEvent) -> Result<()> {
        let delay = *self.stats_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_stats.lock().unwrap() {
            return Err(StorageError::ConstraintViolation("stats offline".to_string()));
        }
        self.stats.lock().unwrap().push(event);
        Ok(())
    }
}

#[async_trait]
impl ChallengeStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Challenge> {
        if *self.fail_find_for.lock().unwrap() == Some(id) {
            return Err(StorageError::Corrupt("unreadable".to_string()));
        }
        self.get(id).ok_or(StorageError::NotFound)
    }

    async fn insert(&self, challenge: &Challenge) -> Result<()> {
        self.put(challenge.clone());
        Ok(())
    }

    async fn remove_by_id(&self, id: Uuid) -> Result<()> {
        self.challenges
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn remove_if_pending(&self, id: Uuid) -> Result<bool> {
        let mut challenges = self.challenges.lock().unwrap();
        match challenges.get(&id) {
            Some(c) if c.status == ChallengeStatus::Pending => {
                challenges.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_full(&self, challenge: &Challenge) -> Result<bool> {
        if *self.fail_updates.lock().unwrap() {
            return Err(StorageError::ConstraintViolation("store offline".to_string()));
        }
        if *self.lose_claims.lock().unwrap() {
            return Ok(false);
        }
        let mut challenges = self.challenges.lock().unwrap();
        match challenges.get_mut(&challenge.challenge_id) {
            Some(stored) if !stored.expired => {
                *stored = challenge.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_opponent(
        &self,
        id: Uuid,
        side: Side,
        opponent: &Opponent,
        at: DateTime<Utc>,
    ) -> Result<Option<Challenge>> {
        if *self.fail_updates.lock().unwrap() {
            return Err(StorageError::ConstraintViolation("store offline".to_string()));
        }
        if *self.lose_claims.lock().unwrap() {
            return Ok(None);
        }
        let mut challenges = self.challenges.lock().unwrap();
        match challenges.get_mut(&id) {
            Some(stored) if !stored.expired => {
                match side {
                    Side::Challenger => stored.challenger = opponent.clone(),
                    Side::Challengee => stored.challengee = opponent.clone(),
                }
                stored.updated_at = at;
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: ChallengeStatus,
        to: ChallengeStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut challenges = self.challenges.lock().unwrap();
        match challenges.get_mut(&id) {
            Some(stored) if stored.status == from && !stored.expired => {
                stored.status = to;
                stored.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_expired_unresolved(&self, now: DateTime<Utc>) -> Result<Vec<Challenge>> {
        Ok(self
            .challenges
            .lock()
            .unwrap()
            .values()
            .filter(|c| !c.expired && c.expires < now)
            .cloned()
            .collect())
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        status: Option<ChallengeStatus>,
    ) -> Result<Vec<Challenge>> {
        let mut found: Vec<Challenge> = self
            .challenges
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.side_of(user_id).is_some())
            .filter(|c| status.is_none_or(|s| c.status == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

#[async_trait]
impl UserStatsStore for MemoryStore {
    async fn increment_wins(&self, user_id: i64, opponent_id: i64) -> Result<()> {
        self.record(StatEvent::Win {
            user_id,
            opponent_id,
        })
        .await
    }

    async fn increment_losses(&self, user_id: i64, opponent_id: i64) -> Result<()> {
        self.record(StatEvent::Loss {
            user_id,
            opponent_id,
        })
        .await
    }

    async fn increment_segment_count(&self, user_id: i64, segment_id: i64) -> Result<()> {
        self.record(StatEvent::Segment {
            user_id,
            segment_id,
        })
        .await
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn access_token(&self, user_id: i64) -> Result<String> {
        self.users
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|u| u.token.clone())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user(&self, user_id: i64) -> Result<User> {
        self.users
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl SegmentCatalog for MemoryStore {
    async fn find_segment(&self, segment_id: i64) -> Result<Segment> {
        self.segments
            .lock()
            .unwrap()
            .get(&segment_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

/// Provider that replays canned efforts per athlete.
#[derive(Default)]
pub struct ScriptedProvider {
    pub efforts: Mutex<HashMap<i64, Vec<EffortSummary>>>,
    pub failing: Mutex<Vec<i64>>,
    pub hanging: Mutex<Vec<i64>>,
    pub calls: Mutex<Vec<(String, i64, i64)>>,
}

impl ScriptedProvider {
    pub fn with_efforts(athlete_id: i64, efforts: Vec<EffortSummary>) -> Self {
        let provider = Self::default();
        provider.set_efforts(athlete_id, efforts);
        provider
    }

    pub fn set_efforts(&self, athlete_id: i64, efforts: Vec<EffortSummary>) {
        self.efforts.lock().unwrap().insert(athlete_id, efforts);
    }

    pub fn fail_for(&self, athlete_id: i64) {
        self.failing.lock().unwrap().push(athlete_id);
    }

    pub fn hang_for(&self, athlete_id: i64) {
        self.hanging.lock().unwrap().push(athlete_id);
    }

    pub fn calls(&self) -> Vec<(String, i64, i64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EffortProvider for ScriptedProvider {
    async fn segment_efforts(
        &self,
        access_token: &str,
        segment_id: i64,
        athlete_id: i64,
        _window: &ChallengeWindow,
    ) -> std::result::Result<Vec<EffortSummary>, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((access_token.to_string(), segment_id, athlete_id));

        // Give concurrently running ingestions a chance to interleave.
        tokio::task::yield_now().await;

        let hangs = self.hanging.lock().unwrap().contains(&athlete_id);
        if hangs {
            std::future::pending::<()>().await;
        }
        if self.failing.lock().unwrap().contains(&athlete_id) {
            return Err(ProviderError::RateLimited);
        }
        Ok(self
            .efforts
            .lock()
            .unwrap()
            .get(&athlete_id)
            .cloned()
            .unwrap_or_default())
    }
}

pub struct FixedClock(pub Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}
