use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Opponent, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Pending,
    Active,
    Complete,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Complete => "complete",
        }
    }

    /// Status only moves forward: pending -> active -> complete.
    pub fn can_advance_to(&self, next: ChallengeStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active)
                | (Self::Pending, Self::Complete)
                | (Self::Active, Self::Complete)
        )
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "complete" | "completed" => Ok(Self::Complete),
            other => Err(format!("unknown challenge status '{}'", other)),
        }
    }
}

/// Which side of a challenge an athlete is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Challenger,
    Challengee,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Challenger => Side::Challengee,
            Side::Challengee => Side::Challenger,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Challenger => f.write_str("challenger"),
            Side::Challengee => f.write_str("challengee"),
        }
    }
}

/// Inclusive time range during which an effort counts for a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChallengeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ChallengeWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Challenge {
    pub challenge_id: Uuid,
    pub segment_id: i64,
    pub segment_name: String,
    pub challenger: Opponent,
    pub challengee: Opponent,
    pub status: ChallengeStatus,
    /// Window start, midnight of the creation day in the reference timezone
    pub created: DateTime<Utc>,
    /// Window end, 23:59:59 of the target day in the reference timezone
    pub expires: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set once the challenge has been finalized; nothing is mutated afterwards
    pub expired: bool,
    pub winner_id: Option<i64>,
    pub winner_name: Option<String>,
    pub loser_id: Option<i64>,
    pub loser_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Challenge {
    pub fn new(
        segment: &Segment,
        challenger: Opponent,
        challengee: Opponent,
        window: ChallengeWindow,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            challenge_id: Uuid::new_v4(),
            segment_id: segment.segment_id,
            segment_name: segment.name.clone(),
            challenger,
            challengee,
            status: ChallengeStatus::Pending,
            created: window.start,
            expires: window.end,
            completed_at: None,
            expired: false,
            winner_id: None,
            winner_name: None,
            loser_id: None,
            loser_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn window(&self) -> ChallengeWindow {
        ChallengeWindow {
            start: self.created,
            end: self.expires,
        }
    }

    pub fn side_of(&self, athlete_id: i64) -> Option<Side> {
        if self.challenger.id == athlete_id {
            Some(Side::Challenger)
        } else if self.challengee.id == athlete_id {
            Some(Side::Challengee)
        } else {
            None
        }
    }

    pub fn opponent(&self, side: Side) -> &Opponent {
        match side {
            Side::Challenger => &self.challenger,
            Side::Challengee => &self.challengee,
        }
    }

    pub fn window_elapsed(&self, now: DateTime<Utc>) -> bool {
        now > self.expires
    }

    pub fn both_completed(&self) -> bool {
        self.challenger.completed && self.challengee.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Challenge {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap();
        Challenge {
            challenge_id: Uuid::new_v4(),
            segment_id: 42,
            segment_name: "Hawk Hill".to_string(),
            challenger: Opponent::new(1, "Ada", None),
            challengee: Opponent::new(2, "Grace", None),
            status: ChallengeStatus::Pending,
            created: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            expires: Utc.with_ymd_and_hms(2024, 1, 8, 23, 59, 59).unwrap(),
            completed_at: None,
            expired: false,
            winner_id: None,
            winner_name: None,
            loser_id: None,
            loser_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_side_lookup() {
        let challenge = sample();
        assert_eq!(challenge.side_of(1), Some(Side::Challenger));
        assert_eq!(challenge.side_of(2), Some(Side::Challengee));
        assert_eq!(challenge.side_of(3), None);
        assert_eq!(Side::Challenger.other(), Side::Challengee);
    }

    #[test]
    fn test_window_is_inclusive() {
        let window = sample().window();
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(window.end + chrono::Duration::seconds(1)));
        assert!(!window.contains(window.start - chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_status_only_advances() {
        use ChallengeStatus::*;
        assert!(Pending.can_advance_to(Active));
        assert!(Active.can_advance_to(Complete));
        assert!(!Active.can_advance_to(Pending));
        assert!(!Complete.can_advance_to(Active));
        assert!(!Complete.can_advance_to(Complete));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("pending".parse::<ChallengeStatus>(), Ok(ChallengeStatus::Pending));
        assert_eq!("Completed".parse::<ChallengeStatus>(), Ok(ChallengeStatus::Complete));
        assert!("void".parse::<ChallengeStatus>().is_err());
    }
}
