use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{Challenge, ChallengeStatus, Opponent, Side};

const CHALLENGE_COLUMNS: &str = r#"
    challenge_id, segment_id, segment_name, challenger, challengee, status,
    created, expires, completed_at, expired, winner_id, winner_name,
    loser_id, loser_name, created_at, updated_at
"#;

#[derive(Debug, FromRow)]
struct ChallengeRow {
    challenge_id: Uuid,
    segment_id: i64,
    segment_name: String,
    challenger: Json<Opponent>,
    challengee: Json<Opponent>,
    status: String,
    created: DateTime<Utc>,
    expires: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    expired: bool,
    winner_id: Option<i64>,
    winner_name: Option<String>,
    loser_id: Option<i64>,
    loser_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ChallengeRow> for Challenge {
    type Error = StorageError;

    fn try_from(row: ChallengeRow) -> Result<Self> {
        let status = row
            .status
            .parse::<ChallengeStatus>()
            .map_err(StorageError::Corrupt)?;

        Ok(Challenge {
            challenge_id: row.challenge_id,
            segment_id: row.segment_id,
            segment_name: row.segment_name,
            challenger: row.challenger.0,
            challengee: row.challengee.0,
            status,
            created: row.created,
            expires: row.expires,
            completed_at: row.completed_at,
            expired: row.expired,
            winner_id: row.winner_id,
            winner_name: row.winner_name,
            loser_id: row.loser_id,
            loser_name: row.loser_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_challenges(rows: Vec<ChallengeRow>) -> Result<Vec<Challenge>> {
    rows.into_iter().map(Challenge::try_from).collect()
}

fn insert_error(challenge_id: Uuid, err: StorageError) -> StorageError {
    if err.is_unique_violation() {
        StorageError::ConstraintViolation(format!("Challenge {} already exists", challenge_id))
    } else if err.is_check_violation() {
        StorageError::ConstraintViolation("Challenge must expire after it is created".to_string())
    } else {
        err
    }
}

/// Repository for Challenge database operations
pub struct ChallengeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChallengeRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a challenge by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Challenge> {
        let row = sqlx::query_as::<_, ChallengeRow>(&format!(
            "SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE challenge_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Challenge::try_from(row)
    }

    /// List challenges a user takes part in, newest first
    pub async fn list_for_user(
        &self,
        user_id: i64,
        status: Option<ChallengeStatus>,
    ) -> Result<Vec<Challenge>> {
        let rows = sqlx::query_as::<_, ChallengeRow>(&format!(
            r#"
            SELECT {CHALLENGE_COLUMNS}
            FROM challenges
            WHERE (challenger_id = $1 OR challengee_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(self.pool)
        .await?;

        into_challenges(rows)
    }

    /// Unresolved challenges whose window closed before `now`
    pub async fn find_expired_unresolved(&self, now: DateTime<Utc>) -> Result<Vec<Challenge>> {
        let rows = sqlx::query_as::<_, ChallengeRow>(&format!(
            "SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE expired = FALSE AND expires < $1"
        ))
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        into_challenges(rows)
    }

    /// Create a new challenge
    pub async fn create(&self, challenge: &Challenge) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO challenges (
                challenge_id, segment_id, segment_name, challenger_id, challengee_id,
                challenger, challengee, status, created, expires, completed_at, expired,
                winner_id, winner_name, loser_id, loser_name, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(challenge.challenge_id)
        .bind(challenge.segment_id)
        .bind(&challenge.segment_name)
        .bind(challenge.challenger.id)
        .bind(challenge.challengee.id)
        .bind(Json(&challenge.challenger))
        .bind(Json(&challenge.challengee))
        .bind(challenge.status.as_str())
        .bind(challenge.created)
        .bind(challenge.expires)
        .bind(challenge.completed_at)
        .bind(challenge.expired)
        .bind(challenge.winner_id)
        .bind(&challenge.winner_name)
        .bind(challenge.loser_id)
        .bind(&challenge.loser_name)
        .bind(challenge.created_at)
        .bind(challenge.updated_at)
        .execute(self.pool)
        .await
        .map_err(|e| insert_error(challenge.challenge_id, e.into()))?;

        Ok(())
    }

    /// Overwrite every mutable column, only while the stored row is unexpired
    pub async fn update_unexpired(&self, challenge: &Challenge) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE challenges
            SET
                challenger = $2,
                challengee = $3,
                status = $4,
                completed_at = $5,
                expired = $6,
                winner_id = $7,
                winner_name = $8,
                loser_id = $9,
                loser_name = $10,
                updated_at = $11
            WHERE challenge_id = $1 AND expired = FALSE
            "#,
        )
        .bind(challenge.challenge_id)
        .bind(Json(&challenge.challenger))
        .bind(Json(&challenge.challengee))
        .bind(challenge.status.as_str())
        .bind(challenge.completed_at)
        .bind(challenge.expired)
        .bind(challenge.winner_id)
        .bind(&challenge.winner_name)
        .bind(challenge.loser_id)
        .bind(&challenge.loser_name)
        .bind(challenge.updated_at)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Overwrite one opponent column of an unexpired challenge and return the row
    pub async fn update_side(
        &self,
        id: Uuid,
        side: Side,
        opponent: &Opponent,
        at: DateTime<Utc>,
    ) -> Result<Option<Challenge>> {
        let column = match side {
            Side::Challenger => "challenger",
            Side::Challengee => "challengee",
        };

        let row = sqlx::query_as::<_, ChallengeRow>(&format!(
            r#"
            UPDATE challenges
            SET {column} = $2, updated_at = $3
            WHERE challenge_id = $1 AND expired = FALSE
            RETURNING {CHALLENGE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Json(opponent))
        .bind(at)
        .fetch_optional(self.pool)
        .await?;

        row.map(Challenge::try_from).transpose()
    }

    /// Move the status forward if it currently equals `from`
    pub async fn transition_status(
        &self,
        id: Uuid,
        from: ChallengeStatus,
        to: ChallengeStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE challenges
            SET status = $3, updated_at = $4
            WHERE challenge_id = $1 AND status = $2 AND expired = FALSE
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(at)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a challenge by ID
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM challenges WHERE challenge_id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    /// Delete a challenge that has not been accepted yet
    pub async fn delete_pending(&self, id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM challenges WHERE challenge_id = $1 AND status = 'pending'")
                .bind(id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }
}
