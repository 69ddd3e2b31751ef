use sqlx::PgPool;

use crate::dto::user::UpsertUserRequest;
use crate::error::{Result, StorageError};
use crate::models::{Friend, User, UserSegment};

const USER_COLUMNS: &str = r#"
    user_id, first_name, last_name, full_name, photo, email, token,
    wins, losses, challenge_count, created_at, updated_at
"#;

pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(user)
    }

    pub async fn access_token(&self, id: i64) -> Result<String> {
        let token = sqlx::query_scalar::<_, String>("SELECT token FROM users WHERE user_id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(StorageError::NotFound)?;

        Ok(token)
    }

    /// Head-to-head tallies, most played opponents first
    pub async fn friends(&self, id: i64) -> Result<Vec<Friend>> {
        let friends = sqlx::query_as::<_, Friend>(
            r#"
            SELECT friend_id, full_name, photo, challenge_count, wins, losses
            FROM user_friends
            WHERE user_id = $1
            ORDER BY challenge_count DESC, friend_id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(friends)
    }

    pub async fn segments(&self, id: i64) -> Result<Vec<UserSegment>> {
        let segments = sqlx::query_as::<_, UserSegment>(
            r#"
            SELECT segment_id, name, activity_type, count
            FROM user_segments
            WHERE user_id = $1
            ORDER BY count DESC, segment_id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(segments)
    }

    /// Create the user or refresh its profile and token
    pub async fn upsert(&self, req: &UpsertUserRequest) -> Result<User> {
        let full_name = format!("{} {}", req.first_name, req.last_name);

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (user_id, first_name, last_name, full_name, photo, email, token)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE
            SET first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                full_name = EXCLUDED.full_name,
                photo = EXCLUDED.photo,
                email = EXCLUDED.email,
                token = EXCLUDED.token,
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(req.user_id)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(full_name.trim())
        .bind(&req.photo)
        .bind(&req.email)
        .bind(&req.token)
        .fetch_one(self.pool)
        .await?;

        Ok(user)
    }

    /// Count a win for `id` and against `opponent_id` in one transaction
    pub async fn increment_wins(&self, id: i64, opponent_id: i64) -> Result<()> {
        self.increment_result(id, opponent_id, true).await
    }

    /// Count a loss for `id` and against `opponent_id` in one transaction
    pub async fn increment_losses(&self, id: i64, opponent_id: i64) -> Result<()> {
        self.increment_result(id, opponent_id, false).await
    }

    async fn increment_result(&self, id: i64, opponent_id: i64, won: bool) -> Result<()> {
        let (wins, losses) = if won { (1, 0) } else { (0, 1) };
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET wins = wins + $2,
                losses = losses + $3,
                challenge_count = challenge_count + 1,
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(id)
        .bind(wins)
        .bind(losses)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        sqlx::query(
            r#"
            INSERT INTO user_friends (user_id, friend_id, full_name, photo, challenge_count, wins, losses)
            VALUES (
                $1, $2,
                (SELECT full_name FROM users WHERE user_id = $2),
                (SELECT photo FROM users WHERE user_id = $2),
                1, $3, $4
            )
            ON CONFLICT (user_id, friend_id) DO UPDATE
            SET challenge_count = user_friends.challenge_count + 1,
                wins = user_friends.wins + EXCLUDED.wins,
                losses = user_friends.losses + EXCLUDED.losses
            "#,
        )
        .bind(id)
        .bind(opponent_id)
        .bind(wins)
        .bind(losses)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Bump the per-segment attempt counter, creating it on first use
    pub async fn increment_segment_count(&self, id: i64, segment_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_segments (user_id, segment_id, name, activity_type, count)
            VALUES (
                $1, $2,
                (SELECT name FROM segments WHERE segment_id = $2),
                (SELECT activity_type FROM segments WHERE segment_id = $2),
                1
            )
            ON CONFLICT (user_id, segment_id) DO UPDATE
            SET count = user_segments.count + 1
            "#,
        )
        .bind(id)
        .bind(segment_id)
        .execute(self.pool)
        .await
        .map_err(|e| {
            let err = StorageError::from(e);
            if err.is_foreign_key_violation() {
                StorageError::NotFound
            } else {
                err
            }
        })?;

        Ok(())
    }
}
