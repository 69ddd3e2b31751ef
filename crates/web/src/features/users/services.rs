use sqlx::PgPool;
use storage::{dto::user::UserProfileResponse, error::Result, repository::user::UserRepository};

/// User record with per-opponent tallies and segment counters
pub async fn get_profile(pool: &PgPool, user_id: i64) -> Result<UserProfileResponse> {
    let repo = UserRepository::new(pool);

    let user = repo.find_by_id(user_id).await?;
    let friends = repo.friends(user_id).await?;
    let segments = repo.segments(user_id).await?;

    Ok(UserProfileResponse::new(user, friends, segments))
}
