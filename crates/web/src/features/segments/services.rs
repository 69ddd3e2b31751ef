use sqlx::PgPool;
use storage::models::{EffortSummary, Segment};
use storage::repository::{segment::SegmentRepository, user::UserRepository};
use strava::StravaClient;

use crate::error::{WebError, WebResult};

pub async fn get_segment(pool: &PgPool, segment_id: i64) -> WebResult<Segment> {
    Ok(SegmentRepository::new(pool).find_by_id(segment_id).await?)
}

/// Fetch the segment from Strava and upsert it into the local cache
pub async fn refresh_segment(
    pool: &PgPool,
    client: &StravaClient,
    access_token: Option<&str>,
    segment_id: i64,
) -> WebResult<Segment> {
    let token = access_token.ok_or_else(|| {
        WebError::ServiceUnavailable("Strava access token is not configured".to_string())
    })?;

    let detailed = client.segment(token, segment_id).await?;
    let cached = SegmentRepository::new(pool).upsert(&detailed.into()).await?;

    tracing::info!(segment_id, name = %cached.name, "Segment cache refreshed");
    Ok(cached)
}

/// All of a registered athlete's efforts on a segment, fetched with their own token
pub async fn athlete_efforts(
    pool: &PgPool,
    client: &StravaClient,
    segment_id: i64,
    user_id: i64,
) -> WebResult<Vec<EffortSummary>> {
    let token = UserRepository::new(pool).access_token(user_id).await?;

    let efforts = client.athlete_efforts(&token, segment_id, user_id).await?;

    tracing::debug!(segment_id, user_id, count = efforts.len(), "Listed athlete efforts");
    Ok(efforts.iter().map(EffortSummary::from).collect())
}
