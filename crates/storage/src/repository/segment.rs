use sqlx::PgPool;

use crate::dto::segment::UpsertSegmentRequest;
use crate::error::{Result, StorageError};
use crate::models::Segment;

const SEGMENT_COLUMNS: &str = r#"
    segment_id, name, activity_type, distance, average_grade, maximum_grade,
    elevation_high, elevation_low, total_elevation_gain, climb_category,
    city, state, country, polyline, created_at, updated_at
"#;

/// Local cache of provider segments, keeps challenge creation off the rate limit
pub struct SegmentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SegmentRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Segment> {
        let segment = sqlx::query_as::<_, Segment>(&format!(
            "SELECT {SEGMENT_COLUMNS} FROM segments WHERE segment_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(segment)
    }

    pub async fn upsert(&self, req: &UpsertSegmentRequest) -> Result<Segment> {
        let segment = sqlx::query_as::<_, Segment>(&format!(
            r#"
            INSERT INTO segments (
                segment_id, name, activity_type, distance, average_grade, maximum_grade,
                elevation_high, elevation_low, total_elevation_gain, climb_category,
                city, state, country, polyline
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (segment_id) DO UPDATE
            SET name = EXCLUDED.name,
                activity_type = EXCLUDED.activity_type,
                distance = EXCLUDED.distance,
                average_grade = EXCLUDED.average_grade,
                maximum_grade = EXCLUDED.maximum_grade,
                elevation_high = EXCLUDED.elevation_high,
                elevation_low = EXCLUDED.elevation_low,
                total_elevation_gain = EXCLUDED.total_elevation_gain,
                climb_category = EXCLUDED.climb_category,
                city = EXCLUDED.city,
                state = EXCLUDED.state,
                country = EXCLUDED.country,
                polyline = EXCLUDED.polyline,
                updated_at = NOW()
            RETURNING {SEGMENT_COLUMNS}
            "#
        ))
        .bind(req.segment_id)
        .bind(&req.name)
        .bind(&req.activity_type)
        .bind(req.distance)
        .bind(req.average_grade)
        .bind(req.maximum_grade)
        .bind(req.elevation_high)
        .bind(req.elevation_low)
        .bind(req.total_elevation_gain)
        .bind(req.climb_category)
        .bind(&req.city)
        .bind(&req.state)
        .bind(&req.country)
        .bind(&req.polyline)
        .fetch_one(self.pool)
        .await?;

        Ok(segment)
    }
}
