use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Cached route segment description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Segment {
    pub segment_id: i64,
    pub name: String,
    pub activity_type: String,
    pub distance: f64,
    pub average_grade: f64,
    pub maximum_grade: f64,
    pub elevation_high: f64,
    pub elevation_low: f64,
    pub total_elevation_gain: f64,
    pub climb_category: i32,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub polyline: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
