use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Segment description as fetched from the provider, ready to be cached
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpsertSegmentRequest {
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
}
