use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A performance attempt on a segment as reported by the fitness provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EffortSummary {
    pub athlete_id: i64,
    pub start_date: DateTime<Utc>,
    /// Elapsed time in seconds
    pub elapsed_time: i32,
    pub average_cadence: Option<f64>,
    pub average_watts: Option<f64>,
    pub average_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
}
