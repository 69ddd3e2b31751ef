use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::EffortSummary;

/// One side's performance snapshot inside a challenge.
///
/// The elapsed time and the physiological averages stay empty until a
/// qualifying effort has been ingested for this athlete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Opponent {
    pub id: i64,
    pub name: String,
    pub photo: Option<String>,
    pub completed: bool,
    /// Elapsed time in seconds
    pub time: Option<i32>,
    pub average_cadence: Option<f64>,
    pub average_watts: Option<f64>,
    pub average_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
}

impl Opponent {
    pub fn new(id: i64, name: impl Into<String>, photo: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            photo,
            completed: false,
            time: None,
            average_cadence: None,
            average_watts: None,
            average_heart_rate: None,
            max_heart_rate: None,
        }
    }

    /// Overwrite the performance fields with the given effort and mark this side complete.
    pub fn record_effort(&mut self, effort: &EffortSummary) {
        self.time = Some(effort.elapsed_time);
        self.average_cadence = effort.average_cadence;
        self.average_watts = effort.average_watts;
        self.average_heart_rate = effort.average_heart_rate;
        self.max_heart_rate = effort.max_heart_rate;
        self.completed = true;
    }
}
