use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storage::dto::segment::UpsertSegmentRequest;
use storage::dto::user::UpsertUserRequest;
use storage::models::EffortSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthleteRef {
    pub id: i64,
}

/// One recorded attempt of an athlete on a segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEffort {
    pub id: i64,
    pub athlete: AthleteRef,
    #[serde(default)]
    pub name: Option<String>,
    pub elapsed_time: i32,
    #[serde(default)]
    pub moving_time: Option<i32>,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub average_cadence: Option<f64>,
    #[serde(default)]
    pub average_watts: Option<f64>,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
}

impl From<&SegmentEffort> for EffortSummary {
    fn from(effort: &SegmentEffort) -> Self {
        Self {
            athlete_id: effort.athlete.id,
            start_date: effort.start_date,
            elapsed_time: effort.elapsed_time,
            average_cadence: effort.average_cadence,
            average_watts: effort.average_watts,
            average_heart_rate: effort.average_heartrate,
            max_heart_rate: effort.max_heartrate,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolylineMap {
    #[serde(default)]
    pub polyline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDetailed {
    pub id: i64,
    pub name: String,
    pub activity_type: String,
    pub distance: f64,
    pub average_grade: f64,
    pub maximum_grade: f64,
    pub elevation_high: f64,
    pub elevation_low: f64,
    #[serde(default)]
    pub total_elevation_gain: f64,
    #[serde(default)]
    pub climb_category: i32,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub map: Option<PolylineMap>,
}

impl From<SegmentDetailed> for UpsertSegmentRequest {
    fn from(segment: SegmentDetailed) -> Self {
        Self {
            segment_id: segment.id,
            name: segment.name,
            activity_type: segment.activity_type,
            distance: segment.distance,
            average_grade: segment.average_grade,
            maximum_grade: segment.maximum_grade,
            elevation_high: segment.elevation_high,
            elevation_low: segment.elevation_low,
            total_elevation_gain: segment.total_elevation_gain,
            climb_category: segment.climb_category,
            city: segment.city,
            state: segment.state,
            country: segment.country,
            polyline: segment.map.and_then(|m| m.polyline),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthleteDetailed {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl AthleteDetailed {
    /// Registration payload storing `token` as the user's access credential.
    pub fn into_upsert(self, token: impl Into<String>) -> UpsertUserRequest {
        UpsertUserRequest {
            user_id: self.id,
            first_name: self.firstname,
            last_name: self.lastname,
            photo: self.profile,
            email: self.email,
            token: token.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effort_conversion() {
        let json = r#"{
            "id": 123456,
            "athlete": { "id": 227615, "resource_state": 1 },
            "name": "Hawk Hill",
            "elapsed_time": 3500,
            "moving_time": 3480,
            "start_date": "2024-01-05T07:00:00Z",
            "start_date_local": "2024-01-04T23:00:00Z",
            "average_cadence": 88.5,
            "average_watts": 242.0,
            "average_heartrate": 161.2
        }"#;

        let effort: SegmentEffort = serde_json::from_str(json).unwrap();
        let summary = EffortSummary::from(&effort);

        assert_eq!(summary.athlete_id, 227615);
        assert_eq!(summary.elapsed_time, 3500);
        assert_eq!(summary.start_date.to_rfc3339(), "2024-01-05T07:00:00+00:00");
        assert_eq!(summary.average_heart_rate, Some(161.2));
        assert_eq!(summary.max_heart_rate, None);
    }

    #[test]
    fn test_segment_conversion_keeps_polyline() {
        let json = r#"{
            "id": 229781,
            "name": "Hawk Hill",
            "activity_type": "Ride",
            "distance": 2684.82,
            "average_grade": 5.7,
            "maximum_grade": 14.2,
            "elevation_high": 245.3,
            "elevation_low": 92.4,
            "total_elevation_gain": 154.5,
            "climb_category": 1,
            "city": "San Francisco",
            "state": "CA",
            "country": "United States",
            "map": { "id": "s229781", "polyline": "}g|eFnpqjVl@En@Md@" }
        }"#;

        let segment: SegmentDetailed = serde_json::from_str(json).unwrap();
        let upsert = UpsertSegmentRequest::from(segment);

        assert_eq!(upsert.segment_id, 229781);
        assert_eq!(upsert.climb_category, 1);
        assert_eq!(upsert.polyline.as_deref(), Some("}g|eFnpqjVl@En@Md@"));
    }

    #[test]
    fn test_athlete_registration_payload() {
        let athlete = AthleteDetailed {
            id: 227615,
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
            profile: Some("https://example.org/ada.jpg".to_string()),
            email: None,
        };

        let upsert = athlete.into_upsert("abc123");

        assert_eq!(upsert.user_id, 227615);
        assert_eq!(upsert.token, "abc123");
        assert_eq!(upsert.photo.as_deref(), Some("https://example.org/ada.jpg"));
    }
}
