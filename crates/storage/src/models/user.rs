use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub photo: Option<String>,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub token: String,
    pub wins: i32,
    pub losses: i32,
    pub challenge_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Head-to-head tally of a user against one opponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Friend {
    pub friend_id: i64,
    pub full_name: Option<String>,
    pub photo: Option<String>,
    pub challenge_count: i32,
    pub wins: i32,
    pub losses: i32,
}

/// Number of resolved challenges a user has ridden on a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserSegment {
    pub segment_id: i64,
    pub name: Option<String>,
    pub activity_type: Option<String>,
    pub count: i32,
}
