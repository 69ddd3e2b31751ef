use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Friend, User, UserSegment};

/// Profile data used to register or refresh a user
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertUserRequest {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub photo: Option<String>,
    pub email: Option<String>,
    pub token: String,
}

/// Response containing a user's record and challenge statistics
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfileResponse {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub photo: Option<String>,
    pub wins: i32,
    pub losses: i32,
    pub challenge_count: i32,
    pub friends: Vec<Friend>,
    pub segments: Vec<UserSegment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfileResponse {
    pub fn new(user: User, friends: Vec<Friend>, segments: Vec<UserSegment>) -> Self {
        Self {
            user_id: user.user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            full_name: user.full_name,
            photo: user.photo,
            wins: user.wins,
            losses: user.losses,
            challenge_count: user.challenge_count,
            friends,
            segments,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
