use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use storage::error::StorageError;
use storage::services::ChallengeError;
use strava::StravaError;
use validator::ValidationErrors;

/// Web layer errors
#[derive(Debug)]
pub enum WebError {
    Storage(StorageError),
    Challenge(ChallengeError),
    Strava(StravaError),
    Validation(ValidationErrors),
    Unauthorized,
    ServiceUnavailable(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Challenge(e) => write!(f, "{}", e),
            Self::Strava(e) => write!(f, "Strava error: {}", e),
            Self::Validation(e) => write!(f, "Validation error: {}", e),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

fn storage_status(error: &StorageError) -> StatusCode {
    match error {
        StorageError::NotFound => StatusCode::NOT_FOUND,
        StorageError::ConstraintViolation(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl WebError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Storage(e) => storage_status(e),
            Self::Challenge(e) => match e {
                ChallengeError::NotFound(_) => StatusCode::NOT_FOUND,
                ChallengeError::InvalidParticipant { .. }
                | ChallengeError::InvalidWindow(_)
                | ChallengeError::InvalidTransition(_)
                | ChallengeError::Validation(_) => StatusCode::BAD_REQUEST,
                ChallengeError::AlreadyResolved(_) => StatusCode::CONFLICT,
                ChallengeError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ChallengeError::PersistenceFailure(e) => storage_status(e),
                ChallengeError::Interrupted(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Strava(StravaError::UnexpectedStatus { status: 404, .. }) => {
                StatusCode::NOT_FOUND
            }
            Self::Strava(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let body = match &self {
            Self::Validation(errors) => {
                let field_errors: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errors)| {
                        errors.iter().map(move |e| {
                            format!(
                                "{}: {}",
                                field,
                                e.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| e.code.to_string())
                            )
                        })
                    })
                    .collect();

                json!({
                    "error": "Validation failed",
                    "details": field_errors
                })
            }
            Self::Storage(StorageError::NotFound) => json!({ "error": "Resource not found" }),
            Self::Storage(StorageError::ConstraintViolation(msg)) => json!({ "error": msg }),
            _ if status_code == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self, "Request failed");
                json!({ "error": "An internal error occurred" })
            }
            Self::Strava(_) if status_code == StatusCode::NOT_FOUND => {
                json!({ "error": "Resource not found on Strava" })
            }
            Self::Strava(e) => {
                tracing::warn!(error = %e, "Strava request failed");
                json!({ "error": "Strava is unavailable, try again later" })
            }
            Self::Challenge(e) => {
                if status_code == StatusCode::SERVICE_UNAVAILABLE {
                    tracing::warn!(error = %e, "Upstream provider failed");
                }
                json!({ "error": e.to_string() })
            }
            Self::ServiceUnavailable(msg) => json!({ "error": msg }),
            Self::Unauthorized => json!({ "error": "Unauthorized" }),
            Self::Storage(e) => json!({ "error": e.to_string() }),
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<StorageError> for WebError {
    fn from(error: StorageError) -> Self {
        Self::Storage(error)
    }
}

impl From<ChallengeError> for WebError {
    fn from(error: ChallengeError) -> Self {
        Self::Challenge(error)
    }
}

impl From<StravaError> for WebError {
    fn from(error: StravaError) -> Self {
        Self::Strava(error)
    }
}

impl From<ValidationErrors> for WebError {
    fn from(error: ValidationErrors) -> Self {
        Self::Validation(error)
    }
}

pub type WebResult<T> = Result<T, WebError>;
