use storage::gateway::ProviderError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StravaError>;

#[derive(Error, Debug)]
pub enum StravaError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Strava rate limit exceeded")]
    RateLimited,

    #[error("Strava rejected the access token")]
    Unauthorized,

    #[error("Strava answered with status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

impl From<StravaError> for ProviderError {
    fn from(err: StravaError) -> Self {
        match err {
            StravaError::RateLimited => ProviderError::RateLimited,
            StravaError::Unauthorized => ProviderError::Unauthorized,
            StravaError::UnexpectedStatus { status, .. } => ProviderError::UnexpectedStatus(status),
            StravaError::ParseError(e) => ProviderError::Decode(e.to_string()),
            StravaError::RequestError(e) if e.is_decode() => ProviderError::Decode(e.to_string()),
            other => ProviderError::Request(other.to_string()),
        }
    }
}
