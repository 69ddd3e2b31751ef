use thiserror::Error;
use uuid::Uuid;

use crate::error::StorageError;
use crate::gateway::ProviderError;

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Athlete {athlete_id} is not part of challenge {challenge_id}")]
    InvalidParticipant { challenge_id: Uuid, athlete_id: i64 },

    #[error("Upstream provider unavailable: {0}")]
    UpstreamUnavailable(#[from] ProviderError),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[source] StorageError),

    #[error("Challenge {0} has already been resolved")]
    AlreadyResolved(Uuid),

    #[error("Invalid challenge window: {0}")]
    InvalidWindow(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resolution of challenge {0} was interrupted")]
    Interrupted(Uuid),
}

pub type Result<T> = std::result::Result<T, ChallengeError>;

impl ChallengeError {
    /// Map a storage error, naming the missing entity on `NotFound`.
    pub fn storage(what: impl Into<String>) -> impl FnOnce(StorageError) -> ChallengeError {
        let what = what.into();
        move |err| match err {
            StorageError::NotFound => ChallengeError::NotFound(what),
            other => ChallengeError::PersistenceFailure(other),
        }
    }

    /// Whether re-invoking the operation later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChallengeError::UpstreamUnavailable(_) | ChallengeError::PersistenceFailure(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_mapping() {
        let err = ChallengeError::storage("Challenge 7")(StorageError::NotFound);
        assert!(matches!(&err, ChallengeError::NotFound(what) if what == "Challenge 7"));
        assert!(!err.is_retryable());

        let err = ChallengeError::storage("Challenge 7")(StorageError::Corrupt("bad".into()));
        assert!(matches!(err, ChallengeError::PersistenceFailure(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_upstream_is_retryable() {
        let err = ChallengeError::from(ProviderError::RateLimited);
        assert!(err.is_retryable());
        assert!(!ChallengeError::AlreadyResolved(Uuid::nil()).is_retryable());
    }
}
