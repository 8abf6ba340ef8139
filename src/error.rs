use thiserror::Error;
use warp::http::StatusCode;

/// Custom error types for the duel arena server
#[derive(Debug, Error)]
pub enum DuelError {
    /// Malformed input, rejected before any external call
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Action is not valid for the duel's current status
    #[error("Invalid state for this action: {0}")]
    StateConflict(String),

    /// Judge polling budget exhausted without a terminal verdict
    #[error("Judging timed out: {0}")]
    ExecutionTimeout(String),

    /// Call to the external execution engine failed
    #[error("Execution engine error: {0}")]
    Execution(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Failed to serialize message: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results using DuelError
pub type Result<T> = std::result::Result<T, DuelError>;

impl DuelError {
    /// Helper to create Validation errors with context
    pub fn validation(msg: impl Into<String>) -> Self {
        DuelError::Validation(msg.into())
    }

    /// Helper to create NotFound errors with context
    pub fn not_found(msg: impl Into<String>) -> Self {
        DuelError::NotFound(msg.into())
    }

    /// Helper to create Internal errors with context
    pub fn internal(msg: impl Into<String>) -> Self {
        DuelError::Internal(msg.into())
    }

    /// Helper to create Execution errors with context
    pub fn execution(msg: impl Into<String>) -> Self {
        DuelError::Execution(msg.into())
    }

    /// HTTP status class for the API boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            DuelError::Validation(_) => StatusCode::BAD_REQUEST,
            DuelError::NotFound(_) => StatusCode::NOT_FOUND,
            DuelError::StateConflict(_) => StatusCode::CONFLICT,
            DuelError::ExecutionTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            DuelError::Auth(_) => StatusCode::UNAUTHORIZED,
            DuelError::Execution(_)
            | DuelError::SerializationFailed(_)
            | DuelError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl warp::reject::Reject for DuelError {}

/// Convert reqwest::Error to DuelError
impl From<reqwest::Error> for DuelError {
    fn from(err: reqwest::Error) -> Self {
        DuelError::Execution(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DuelError::NotFound("Duel abc123".to_string());
        assert_eq!(err.to_string(), "Duel abc123 not found");
    }

    #[test]
    fn test_error_helpers() {
        let err = DuelError::validation("difficulty must be easy, medium or hard");
        assert!(matches!(err, DuelError::Validation(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            DuelError::Auth("missing credential".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DuelError::StateConflict("duel already decided".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DuelError::ExecutionTimeout("polling budget exhausted".into()).status_code(),
            StatusCode::REQUEST_TIMEOUT
        );
    }
}
