//! Tournament error types.

use std::time::Duration;

use thiserror::Error;

use crate::bracket::BracketError;
use crate::db::timeouts::TimeoutError;
use crate::placement::PlacementError;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Malformed or out-of-bound arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The entity was already created (e.g. a second bracket build)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The request breaks a tournament rule
    #[error("Rule violation: {0}")]
    BusinessRuleViolation(String),

    /// Internal bracket invariant broken; not recoverable by the caller
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage call did not finish in time
    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),
}

impl TournamentError {
    /// Whether the error is an internal condition rather than bad input
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            TournamentError::InvariantViolation(_)
                | TournamentError::Database(_)
                | TournamentError::Timeout(_)
        )
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database errors and internal invariant failures are collapsed into a
    /// generic message; rule violations are safe to show.
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_) | TournamentError::InvariantViolation(_) => {
                "Internal server error".to_string()
            }
            TournamentError::Timeout(_) => "Service temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<TimeoutError> for TournamentError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => TournamentError::Timeout(duration),
            TimeoutError::Database(e) => TournamentError::Database(e),
        }
    }
}

impl From<BracketError> for TournamentError {
    fn from(err: BracketError) -> Self {
        TournamentError::InvalidInput(err.to_string())
    }
}

impl From<PlacementError> for TournamentError {
    fn from(err: PlacementError) -> Self {
        TournamentError::InvariantViolation(err.to_string())
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
