//! Errors surfaced by the progress model.

use neurocoach_core::{GoalId, GoalStatus, SessionId, ValidationError};
use neurocoach_storage::StorageError;

/// Result alias for progress operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors that can occur while applying a change to a goal.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// Malformed input
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Referenced goal, subgoal or session does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Status change the lifecycle does not allow
    #[error("goal {goal_id} cannot go from {from} to {to}")]
    InvalidTransition {
        /// Goal
        goal_id: GoalId,
        /// Current status
        from: GoalStatus,
        /// Requested status
        to: GoalStatus,
    },

    /// Archived goals are read-only
    #[error("goal {0} is archived")]
    Archived(GoalId),

    /// Completed goals keep 100% until reopened
    #[error("goal {0} is completed; reopen it before setting progress")]
    ReopenRequired(GoalId),

    /// Messages cannot be added to a finished session
    #[error("session {0} is already completed")]
    SessionClosed(SessionId),

    /// The storage backend failed
    #[error("persistence error: {0}")]
    Persistence(StorageError),
}

impl From<StorageError> for ProgressError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => ProgressError::NotFound(what),
            other => ProgressError::Persistence(other),
        }
    }
}

impl ProgressError {
    /// Message suitable for showing to the user.
    ///
    /// Storage failures are reported generically; their details go to the log.
    pub fn user_message(&self) -> String {
        match self {
            ProgressError::Persistence(_) => {
                "Could not save your changes. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_not_found_maps_to_not_found() {
        let err: ProgressError = StorageError::NotFound("goal 1".into()).into();
        assert!(matches!(err, ProgressError::NotFound(_)));
        assert_eq!(err.user_message(), "goal 1 not found");
    }

    #[test]
    fn test_persistence_message_is_generic() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: ProgressError = StorageError::Io(io).into();
        assert!(matches!(err, ProgressError::Persistence(_)));
        assert!(!err.user_message().contains("disk"));
    }

    #[test]
    fn test_validation_message_is_specific() {
        let err: ProgressError = ValidationError::ProgressOutOfRange(140).into();
        assert_eq!(err.user_message(), "progress must be between 0 and 100, got 140");
    }
}
