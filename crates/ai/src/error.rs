//! Errors from the text-generation layer.

use neurocoach_core::ValidationError;
use neurocoach_progress::ProgressError;

/// Result alias for AI operations.
pub type Result<T> = std::result::Result<T, AiError>;

/// Errors that can occur while talking to the text-generation provider.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// No API key or endpoint configured
    #[error("text generation is not configured: {0}")]
    NotConfigured(String),

    /// Transport failure
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("provider returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Response did not contain the expected JSON
    #[error("could not parse response: {0}")]
    Parse(String),

    /// Provider answered but the answer is unusable
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Malformed request
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Applying the result failed
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

impl AiError {
    /// Whether the failure came from the provider and can be papered over
    /// with a fallback answer.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AiError::NotConfigured(_)
                | AiError::Http(_)
                | AiError::Status { .. }
                | AiError::Parse(_)
                | AiError::Upstream(_)
        )
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            AiError::Progress(err) => err.user_message(),
            AiError::Validation(err) => err.to_string(),
            _ => "The coach is unavailable right now. Please try again later.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        assert!(AiError::Parse("no json".into()).is_upstream());
        assert!(AiError::Status { status: 502, body: String::new() }.is_upstream());
        assert!(!AiError::Validation(ValidationError::EmptyMessage).is_upstream());
        assert!(!AiError::Progress(ProgressError::NotFound("goal".into())).is_upstream());
    }

    #[test]
    fn test_user_message_hides_provider_details() {
        let err = AiError::Status { status: 401, body: "invalid api key sk-123".into() };
        assert!(!err.user_message().contains("sk-123"));
    }
}
