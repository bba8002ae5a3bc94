//! Error Types

use thiserror::Error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Advisor error types
#[derive(Error, Debug)]
pub enum AdvisorError {
    /// Missing or blank credential, or an invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote endpoint answered with a non-success status
    #[error("Upstream error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    /// Completion or tool-call payload did not match the expected shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Analysis endpoint reported a status other than `succeeded`
    #[error("Analysis status: {0}")]
    AnalysisStatus(String),

    /// Provider unreachable (no status received)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Conversation used out of order
    #[error("Session error: {0}")]
    Session(String),

    /// Workflow event not allowed from the current state
    #[error("Invalid transition: {event} is not allowed from {from}")]
    InvalidTransition { from: String, event: String },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AdvisorError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_))
    }

    /// Convert to the single message shown at the view boundary
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(msg) => format!("The advisor is not configured: {msg}"),
            Self::Upstream { body, .. } => format!("The AI service returned an error: {body}"),
            Self::Protocol(msg) => format!("The AI service sent an unexpected response: {msg}"),
            Self::AnalysisStatus(status) => format!("Analysis status: {status}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::Session(msg) => msg.clone(),
            Self::InvalidTransition { .. } => "That action is not available right now.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AdvisorError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_message_keeps_raw_body() {
        let err = AdvisorError::Upstream {
            status: 401,
            body: r#"{"error":"invalid_api_key"}"#.into(),
        };
        assert!(err.user_message().contains("invalid_api_key"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unavailable_is_retryable() {
        assert!(AdvisorError::ProviderUnavailable("timeout".into()).is_retryable());
    }
}
