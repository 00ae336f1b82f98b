//! Error types for agent-core

use agent_utils::ConfigError;
use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent operations
///
/// Three variants carry distinct policies:
/// - [`Error::MissingCredential`] aborts startup.
/// - [`Error::ToolUnavailable`] fails a single tool call; the run continues.
/// - [`Error::Backend`] ends the current dispatch.
#[derive(Error, Debug)]
pub enum Error {
    /// Agent initialization failed
    #[error("Agent initialization failed: {0}")]
    InitializationFailed(String),

    /// Agent processing failed
    #[error("Agent processing failed: {0}")]
    ProcessingFailed(String),

    /// A required credential is unset or empty
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// A tool could not reach its data source
    #[error("Tool '{tool}' unavailable: {reason}")]
    ToolUnavailable {
        /// Name of the failing tool
        tool: String,
        /// What went wrong
        reason: String,
    },

    /// The model backend was unreachable or rejected the request
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Whether this error must stop the current run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingCredential(_) | Self::Backend(_))
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingCredential { name } => Self::MissingCredential(name),
            other @ ConfigError::InvalidValue { .. } => {
                Self::InitializationFailed(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_conversion() {
        let err: Error = ConfigError::MissingCredential {
            name: "GEMINI_API_KEY".to_string(),
        }
        .into();
        assert!(matches!(err, Error::MissingCredential(ref name) if name == "GEMINI_API_KEY"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_tool_unavailable_is_not_fatal() {
        let err = Error::ToolUnavailable {
            tool: "get_company_news".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Tool 'get_company_news' unavailable: connection refused"
        );
    }

    #[test]
    fn test_framework_errors_are_not_fatal() {
        let invalid = ConfigError::InvalidValue {
            name: "AGENT_LOG_FORMAT".to_string(),
            reason: "expected 'text' or 'json'".to_string(),
        };
        let err = Error::from(invalid);
        assert!(matches!(err, Error::InitializationFailed(_)));
        assert!(!err.is_fatal());

        let err = Error::ProcessingFailed("Invalid parameters: missing field `symbol`".to_string());
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Agent processing failed: Invalid parameters: missing field `symbol`"
        );
    }
}
