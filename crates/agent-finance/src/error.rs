//! Error types for market-data operations

use thiserror::Error;

/// Market-data specific errors
#[derive(Debug, Error)]
pub enum FinanceError {
    /// Invalid ticker symbol provided
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// A tool argument is outside the accepted set
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable {
        /// Requested symbol
        symbol: String,
        /// What was missing
        reason: String,
    },

    /// Yahoo answered with an unexpected status
    #[error("Yahoo Finance API error: {0}")]
    ApiError(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error raised by the quote client
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for market-data operations
pub type Result<T> = std::result::Result<T, FinanceError>;

impl FinanceError {
    /// Convert into the agent error reported for the named tool
    ///
    /// Bad arguments are the model's mistake and stay `ProcessingFailed`;
    /// everything touching the data source becomes `ToolUnavailable`.
    pub fn into_tool_error(self, tool: &str) -> agent_core::Error {
        match self {
            Self::InvalidArgument(_) => agent_core::Error::ProcessingFailed(self.to_string()),
            Self::ConfigError(_) => agent_core::Error::InitializationFailed(self.to_string()),
            other => agent_core::Error::ToolUnavailable {
                tool: tool.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<yahoo_finance_api::YahooError> for FinanceError {
    fn from(err: yahoo_finance_api::YahooError) -> Self {
        FinanceError::YahooFinanceError(err.to_string())
    }
}

/// Convert FinanceError to agent_core::Error
impl From<FinanceError> for agent_core::Error {
    fn from(err: FinanceError) -> Self {
        err.into_tool_error("market_data")
    }
}
