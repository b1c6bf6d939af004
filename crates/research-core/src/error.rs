//! Error types for research-core

use thiserror::Error;

/// Result type alias for research operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for research operations
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid credentials/settings, fatal at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Hosted model or search provider unreachable or rate-limited
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A step produced no usable content
    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// Download requested before any run completed
    #[error("No report available yet. Run a research task first.")]
    NoReportAvailable,

    /// Rejected user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A run is already active for this session
    #[error("A research run is already in progress")]
    RunInProgress,

    /// The coordinator ran out of hand-offs before a report was produced
    #[error("Hand-off limit of {0} reached without a report")]
    HandOffLimitExceeded(usize),

    /// Agent initialization failed
    #[error("Agent initialization failed: {0}")]
    InitializationFailed(String),

    /// Agent processing failed
    #[error("Agent processing failed: {0}")]
    ProcessingFailed(String),
}

impl Error {
    /// Stable name of the error kind, shown to users and returned by the API
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::ServiceUnavailable(_) => "ServiceUnavailable",
            Self::EmptyResult(_) => "EmptyResult",
            Self::NoReportAvailable => "NoReportAvailable",
            Self::InvalidInput(_) => "InvalidInput",
            Self::RunInProgress => "RunInProgress",
            Self::HandOffLimitExceeded(_) => "HandOffLimitExceeded",
            Self::InitializationFailed(_) => "InitializationFailed",
            Self::ProcessingFailed(_) => "ProcessingFailed",
        }
    }
}

impl From<research_utils::ConfigError> for Error {
    fn from(err: research_utils::ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ServiceUnavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "Service unavailable: connection refused");
        assert_eq!(err.kind(), "ServiceUnavailable");

        assert_eq!(Error::NoReportAvailable.kind(), "NoReportAvailable");
        assert_eq!(
            Error::HandOffLimitExceeded(16).to_string(),
            "Hand-off limit of 16 reached without a report"
        );
    }

    #[test]
    fn test_config_error_conversion() {
        let err: Error = research_utils::ConfigError::Missing("TAVILY_API_KEY".to_string()).into();
        match err {
            Error::Configuration(msg) => assert!(msg.contains("TAVILY_API_KEY")),
            _ => panic!("Expected Configuration variant"),
        }
    }
}
