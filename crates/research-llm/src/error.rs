//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur while talking to the hosted model
#[derive(Error, Debug)]
pub enum LLMError {
    /// Non-success HTTP status not covered below
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown model or Azure deployment
    #[error("Model or deployment not found: {0}")]
    ModelNotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Transport failure: connection refused, timeout, TLS
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<LLMError> for research_core::Error {
    fn from(err: LLMError) -> Self {
        use research_core::Error;

        match err {
            LLMError::ConfigurationError(msg) => Error::Configuration(msg),
            LLMError::AuthenticationFailed => Error::Configuration(err.to_string()),
            LLMError::RequestFailed(_)
            | LLMError::RateLimitExceeded(_)
            | LLMError::HttpError(_)
            | LLMError::ModelNotFound(_) => Error::ServiceUnavailable(err.to_string()),
            LLMError::InvalidRequest(_)
            | LLMError::SerializationError(_)
            | LLMError::UnexpectedResponse(_) => Error::ProcessingFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_to_core_error() {
        let err: research_core::Error = LLMError::RateLimitExceeded("slow down".into()).into();
        assert_eq!(err.kind(), "ServiceUnavailable");

        let err: research_core::Error = LLMError::RequestFailed("HTTP 503".into()).into();
        assert_eq!(err.kind(), "ServiceUnavailable");

        let err: research_core::Error = LLMError::AuthenticationFailed.into();
        assert_eq!(err.kind(), "ConfigurationError");

        let err: research_core::Error = LLMError::UnexpectedResponse("no choices".into()).into();
        assert_eq!(err.kind(), "ProcessingFailed");
    }
}
