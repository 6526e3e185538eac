//! Error types for the language-model client.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Error body returned by OpenAI-compatible servers.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    /// The error detail object.
    pub error: ErrorDetail,
}

/// Detailed error information from the server.
#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    /// The error message text.
    pub message: String,
}

/// Errors that can occur when talking to the language-model endpoint.
///
/// The reasoning step treats every variant the same way (the model is
/// unavailable) but the distinction is kept for logging.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Network or HTTP request failure.
    ///
    /// Connection refused, DNS failure, or the configured timeout elapsed.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Middleware layer error.
    ///
    /// Raised by the retry middleware once it gives up.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// API authentication failure (HTTP 401).
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Rate limit exceeded (HTTP 429).
    #[error("Rate limit exceeded: {retry_after:?}")]
    RateLimitError {
        /// Suggested wait time before retrying, if provided by the server.
        retry_after: Option<Duration>,
    },

    /// Client configuration issue.
    ///
    /// Invalid base URL or timeout settings.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected or malformed response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The model server is down or failing (5xx).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Any other non-2xx answer.
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Temperature parameter out of valid range.
    #[error("Temperature must be between 0.0 & 2.0")]
    InvalidTemperature,
}
