//! Error types for the tool layer.

use thiserror::Error;

/// Errors raised by the registry and the HIS client.
///
/// Only [`ToolError::NotFound`] leaves the registry as an error. Transport
/// variants are produced by [`crate::his::HisClient`] and folded into
/// `ToolResult::Error` by the HIS tools.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolError {
    /// No tool is registered under this name.
    #[error("Unknown tool: '{0}'")]
    NotFound(String),

    /// Connection failure, timeout or other transport problem.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The HIS answered with a non-2xx status.
    #[error("HIS returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The HIS answered 2xx with a body that is not JSON.
    #[error("Invalid JSON in HIS response: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The configured base URL or an endpoint path does not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = ToolError::Status {
            status: 503,
            body: "maintenance".into(),
        };
        assert_eq!(err.to_string(), "HIS returned HTTP 503: maintenance");
    }
}
