//! SMD client errors

use thiserror::Error;

/// Errors that can occur when interacting with the SMD API
#[derive(Debug, Error)]
pub enum SmdError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SMD returned a non-success status
    #[error("SMD API error: {0}")]
    Api(String),

    /// Response body was not the expected JSON
    #[error("error decoding response body: {source} - Response (first 500 chars): {body}")]
    Serialization {
        source: serde_json::Error,
        body: String,
    },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Client could not be constructed from the given settings
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
