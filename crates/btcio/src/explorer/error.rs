//! Error types for the block explorer client.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// The error type for errors produced by the explorer client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// No base URL was configured and the network has no public default.
    #[error("no explorer URL for network {0}")]
    MissingBaseUrl(String),

    #[error("Error parsing explorer response: {0}")]
    Parse(String),

    /// Body error, unlikely to be recoverable by retrying
    #[error("{0}")]
    Body(String),

    /// HTTP status error, not retryable
    #[error("Obtained failure status({0}): {1}")]
    Status(u16, String),

    /// Server-side or rate-limit status, retry might help
    #[error("Transient failure status({0})")]
    TransientStatus(u16),

    /// Error decoding the response, retry might not help
    #[error("Malformed Response: {0}")]
    MalformedResponse(String),

    /// Connection error, retry might help
    #[error("Could not connect: {0}")]
    Connection(String),

    /// Timeout error, retry might help
    #[error("Timeout")]
    Timeout,

    /// Redirect error, not retryable
    #[error("HttpRedirect: {0}")]
    HttpRedirect(String),

    /// Error building the request, unlikely to be recoverable
    #[error("Could not build request: {0}")]
    ReqBuilder(String),

    /// Maximum retries exceeded, not retryable
    #[error("Max retries {0} exceeded")]
    MaxRetriesExceeded(u8),

    /// General request error, retry might help
    #[error("Could not create request: {0}")]
    Request(String),

    /// Unknown error, unlikely to be recoverable
    #[error("{0}")]
    Other(String),
}

impl From<SerdeJsonError> for ClientError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Parse(format!("Could not parse {}", value))
    }
}
