use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("http: {0}")]
    Http(String),

    /// The backend answered with an `Error` envelope.
    #[error("backend error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Non-success HTTP status without a readable envelope, e.g. a proxy
    /// error page.
    #[error("unexpected http status {0}")]
    Status(u16),

    /// A success status whose body is not an envelope.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// The envelope was fine but its record does not decode.
    #[error("malformed record: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value.to_string())
    }
}
