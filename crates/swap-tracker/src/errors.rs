use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SwapTrackerError {
    #[error("swap tracker used before init")]
    NotInitialized,

    #[error("swap tracker unavailable: {0}")]
    Unavailable(String),

    #[error("invalid swap tracker url: {0}")]
    InvalidUrl(String),

    #[error("http: {0}")]
    Http(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed swap record: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for SwapTrackerError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value.to_string())
    }
}
