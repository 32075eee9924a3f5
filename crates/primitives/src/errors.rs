//! Errors during parsing of primitives.

use thiserror::Error;

/// Parsing errors for identifiers received from the backend or the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The deposit id is not valid hex.
    #[error("deposit id is not valid hex: {0}")]
    InvalidHex(String),

    /// The deposit id does not decode to 32 bytes.
    #[error("deposit id must be 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("unknown bitcoin network '{0}'")]
    UnknownNetwork(String),
}
