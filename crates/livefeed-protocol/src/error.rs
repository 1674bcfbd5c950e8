//! Protocol error types.

use thiserror::Error;

/// A specialized `Result` type for protocol operations.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding protocol frames and payloads.
///
/// None of these are surfaced to session callers. The session logs them and drops the
/// offending frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The wire text was empty (or only line breaks).
    #[error("Empty frame")]
    EmptyFrame,

    /// The command line did not name a known command.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A MESSAGE frame arrived without a `destination` header.
    #[error("MESSAGE frame has no destination header")]
    MissingDestination,

    /// A MESSAGE frame arrived with no body, or an empty one.
    #[error("MESSAGE frame for {destination} has an empty body")]
    EmptyBody {
        /// The destination named by the frame.
        destination: String,
    },

    /// The text was neither a recognized frame nor a JSON notification.
    #[error("Unrecognized wire text: {0}")]
    Unrecognized(String),

    /// An entity key cannot be turned into a destination.
    #[error("Invalid entity key: {0:?}")]
    InvalidEntityKey(String),

    /// A request scope outside the closed set.
    #[error("Unknown request scope: {0}")]
    UnknownScope(String),

    /// A payload failed to serialize or deserialize.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
