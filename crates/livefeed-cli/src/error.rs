//! Error types for CLI operations

use thiserror::Error;

/// Result alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI-specific errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CliError {
    /// Transport could not be set up
    #[error("Transport error: {0}")]
    Transport(#[from] livefeed::TransportError),

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The session never completed the handshake
    #[error("Not connected after {0:?}")]
    ConnectTimeout(std::time::Duration),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// User-facing hints for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Transport(_) => vec![
                "Verify the URL uses ws:// or wss://",
                "Set LIVEFEED_URL or pass --url",
            ],
            Self::ConnectTimeout(_) => vec![
                "Check that the feed server is reachable",
                "Increase --connect-timeout-secs",
                "Run with -vv to see handshake details",
            ],
            Self::InvalidArguments(_) => vec!["Run with --help for usage"],
            _ => Vec::new(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArguments(_) => 2,
            Self::ConnectTimeout(_) => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::InvalidArguments("x".into()).exit_code(), 2);
        assert_eq!(CliError::ConnectTimeout(Duration::from_secs(1)).exit_code(), 3);
        assert_eq!(
            CliError::Io(std::io::Error::other("boom")).exit_code(),
            1
        );
    }

    #[test]
    fn test_suggestions() {
        assert!(!CliError::ConnectTimeout(Duration::from_secs(1)).suggestions().is_empty());
        assert!(CliError::Io(std::io::Error::other("boom")).suggestions().is_empty());
    }
}
