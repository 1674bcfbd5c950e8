//! Transport error types.

use std::time::Duration;
use thiserror::Error;

use crate::config::LimitsConfig;

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Represents errors that can occur during transport operations.
///
/// Sessions treat every variant as a transport fault: the socket is considered gone and
/// the reconnection policy decides what happens next.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// Failed to establish a connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An established connection was lost.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Failed to send a message.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive a message.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Connection establishment timed out.
    #[error(
        "Connection timed out after {timeout:?}. If this is expected, increase the timeout with \
         `TimeoutConfig {{ connect: Duration::from_secs({}) }}`",
        timeout.as_secs().max(1) * 2
    )]
    ConnectionTimeout {
        /// The timeout duration that was exceeded
        timeout: Duration,
    },

    /// The transport was configured with invalid parameters.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The transport has no open socket.
    #[error("Transport is not connected")]
    NotConnected,

    /// Inbound message exceeds the configured maximum.
    #[error("Message size ({size} bytes) exceeds maximum allowed ({max} bytes)")]
    MessageTooLarge {
        /// The actual size of the message in bytes
        size: usize,
        /// The maximum allowed size in bytes
        max: usize,
    },
}

/// Validates that an inbound message size does not exceed the configured limit.
pub fn validate_message_size(size: usize, limits: &LimitsConfig) -> TransportResult<()> {
    if let Some(max) = limits.max_message_size
        && size > max
    {
        return Err(TransportError::MessageTooLarge { size, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_size_validation() {
        let limits = LimitsConfig::default();
        assert!(validate_message_size(1000, &limits).is_ok());
        assert_eq!(
            validate_message_size(2 * 1024 * 1024, &limits),
            Err(TransportError::MessageTooLarge {
                size: 2 * 1024 * 1024,
                max: 1024 * 1024
            })
        );
    }

    #[test]
    fn test_unlimited_config() {
        let limits = LimitsConfig::unlimited();
        assert!(validate_message_size(100 * 1024 * 1024, &limits).is_ok());
    }

    #[test]
    fn test_timeout_message_suggests_larger_value() {
        let err = TransportError::ConnectionTimeout {
            timeout: Duration::from_secs(5),
        };
        assert!(err.to_string().contains("Duration::from_secs(10)"));
    }
}
