//! Configuration for the WebSocket transport.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use livefeed_transport_traits::{LimitsConfig, TimeoutConfig, TransportError, TransportResult};

/// Configuration for [`WebSocketConnector`](crate::WebSocketConnector)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSocketConfig {
    /// Endpoint to connect to (`ws://` or `wss://`)
    pub url: String,

    /// Connection timeouts
    pub timeouts: TimeoutConfig,

    /// Inbound message limits
    pub limits: LimitsConfig,

    /// Capacity of the outbound queue per socket
    pub outbound_buffer: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/ws".to_string(),
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
            outbound_buffer: 256,
        }
    }
}

impl WebSocketConfig {
    /// Create a configuration for `url` with default settings
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect = timeout;
        self
    }

    /// Set the timeout configuration
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the maximum inbound message size (`None` = unlimited)
    pub fn with_max_message_size(mut self, size: Option<usize>) -> Self {
        self.limits.max_message_size = size;
        self
    }

    /// Set the outbound queue capacity
    pub fn with_outbound_buffer(mut self, capacity: usize) -> Self {
        self.outbound_buffer = capacity;
        self
    }

    /// Check the configuration and return the parsed endpoint
    pub fn validate(&self) -> TransportResult<Url> {
        let url = Url::parse(&self.url).map_err(|e| {
            TransportError::ConfigurationError(format!("invalid url '{}': {e}", self.url))
        })?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(TransportError::ConfigurationError(format!(
                "unsupported scheme '{}', expected ws or wss",
                url.scheme()
            )));
        }

        if self.outbound_buffer == 0 {
            return Err(TransportError::ConfigurationError(
                "outbound_buffer must be at least 1".to_string(),
            ));
        }

        if self.timeouts.connect.is_zero() {
            return Err(TransportError::ConfigurationError(
                "connect timeout must be non-zero".to_string(),
            ));
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = WebSocketConfig::new("wss://feed.example.com/ws")
            .with_connect_timeout(Duration::from_secs(3))
            .with_max_message_size(Some(4096))
            .with_outbound_buffer(16);

        assert_eq!(config.url, "wss://feed.example.com/ws");
        assert_eq!(config.timeouts.connect, Duration::from_secs(3));
        assert_eq!(config.limits.max_message_size, Some(4096));
        assert_eq!(config.outbound_buffer, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        assert!(WebSocketConfig::new("not a url").validate().is_err());
        assert!(
            WebSocketConfig::new("http://feed.example.com")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let config = WebSocketConfig::new("ws://localhost:1").with_outbound_buffer(0);
        assert!(matches!(
            config.validate(),
            Err(TransportError::ConfigurationError(_))
        ));
    }
}
