//! Session configuration.

use std::time::Duration;

use livefeed_protocol::DEFAULT_ACCEPT_VERSION;
use serde::{Deserialize, Serialize};

use crate::reconnect::ReconnectPolicy;

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Value of the `accept-version` header sent with CONNECT.
    pub accept_version: String,
    /// Automatic reconnection settings.
    pub reconnect: ReconnectPolicy,
    /// Delay applied by [`Session::start`](crate::Session::start) before the first connect.
    pub initial_connect_delay: Option<Duration>,
    /// How long to wait for CONNECTED after the socket opens. `None` waits indefinitely.
    pub handshake_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            accept_version: DEFAULT_ACCEPT_VERSION.to_string(),
            reconnect: ReconnectPolicy::default(),
            initial_connect_delay: None,
            handshake_timeout: None,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with the default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the protocol version advertised in CONNECT
    pub fn with_accept_version(mut self, version: impl Into<String>) -> Self {
        self.accept_version = version.into();
        self
    }

    /// Set the reconnection policy
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Defer the first connect made by `Session::start`
    pub fn with_initial_connect_delay(mut self, delay: Duration) -> Self {
        self.initial_connect_delay = Some(delay);
        self
    }

    /// Treat the socket as lost if CONNECTED has not arrived within `timeout`
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }
}
