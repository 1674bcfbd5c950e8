//! Core transport types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Enumerates the kinds of transports a session can run over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// WebSocket for full-duplex communication.
    WebSocket,
    /// In-process transport used by tests and embedders.
    Memory,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebSocket => write!(f, "websocket"),
            Self::Memory => write!(f, "memory"),
        }
    }
}
