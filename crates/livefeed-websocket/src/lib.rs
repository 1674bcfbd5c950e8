//! # livefeed WebSocket transport
//!
//! [`WebSocketConnector`] opens sockets for a livefeed session over `tokio-tungstenite`
//! (`ws://` and `wss://`).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use livefeed_client::Session;
//! use livefeed_websocket::{WebSocketConfig, WebSocketConnector};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WebSocketConfig::new("wss://feed.example.com/ws")
//!     .with_connect_timeout(std::time::Duration::from_secs(5));
//! let session = Session::with_connector(Arc::new(WebSocketConnector::new(config)?));
//! session.connect();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! livefeed-websocket/
//! ├── config.rs     # WebSocketConfig and validation
//! ├── connector.rs  # TransportConnector / TransportHandle implementations
//! └── tasks.rs      # The per-socket reader/writer task
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

mod config;
mod connector;
mod tasks;

pub use config::WebSocketConfig;
pub use connector::WebSocketConnector;

// Re-export transport traits for convenience
pub use livefeed_transport_traits::{
    LimitsConfig, TimeoutConfig, TransportConnector, TransportError, TransportResult,
    TransportType,
};
