//! # livefeed
//!
//! Client for a real-time account and market-data feed. One socket carries every topic;
//! callbacks registered on a [`Session`] survive reconnects and are re-subscribed
//! automatically.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use livefeed::prelude::*;
//!
//! # async fn example() -> Result<(), TransportError> {
//! let session = livefeed::websocket_session("wss://feed.example.com/ws", SessionConfig::default())?;
//!
//! session.subscribe("ACC1", Arc::new(|update: &AccountUpdate| {
//!     if let AccountEvent::Balance(balance) = update.event() {
//!         println!("cash: {}", balance.cash);
//!     }
//! }));
//! session.subscribe_to_market_data(
//!     "BTC-USD",
//!     Arc::new(|depth: &MarketDepth| println!("best bid: {:?}", depth.best_bid())),
//!     Arc::new(|trade: &LastTrade| println!("last: {}", trade.price)),
//! );
//! session.start();
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | crate | contents |
//! |-------|----------|
//! | `livefeed-protocol` | frame codec, destinations, payload types |
//! | `livefeed-transport-traits` | the socket seam |
//! | `livefeed-client` | registry, router, reconnect policy, `Session` |
//! | `livefeed-websocket` | `tokio-tungstenite` transport (feature `websocket`) |

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::sync::Arc;

pub use livefeed_client::{
    AccountCallback, DepthCallback, LastTradeCallback, Listener, MarketCallback,
    NotificationCallback, ReconnectPolicy, RouteOutcome, Session, SessionConfig, SessionState,
    SubscriptionId, SubscriptionRegistry, router, testing,
};
pub use livefeed_protocol as protocol;
pub use livefeed_protocol::{
    AccountEvent, AccountUpdate, Balance, Destination, EntityKey, LastTrade, MarketDepth,
    OrderState, Position, PriceLevel, RequestScope, Side, Trade,
};
pub use livefeed_transport_traits::{
    TransportConnector, TransportError, TransportHandle, TransportResult, TransportType,
};

#[cfg(feature = "websocket")]
pub use livefeed_websocket::{WebSocketConfig, WebSocketConnector};

/// Creates a session that connects to `url` over WebSocket.
///
/// The session is idle; call [`Session::start`] or [`Session::connect`].
#[cfg(feature = "websocket")]
pub fn websocket_session(url: &str, config: SessionConfig) -> TransportResult<Session> {
    let connector = WebSocketConnector::new(WebSocketConfig::new(url))?;
    Ok(Session::new(config, Arc::new(connector)))
}

/// Creates a session over any connector.
pub fn session_with(
    connector: impl TransportConnector + 'static,
    config: SessionConfig,
) -> Session {
    Session::new(config, Arc::new(connector))
}

/// Convenient imports for applications.
pub mod prelude {
    pub use super::{
        AccountCallback, AccountEvent, AccountUpdate, Balance, DepthCallback, Destination,
        LastTrade, LastTradeCallback, MarketCallback, MarketDepth, OrderState, Position,
        ReconnectPolicy, RequestScope, Session, SessionConfig, SessionState, Trade,
        TransportError,
    };

    #[cfg(feature = "websocket")]
    pub use super::{WebSocketConfig, WebSocketConnector};

    pub use serde_json::Value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConnector;

    #[test]
    fn test_session_with_mock_connector() {
        let connector = MockConnector::new();
        let session = session_with(connector.clone(), SessionConfig::default());
        session.connect();
        connector.last_socket().unwrap().handshake();
        assert!(session.is_connected());
    }

    #[cfg(feature = "websocket")]
    #[test]
    fn test_websocket_session_rejects_bad_url() {
        assert!(websocket_session("http://example.com", SessionConfig::default()).is_err());
    }
}
