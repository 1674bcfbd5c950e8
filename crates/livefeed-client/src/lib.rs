//! # livefeed client
//!
//! A client session for the livefeed real-time channel. One socket carries any number of
//! account and market topics; the session keeps track of who listens where, routes every
//! inbound message to the right callbacks and re-establishes everything after the socket
//! drops.
//!
//! ## Components
//!
//! - [`SubscriptionRegistry`]: destination → callbacks, plus the live subscription ids
//! - [`router::route`]: classifies an inbound MESSAGE and dispatches its payload
//! - [`ReconnectPolicy`]: exponential backoff and the retry limit
//! - [`Session`]: the connection state machine and the public API
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use livefeed_client::{AccountUpdate, Session, SessionState};
//! use livefeed_client::testing::MockConnector;
//!
//! let connector = MockConnector::new();
//! let session = Session::with_connector(Arc::new(connector.clone()));
//!
//! session.subscribe("ACC1", Arc::new(|update: &AccountUpdate| {
//!     println!("{update:?}");
//! }));
//! session.connect();
//!
//! connector.last_socket().unwrap().handshake();
//! assert_eq!(session.state(), SessionState::Connected);
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

mod config;
mod reconnect;
mod registry;
pub mod router;
mod session;
pub mod testing;

pub use config::SessionConfig;
pub use reconnect::ReconnectPolicy;
pub use registry::{
    AccountCallback, DepthCallback, LastTradeCallback, Listener, MarketCallback,
    SubscriptionId, SubscriptionRegistry,
};
pub use router::RouteOutcome;
pub use session::{NotificationCallback, Session, SessionState};

pub use livefeed_protocol::{
    AccountEvent, AccountUpdate, Balance, Destination, EntityKey, LastTrade, MarketDepth,
    OrderState, Position, PriceLevel, RequestScope, Side, Trade,
};
