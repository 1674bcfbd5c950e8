//! # livefeed protocol
//!
//! Wire-level building blocks for the livefeed real-time channel: a simplified STOMP-style
//! text framing, the destination templates topics are derived from, and the JSON payloads
//! delivered on them.
//!
//! ## Usage
//!
//! ```rust
//! use livefeed_protocol::{Destination, EntityKey, Frame, Inbound, decode};
//!
//! let account = EntityKey::new("ACC1").unwrap();
//! let destination = Destination::AccountUpdates(account);
//!
//! let wire = Frame::subscribe(1, &destination.to_string()).encode();
//! assert!(wire.starts_with("SUBSCRIBE\n"));
//!
//! let inbound = decode("MESSAGE\ndestination:/account/ACC1/updates\n\n{}\0");
//! assert!(matches!(inbound, Some(Inbound::Message(_))));
//! ```
//!
//! The codec does not implement transactions, acknowledgements, heart-beats or receipts.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

mod destination;
mod error;
mod frame;
mod types;

pub use destination::{Destination, EntityKey, TopicCategory};
pub use error::{ProtocolError, ProtocolResult};
pub use frame::{
    Command, DEFAULT_ACCEPT_VERSION, FRAME_TERMINATOR, Frame, Inbound, JSON_CONTENT_TYPE, decode,
    encode, split_frames, try_decode,
};
pub use types::{
    AccountEvent, AccountUpdate, Balance, LastTrade, MarketDepth, OrderState, Position,
    PriceLevel, RequestBody, RequestScope, RequestVerb, Side, Trade,
};
