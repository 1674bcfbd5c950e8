//! # livefeed transport traits
//!
//! The seam between a livefeed session and the socket it runs over.
//!
//! ## Overview
//!
//! This crate defines:
//! - **Traits**: [`TransportConnector`] (opens sockets), [`TransportHandle`] (one open socket)
//! - **Events**: [`TransportEvent`], [`TransportEvents`], [`TransportEventHandler`]
//! - **Errors**: [`TransportError`], [`TransportResult`]
//! - **Config**: [`LimitsConfig`], [`TimeoutConfig`]
//!
//! Socket I/O is event driven: a connector starts an attempt and reports open, message,
//! error and close through a [`TransportEvents`] emitter tagged with a [`ConnectionId`].
//! The session never blocks on the socket.
//!
//! ```rust,ignore
//! use livefeed_transport_traits::{TransportConnector, TransportEvents, TransportHandle};
//!
//! #[derive(Debug)]
//! struct MyConnector { /* ... */ }
//!
//! impl TransportConnector for MyConnector {
//!     fn open(&self, events: TransportEvents) -> TransportResult<Box<dyn TransportHandle>> {
//!         // spawn the socket task, call events.opened() once it is up
//!     }
//!     // ...
//! }
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
mod error;
mod events;
mod traits;
mod types;

pub use config::{LimitsConfig, TimeoutConfig};
pub use error::{TransportError, TransportResult, validate_message_size};
pub use events::{ConnectionId, TransportEvent, TransportEventHandler, TransportEvents};
pub use traits::{TransportConnector, TransportHandle};
pub use types::TransportType;
