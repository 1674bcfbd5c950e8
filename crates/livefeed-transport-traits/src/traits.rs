//! Core transport traits.

use std::fmt;

use crate::error::TransportResult;
use crate::events::TransportEvents;
use crate::types::TransportType;

/// A factory that opens sockets on behalf of a session.
///
/// `open` must not block and must not emit events before it returns. It starts the
/// connection attempt and returns a handle right away; progress is reported through
/// `events`:
///
/// - exactly one of `Opened` or `Closed`/`Error` for the attempt itself,
/// - then any number of `Message` events,
/// - then `Closed` (optionally preceded by `Error`) when the socket goes away.
///
/// An `Err` from `open` means the attempt could not even be started. The session treats
/// it like an immediate close.
pub trait TransportConnector: Send + Sync + fmt::Debug {
    /// Returns the type of transport this connector creates.
    fn transport_type(&self) -> TransportType;

    /// Returns the endpoint address or identifier.
    fn endpoint(&self) -> String;

    /// Starts opening a new socket.
    fn open(&self, events: TransportEvents) -> TransportResult<Box<dyn TransportHandle>>;
}

/// One socket, owned exclusively by a session.
///
/// Dropping the handle must release the socket.
pub trait TransportHandle: Send + Sync + fmt::Debug {
    /// Queues one text message for sending.
    fn send(&self, text: String) -> TransportResult<()>;

    /// Closes the socket. No further events should be emitted for it, and none may be
    /// emitted from within this call.
    fn close(&self);
}
