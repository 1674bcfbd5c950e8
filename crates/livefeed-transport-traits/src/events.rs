//! Transport event types.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::TransportError;

/// Identifies one socket opened on behalf of a session.
///
/// Sessions hand out a fresh id for every open so that late events from a socket they have
/// already given up on can be recognized and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Represents events that occur within a socket's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket is open and ready to carry frames.
    Opened,

    /// One inbound text message.
    Message(String),

    /// The socket reported an error. A `Closed` event may or may not follow.
    Error(TransportError),

    /// The socket is closed.
    Closed {
        /// An optional reason for the closure.
        reason: Option<String>,
    },
}

/// Receiver of transport events.
pub trait TransportEventHandler: Send + Sync {
    /// Handle one event from `connection`.
    fn on_transport_event(&self, connection: ConnectionId, event: TransportEvent);
}

/// Emitter a transport uses to report events back to its owner.
///
/// Holds only a weak reference to the handler, so a socket task that outlives its session
/// emits into the void instead of keeping the session alive.
#[derive(Clone)]
pub struct TransportEvents {
    connection: ConnectionId,
    handler: Weak<dyn TransportEventHandler>,
}

impl TransportEvents {
    /// Creates an emitter for `connection` delivering to `handler`.
    pub fn new(connection: ConnectionId, handler: Weak<dyn TransportEventHandler>) -> Self {
        Self {
            connection,
            handler,
        }
    }

    /// Creates an emitter from a strong handler reference.
    pub fn from_handler(connection: ConnectionId, handler: &Arc<dyn TransportEventHandler>) -> Self {
        Self::new(connection, Arc::downgrade(handler))
    }

    /// The connection these events belong to.
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Whether the receiving side still exists.
    pub fn is_attached(&self) -> bool {
        self.handler.strong_count() > 0
    }

    /// Emits an event. Returns `false` if the handler is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        match self.handler.upgrade() {
            Some(handler) => {
                handler.on_transport_event(self.connection, event);
                true
            }
            None => false,
        }
    }

    /// Emits an `Opened` event.
    pub fn opened(&self) -> bool {
        self.emit(TransportEvent::Opened)
    }

    /// Emits a `Message` event.
    pub fn message(&self, text: impl Into<String>) -> bool {
        self.emit(TransportEvent::Message(text.into()))
    }

    /// Emits an `Error` event.
    pub fn error(&self, error: TransportError) -> bool {
        self.emit(TransportEvent::Error(error))
    }

    /// Emits a `Closed` event.
    pub fn closed(&self, reason: Option<String>) -> bool {
        self.emit(TransportEvent::Closed { reason })
    }
}

impl fmt::Debug for TransportEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportEvents")
            .field("connection", &self.connection)
            .field("attached", &self.is_attached())
            .finish()
    }
}
