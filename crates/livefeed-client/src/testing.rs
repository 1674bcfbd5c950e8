//! In-memory transport for exercising a [`Session`](crate::Session) without a network.
//!
//! [`MockConnector`] hands out one [`MockSocket`] per `open`. Tests drive the socket side
//! explicitly (`open`, `receive`, `close`) and inspect every frame the session sent.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use livefeed_protocol::Command;
use livefeed_transport_traits::{
    TransportConnector, TransportError, TransportEvents, TransportHandle, TransportResult,
    TransportType,
};
use parking_lot::Mutex;

/// Recording connector.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    sockets: Arc<Mutex<Vec<MockSocket>>>,
    fail_opens: Arc<AtomicBool>,
}

impl MockConnector {
    /// Creates a connector with no sockets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `open` calls fail immediately.
    pub fn fail_opens(&self, fail: bool) {
        self.fail_opens.store(fail, Ordering::SeqCst);
    }

    /// Number of sockets opened so far, including failed attempts.
    pub fn open_count(&self) -> usize {
        self.sockets.lock().len()
    }

    /// The `index`-th socket opened.
    pub fn socket(&self, index: usize) -> Option<MockSocket> {
        self.sockets.lock().get(index).cloned()
    }

    /// The most recently opened socket.
    pub fn last_socket(&self) -> Option<MockSocket> {
        self.sockets.lock().last().cloned()
    }

    /// Every frame sent on any socket, in order.
    pub fn all_sent(&self) -> Vec<String> {
        self.sockets.lock().iter().flat_map(MockSocket::sent).collect()
    }
}

impl TransportConnector for MockConnector {
    fn transport_type(&self) -> TransportType {
        TransportType::Memory
    }

    fn endpoint(&self) -> String {
        "memory://mock".to_string()
    }

    fn open(&self, events: TransportEvents) -> TransportResult<Box<dyn TransportHandle>> {
        let socket = MockSocket {
            events,
            sent: Arc::default(),
            closed: Arc::default(),
        };
        self.sockets.lock().push(socket.clone());

        if self.fail_opens.load(Ordering::SeqCst) {
            socket.closed.store(true, Ordering::SeqCst);
            return Err(TransportError::ConnectionFailed(
                "mock connector refused".to_string(),
            ));
        }

        Ok(Box::new(MockHandle {
            sent: socket.sent.clone(),
            closed: socket.closed.clone(),
        }))
    }
}

/// The server side of one mock socket.
#[derive(Debug, Clone)]
pub struct MockSocket {
    events: TransportEvents,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockSocket {
    /// Reports the socket as open.
    pub fn open(&self) {
        self.events.opened();
    }

    /// Delivers one inbound text message.
    pub fn receive(&self, text: impl Into<String>) {
        self.events.message(text);
    }

    /// Opens the socket and acknowledges the handshake.
    pub fn handshake(&self) {
        self.open();
        self.receive("CONNECTED\nversion:1.2\n\n\0");
    }

    /// Reports the socket as closed by the peer.
    pub fn close(&self, reason: Option<String>) {
        self.closed.store(true, Ordering::SeqCst);
        self.events.closed(reason);
    }

    /// Reports a socket error.
    pub fn fail(&self, error: TransportError) {
        self.events.error(error);
    }

    /// Frames the session sent on this socket.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Commands of the frames the session sent on this socket.
    pub fn sent_commands(&self) -> Vec<Command> {
        self.sent
            .lock()
            .iter()
            .filter_map(|frame| frame.lines().next()?.parse().ok())
            .collect()
    }

    /// How many frames with `command` were sent on this socket.
    pub fn count(&self, command: Command) -> usize {
        self.sent_commands().into_iter().filter(|c| *c == command).count()
    }

    /// Whether either side closed the socket.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct MockHandle {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl TransportHandle for MockHandle {
    fn send(&self, text: String) -> TransportResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().push(text);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
