//! The session: one socket, many topics.
//!
//! A [`Session`] owns at most one transport at a time and runs the handshake on it:
//!
//! ```text
//! Idle ──connect──▶ Opening ──opened──▶ AwaitingAck ──CONNECTED──▶ Connected
//!                      │                     │                        │
//!                      └────── close / error / handshake timeout ─────┘
//!                                           ▼
//!                                     Disconnected ──timer──▶ Opening
//!
//! any state ──disconnect()──▶ Closed
//! ```
//!
//! Callbacks registered while offline are remembered and subscribed as soon as the server
//! acknowledges the handshake. After every reconnect, each destination that still has
//! callbacks is subscribed again under a fresh id.
//!
//! All public operations are non-blocking and infallible. Problems are logged through
//! `tracing` and otherwise swallowed; the only signals a caller sees are
//! [`Session::state`] and [`Session::is_connected`].

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::time::Duration;

use livefeed_protocol::{
    Destination, EntityKey, Frame, Inbound, RequestBody, RequestScope, decode, split_frames,
};
use livefeed_transport_traits::{
    ConnectionId, TransportConnector, TransportEvent, TransportEventHandler, TransportEvents,
    TransportHandle,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::config::SessionConfig;
use crate::registry::{
    AccountCallback, DepthCallback, LastTradeCallback, Listener, MarketCallback,
    SubscriptionId, SubscriptionRegistry,
};
use crate::router::{self, panic_message};

/// Callback for out-of-band JSON notifications.
pub type NotificationCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Never connected.
    Idle,
    /// A socket is being opened.
    Opening,
    /// The socket is open and CONNECT was sent; waiting for CONNECTED.
    AwaitingAck,
    /// The server acknowledged the handshake.
    Connected,
    /// The socket went away; a reconnect may be pending.
    Disconnected,
    /// Closed by the caller.
    Closed,
}

impl SessionState {
    /// Whether a socket is open or being opened.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Opening | Self::AwaitingAck | Self::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Opening => "opening",
            Self::AwaitingAck => "awaiting-ack",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Client session multiplexing account and market topics over one socket.
///
/// Cloning is cheap; all clones drive the same session. The session is torn down when the
/// last clone is dropped.
///
/// Deferred connects and reconnects are scheduled on the ambient tokio runtime, so those
/// calls must be made from within one. Everything else works without a runtime.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct ActiveTransport {
    id: ConnectionId,
    handle: Box<dyn TransportHandle>,
    handshake_deadline: Option<JoinHandle<()>>,
}

struct PendingTimer {
    token: u64,
    task: JoinHandle<()>,
}

struct SessionCore {
    state: SessionState,
    transport: Option<ActiveTransport>,
    registry: SubscriptionRegistry,
    attempts: u32,
    last_connection: u64,
    timer: Option<PendingTimer>,
    last_timer: u64,
}

impl SessionCore {
    fn is_current(&self, connection: ConnectionId) -> bool {
        self.transport.as_ref().is_some_and(|t| t.id == connection)
    }

    fn send(&self, frame: &Frame) -> bool {
        let Some(transport) = &self.transport else {
            return false;
        };
        match transport.handle.send(frame.encode()) {
            Ok(()) => {
                trace!(connection = %transport.id, command = %frame.command, "Sent frame");
                true
            }
            Err(e) => {
                debug!(connection = %transport.id, error = %e, "Failed to send frame");
                false
            }
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.task.abort();
            trace!(token = timer.token, "Cancelled pending connect");
        }
    }

    fn drop_transport(&mut self) {
        if let Some(transport) = self.transport.take() {
            if let Some(deadline) = transport.handshake_deadline {
                deadline.abort();
            }
            transport.handle.close();
        }
    }
}

struct SessionInner {
    config: SessionConfig,
    connector: Arc<dyn TransportConnector>,
    core: Mutex<SessionCore>,
    notification_handler: RwLock<Option<NotificationCallback>>,
    this: Weak<SessionInner>,
}

impl Session {
    /// Creates an idle session that opens sockets through `connector`.
    pub fn new(config: SessionConfig, connector: Arc<dyn TransportConnector>) -> Self {
        let inner = Arc::new_cyclic(|this| SessionInner {
            config,
            connector,
            core: Mutex::new(SessionCore {
                state: SessionState::Idle,
                transport: None,
                registry: SubscriptionRegistry::new(),
                attempts: 0,
                last_connection: 0,
                timer: None,
                last_timer: 0,
            }),
            notification_handler: RwLock::new(None),
            this: this.clone(),
        });
        Self { inner }
    }

    /// Creates a session with the default configuration.
    pub fn with_connector(connector: Arc<dyn TransportConnector>) -> Self {
        Self::new(SessionConfig::default(), connector)
    }

    /// The configuration this session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Connects, honoring [`SessionConfig::initial_connect_delay`].
    pub fn start(&self) {
        match self.inner.config.initial_connect_delay {
            Some(delay) => self.connect_after(delay),
            None => self.connect(),
        }
    }

    /// Opens a socket unless one is already open or opening.
    ///
    /// Supersedes a pending reconnect. The attempt counter starts over only if the
    /// reconnect budget was exhausted.
    pub fn connect(&self) {
        let mut core = self.inner.core.lock();
        if core.state.is_active() {
            debug!(state = %core.state, "connect() ignored, socket already active");
            return;
        }
        core.cancel_timer();
        if !self.inner.config.reconnect.should_retry(core.attempts) {
            core.attempts = 0;
        }
        self.inner.open_transport(&mut core);
    }

    /// Schedules a connect after `delay`. Cancelled by [`disconnect`](Self::disconnect).
    pub fn connect_after(&self, delay: Duration) {
        let mut core = self.inner.core.lock();
        if core.state.is_active() {
            debug!(state = %core.state, "connect_after() ignored, socket already active");
            return;
        }
        self.inner.schedule_connect(&mut core, delay);
    }

    /// Closes the socket and forgets every callback.
    ///
    /// Cancels any pending reconnect and resets the attempt counter. The session can be
    /// connected again afterwards.
    pub fn disconnect(&self) {
        let mut core = self.inner.core.lock();
        core.cancel_timer();
        if core.state == SessionState::Connected {
            core.send(&Frame::disconnect());
        }
        core.drop_transport();
        core.registry.clear();
        core.attempts = 0;
        core.state = SessionState::Closed;
        info!("Session closed");
    }

    /// Whether the server has acknowledged the handshake on the current socket.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.inner.core.lock().state
    }

    /// Automatic reconnects made since the last successful handshake.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.core.lock().attempts
    }

    /// Destinations that currently have callbacks.
    pub fn destinations(&self) -> Vec<Destination> {
        self.inner.core.lock().registry.all_destinations()
    }

    /// The id of the active subscription for `destination`, if subscribed on the socket.
    pub fn subscription_id(&self, destination: &Destination) -> Option<SubscriptionId> {
        self.inner.core.lock().registry.subscription_id_for(destination)
    }

    /// Registers `callback` for updates on `account_key`.
    pub fn subscribe(&self, account_key: &str, callback: AccountCallback) {
        if let Some(key) = parse_key(account_key) {
            self.inner
                .add_listener(Destination::AccountUpdates(key), Listener::Account(callback));
        }
    }

    /// Removes `callback` from `account_key`.
    pub fn unsubscribe(&self, account_key: &str, callback: &AccountCallback) {
        if let Some(key) = parse_key(account_key) {
            self.inner.remove_listener(
                &Destination::AccountUpdates(key),
                &Listener::Account(callback.clone()),
            );
        }
    }

    /// Registers callbacks for the depth and last-trade topics of `instrument_key`.
    pub fn subscribe_to_market_data(
        &self,
        instrument_key: &str,
        on_depth: DepthCallback,
        on_last_trade: LastTradeCallback,
    ) {
        if let Some(key) = parse_key(instrument_key) {
            self.inner
                .add_listener(Destination::MarketDepth(key.clone()), Listener::Depth(on_depth));
            self.inner.add_listener(
                Destination::MarketLastTrade(key),
                Listener::LastTrade(on_last_trade),
            );
        }
    }

    /// Removes callbacks registered with [`subscribe_to_market_data`](Self::subscribe_to_market_data).
    pub fn unsubscribe_from_market_data(
        &self,
        instrument_key: &str,
        on_depth: &DepthCallback,
        on_last_trade: &LastTradeCallback,
    ) {
        if let Some(key) = parse_key(instrument_key) {
            self.inner.remove_listener(
                &Destination::MarketDepth(key.clone()),
                &Listener::Depth(on_depth.clone()),
            );
            self.inner.remove_listener(
                &Destination::MarketLastTrade(key),
                &Listener::LastTrade(on_last_trade.clone()),
            );
        }
    }

    /// Registers `callback` on the legacy combined market topic of `instrument_key`.
    pub fn subscribe_market_legacy(&self, instrument_key: &str, callback: MarketCallback) {
        if let Some(key) = parse_key(instrument_key) {
            self.inner
                .add_listener(Destination::Market(key), Listener::Market(callback));
        }
    }

    /// Removes `callback` from the legacy combined market topic of `instrument_key`.
    pub fn unsubscribe_market_legacy(&self, instrument_key: &str, callback: &MarketCallback) {
        if let Some(key) = parse_key(instrument_key) {
            self.inner.remove_listener(
                &Destination::Market(key),
                &Listener::Market(callback.clone()),
            );
        }
    }

    /// Asks the server to push the current `scope` snapshot for `entity_key`.
    ///
    /// Only sent while connected; dropped otherwise.
    pub fn send_request(&self, entity_key: &str, scope: RequestScope) {
        let Some(key) = parse_key(entity_key) else {
            return;
        };
        let destination = scope.destination_for(&key);
        let frame = match Frame::send_json(&destination, &RequestBody::get(scope)) {
            Ok(frame) => frame,
            Err(e) => {
                error!(%destination, error = %e, "Failed to encode request");
                return;
            }
        };

        let core = self.inner.core.lock();
        if core.state != SessionState::Connected {
            debug!(%destination, %scope, state = %core.state, "Dropping request, not connected");
            return;
        }
        if core.send(&frame) {
            debug!(%destination, %scope, "Sent request");
        }
    }

    /// Installs (or clears) the handler for out-of-band JSON notifications.
    pub fn set_notification_handler(&self, handler: Option<NotificationCallback>) {
        *self.inner.notification_handler.write() = handler;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("Session")
            .field("state", &core.state)
            .field("endpoint", &self.inner.connector.endpoint())
            .field("destinations", &core.registry.len())
            .field("attempts", &core.attempts)
            .finish()
    }
}

fn parse_key(raw: &str) -> Option<EntityKey> {
    match EntityKey::new(raw) {
        Ok(key) => Some(key),
        Err(e) => {
            warn!(key = raw, error = %e, "Ignoring call with invalid entity key");
            None
        }
    }
}

impl SessionInner {
    /// Replaces any current socket with a fresh one. Caller holds the core lock.
    fn open_transport(&self, core: &mut SessionCore) {
        core.drop_transport();
        core.last_connection += 1;
        let id = ConnectionId(core.last_connection);
        core.state = SessionState::Opening;

        let handler: Weak<dyn TransportEventHandler> = self.this.clone();
        let events = TransportEvents::new(id, handler);

        info!(
            connection = %id,
            endpoint = %self.connector.endpoint(),
            transport = %self.connector.transport_type(),
            "Opening socket"
        );
        match self.connector.open(events) {
            Ok(handle) => {
                core.transport = Some(ActiveTransport {
                    id,
                    handle,
                    handshake_deadline: None,
                })
            }
            Err(e) => {
                warn!(connection = %id, error = %e, "Failed to open socket");
                self.on_transport_lost(core, Some(e.to_string()));
            }
        }
    }

    fn schedule_connect(&self, core: &mut SessionCore, delay: Duration) {
        core.cancel_timer();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                error!(?delay, "No tokio runtime available, connect not scheduled");
                return;
            }
        };

        core.last_timer += 1;
        let token = core.last_timer;
        let this = self.this.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = this.upgrade() {
                inner.on_timer(token);
            }
        });
        core.timer = Some(PendingTimer { token, task });
        debug!(?delay, token, "Connect scheduled");
    }

    fn on_timer(&self, token: u64) {
        let mut core = self.core.lock();
        if core.timer.as_ref().map(|t| t.token) != Some(token) {
            trace!(token, "Ignoring superseded timer");
            return;
        }
        core.timer = None;
        if core.state.is_active() {
            return;
        }
        self.open_transport(&mut core);
    }

    /// The socket is gone: forget it and schedule a reconnect if allowed.
    fn on_transport_lost(&self, core: &mut SessionCore, reason: Option<String>) {
        if !core.state.is_active() {
            return;
        }
        core.drop_transport();
        core.registry.clear_subscriptions();
        core.state = SessionState::Disconnected;

        let policy = &self.config.reconnect;
        if policy.should_retry(core.attempts) {
            core.attempts += 1;
            let delay = policy.next_delay(core.attempts);
            warn!(
                reason = reason.as_deref().unwrap_or("unknown"),
                attempt = core.attempts,
                max_attempts = policy.max_attempts,
                ?delay,
                "Connection lost, reconnecting"
            );
            self.schedule_connect(core, delay);
        } else {
            error!(
                reason = reason.as_deref().unwrap_or("unknown"),
                attempts = core.attempts,
                "Connection lost, giving up"
            );
        }
    }

    fn on_opened(&self, core: &mut SessionCore) {
        if core.state != SessionState::Opening {
            return;
        }
        core.state = SessionState::AwaitingAck;
        debug!("Socket open, sending CONNECT");
        core.send(&Frame::connect(&self.config.accept_version));
        if let Some(timeout) = self.config.handshake_timeout {
            self.arm_handshake_deadline(core, timeout);
        }
    }

    fn arm_handshake_deadline(&self, core: &mut SessionCore, timeout: Duration) {
        let Some(transport) = core.transport.as_mut() else {
            return;
        };
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(?timeout, "No tokio runtime available, handshake timeout not armed");
                return;
            }
        };

        let connection = transport.id;
        let this = self.this.clone();
        transport.handshake_deadline = Some(runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = this.upgrade() {
                inner.on_handshake_timeout(connection, timeout);
            }
        }));
    }

    fn on_handshake_timeout(&self, connection: ConnectionId, timeout: Duration) {
        let mut core = self.core.lock();
        if !core.is_current(connection) || core.state != SessionState::AwaitingAck {
            return;
        }
        warn!(%connection, ?timeout, "No CONNECTED within the handshake timeout");
        self.on_transport_lost(&mut core, Some("handshake timed out".to_string()));
    }

    fn on_connected(&self, core: &mut SessionCore) {
        if core.state != SessionState::AwaitingAck {
            debug!(state = %core.state, "Ignoring unexpected CONNECTED");
            return;
        }
        core.state = SessionState::Connected;
        core.attempts = 0;
        if let Some(deadline) = core
            .transport
            .as_mut()
            .and_then(|t| t.handshake_deadline.take())
        {
            deadline.abort();
        }

        let subscriptions = core.registry.resubscribe_all();
        for (id, destination) in &subscriptions {
            core.send(&Frame::subscribe(id.0, &destination.to_string()));
        }
        info!(subscriptions = subscriptions.len(), "Session connected");
    }

    fn add_listener(&self, destination: Destination, listener: Listener) {
        let mut core = self.core.lock();
        let connected = core.state == SessionState::Connected;
        if let Some(id) = core
            .registry
            .add_subscriber(destination.clone(), listener, connected)
        {
            core.send(&Frame::subscribe(id.0, &destination.to_string()));
            debug!(%destination, %id, "Subscribed");
        }
    }

    fn remove_listener(&self, destination: &Destination, listener: &Listener) {
        let mut core = self.core.lock();
        if let Some(id) = core.registry.remove_subscriber(destination, listener)
            && core.state == SessionState::Connected
        {
            core.send(&Frame::unsubscribe(id.0));
            debug!(%destination, %id, "Unsubscribed");
        }
    }

    /// Handles one transport message. Called without the core lock held.
    fn on_text(&self, connection: ConnectionId, text: &str) {
        if !self.core.lock().is_current(connection) {
            trace!(%connection, "Ignoring message from stale socket");
            return;
        }
        for chunk in split_frames(text) {
            let Some(inbound) = decode(chunk) else {
                continue;
            };
            match inbound {
                Inbound::Connected => {
                    let mut core = self.core.lock();
                    if core.is_current(connection) {
                        self.on_connected(&mut core);
                    }
                }
                Inbound::Message(frame) => {
                    if !self.core.lock().is_current(connection) {
                        return;
                    }
                    router::route(&frame, |destination| {
                        self.core.lock().registry.listeners_for(destination)
                    });
                }
                Inbound::Error { message, body } => {
                    warn!(
                        %connection,
                        message = message.as_deref().unwrap_or(""),
                        body = body.as_deref().unwrap_or(""),
                        "Server reported an error"
                    );
                }
                Inbound::Notification(value) => self.notify(&value),
            }
        }
    }

    fn notify(&self, value: &Value) {
        debug!(notification = %value, "Received notification");
        let handler = self.notification_handler.read().clone();
        if let Some(handler) = handler
            && let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(value)))
        {
            error!(panic = %panic_message(panic.as_ref()), "Notification handler panicked");
        }
    }
}

impl TransportEventHandler for SessionInner {
    fn on_transport_event(&self, connection: ConnectionId, event: TransportEvent) {
        let event = match event {
            TransportEvent::Message(text) => {
                self.on_text(connection, &text);
                return;
            }
            other => other,
        };

        let mut core = self.core.lock();
        if !core.is_current(connection) {
            trace!(%connection, ?event, "Ignoring event from stale socket");
            return;
        }
        match event {
            TransportEvent::Opened => self.on_opened(&mut core),
            TransportEvent::Error(e) => self.on_transport_lost(&mut core, Some(e.to_string())),
            TransportEvent::Closed { reason } => self.on_transport_lost(&mut core, reason),
            TransportEvent::Message(_) => {}
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let core = self.core.get_mut();
        core.cancel_timer();
        core.drop_transport();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconnect::ReconnectPolicy;
    use crate::testing::MockConnector;
    use livefeed_protocol::{AccountUpdate, Command};
    use pretty_assertions::assert_eq;

    const CONNECTED: &str = "CONNECTED\nversion:1.2\n\n\0";

    fn session(connector: &MockConnector) -> Session {
        Session::with_connector(Arc::new(connector.clone()))
    }

    fn noop_account() -> AccountCallback {
        Arc::new(|_: &AccountUpdate| {})
    }

    #[test]
    fn test_handshake_sequence() {
        let connector = MockConnector::new();
        let session = session(&connector);
        assert_eq!(session.state(), SessionState::Idle);

        session.connect();
        assert_eq!(session.state(), SessionState::Opening);

        let socket = connector.last_socket().unwrap();
        socket.open();
        assert_eq!(session.state(), SessionState::AwaitingAck);
        assert_eq!(socket.sent_commands(), vec![Command::Connect]);
        assert!(socket.sent()[0].contains("accept-version:1.2\n"));
        assert!(!session.is_connected());

        socket.receive(CONNECTED);
        assert!(session.is_connected());
    }

    #[test]
    fn test_connect_while_active_is_noop() {
        let connector = MockConnector::new();
        let session = session(&connector);
        session.connect();
        session.connect();
        assert_eq!(connector.open_count(), 1);
    }

    #[test]
    fn test_offline_subscribe_is_deferred_until_connected() {
        let connector = MockConnector::new();
        let session = session(&connector);
        session.subscribe("ACC1", noop_account());
        session.connect();

        let socket = connector.last_socket().unwrap();
        socket.open();
        assert_eq!(socket.sent_commands(), vec![Command::Connect]);

        socket.receive(CONNECTED);
        assert_eq!(
            socket.sent_commands(),
            vec![Command::Connect, Command::Subscribe]
        );
        assert!(socket.sent()[1].contains("destination:/account/ACC1/updates\n"));
    }

    #[test]
    fn test_duplicate_connected_is_ignored() {
        let connector = MockConnector::new();
        let session = session(&connector);
        session.subscribe("ACC1", noop_account());
        session.connect();
        let socket = connector.last_socket().unwrap();
        socket.handshake();
        socket.receive(CONNECTED);

        assert_eq!(socket.count(Command::Subscribe), 1);
    }

    #[test]
    fn test_unsubscribe_last_callback_sends_unsubscribe() {
        let connector = MockConnector::new();
        let session = session(&connector);
        session.connect();
        let socket = connector.last_socket().unwrap();
        socket.handshake();

        let first = noop_account();
        let second = noop_account();
        session.subscribe("ACC1", first.clone());
        session.subscribe("ACC1", second.clone());
        assert_eq!(socket.count(Command::Subscribe), 1);

        session.unsubscribe("ACC1", &first);
        assert_eq!(socket.count(Command::Unsubscribe), 0);
        session.unsubscribe("ACC1", &second);
        assert_eq!(socket.count(Command::Unsubscribe), 1);
        assert!(socket.sent().last().unwrap().contains("id:1\n"));
        assert!(session.destinations().is_empty());
    }

    #[test]
    fn test_stale_socket_events_are_ignored() {
        let connector = MockConnector::new();
        let session = Session::new(
            SessionConfig::default().with_reconnect(ReconnectPolicy::disabled()),
            Arc::new(connector.clone()),
        );
        session.connect();
        let old = connector.last_socket().unwrap();
        old.handshake();
        old.close(None);
        assert_eq!(session.state(), SessionState::Disconnected);

        session.connect();
        let current = connector.last_socket().unwrap();
        old.receive(CONNECTED);
        old.close(Some("late".into()));
        assert_eq!(session.state(), SessionState::Opening);

        current.handshake();
        assert!(session.is_connected());
    }

    #[test]
    fn test_send_request_only_when_connected() {
        let connector = MockConnector::new();
        let session = session(&connector);
        session.send_request("ACC1", RequestScope::Balance);
        session.connect();
        let socket = connector.last_socket().unwrap();
        socket.open();
        session.send_request("ACC1", RequestScope::Balance);
        assert_eq!(socket.count(Command::Send), 0);

        socket.receive(CONNECTED);
        session.send_request("ACC1", RequestScope::Balance);
        session.send_request("BTC-USD", RequestScope::Market);

        let sent = socket.sent();
        assert_eq!(socket.count(Command::Send), 2);
        assert!(sent[1].contains("destination:/account/ACC1/request\n"));
        assert!(sent[1].ends_with("{\"request\":\"GET\",\"scope\":\"balance\"}\0"));
        assert!(sent[2].contains("destination:/markets/BTC-USD/request\n"));
    }

    #[test]
    fn test_invalid_key_is_ignored() {
        let connector = MockConnector::new();
        let session = session(&connector);
        session.subscribe("", noop_account());
        assert!(session.destinations().is_empty());
    }

    #[test]
    fn test_error_frame_does_not_close_session() {
        let connector = MockConnector::new();
        let session = session(&connector);
        session.connect();
        let socket = connector.last_socket().unwrap();
        socket.handshake();
        socket.receive("ERROR\nmessage:bad subscription\n\noops\0");
        assert!(session.is_connected());
    }

    #[test]
    fn test_notification_handler() {
        let connector = MockConnector::new();
        let session = session(&connector);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        session.set_notification_handler(Some(Arc::new(move |value: &Value| {
            sink.lock().push(value.clone());
        })));

        session.connect();
        let socket = connector.last_socket().unwrap();
        socket.handshake();
        socket.receive(r#"{"event":"maintenance","in":300}"#);

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0]["event"], "maintenance");
    }

    #[test]
    fn test_batched_frames_are_processed_in_order() {
        let connector = MockConnector::new();
        let session = session(&connector);
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        session.subscribe(
            "ACC1",
            Arc::new(move |_: &AccountUpdate| *counter.lock() += 1),
        );
        session.connect();
        let socket = connector.last_socket().unwrap();
        socket.open();

        let body = r#"{"balance":{"account_key":"ACC1","cash":1.0}}"#;
        socket.receive(format!(
            "{CONNECTED}\nMESSAGE\ndestination:/account/ACC1/updates\n\n{body}\0"
        ));

        assert!(session.is_connected());
        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn test_disconnect_clears_everything() {
        let connector = MockConnector::new();
        let session = session(&connector);
        session.subscribe("ACC1", noop_account());
        session.connect();
        let socket = connector.last_socket().unwrap();
        socket.handshake();

        session.disconnect();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.destinations().is_empty());
        assert!(socket.is_closed());
        assert_eq!(socket.sent_commands().last(), Some(&Command::Disconnect));
    }

    #[test]
    fn test_failed_open_without_runtime_stays_disconnected() {
        let connector = MockConnector::new();
        connector.fail_opens(true);
        let session = session(&connector);

        session.connect();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.reconnect_attempts(), 1);
    }

    #[test]
    fn test_connect_after_giving_up_restores_budget() {
        let connector = MockConnector::new();
        let session = Session::new(
            SessionConfig::default().with_reconnect(ReconnectPolicy::new().with_max_attempts(1)),
            Arc::new(connector.clone()),
        );
        connector.fail_opens(true);
        session.connect();
        assert_eq!(session.reconnect_attempts(), 1);

        session.connect();
        assert_eq!(session.reconnect_attempts(), 1);
        assert_eq!(connector.open_count(), 2);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::AwaitingAck.to_string(), "awaiting-ack");
        assert!(SessionState::Opening.is_active());
        assert!(!SessionState::Disconnected.is_active());
    }
}
