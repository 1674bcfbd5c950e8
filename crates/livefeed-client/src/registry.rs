//! Subscription bookkeeping.
//!
//! The registry maps every destination to its ordered callback list and to the id of the
//! SUBSCRIBE currently active for it on the socket, if any. It performs no I/O; callers get
//! back the ids they need to put on the wire.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use livefeed_protocol::{AccountUpdate, Destination, LastTrade, MarketDepth, TopicCategory};
use serde_json::Value;

/// Callback for account updates.
pub type AccountCallback = Arc<dyn Fn(&AccountUpdate) + Send + Sync>;

/// Callback for market depth snapshots.
pub type DepthCallback = Arc<dyn Fn(&MarketDepth) + Send + Sync>;

/// Callback for last-trade events.
pub type LastTradeCallback = Arc<dyn Fn(&LastTrade) + Send + Sync>;

/// Callback for the legacy combined market topic. The payload is passed through as JSON.
pub type MarketCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Id of one SUBSCRIBE on the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered callback, tagged with the payload type it accepts.
///
/// Two listeners are the same listener when they wrap the same allocation.
#[derive(Clone)]
pub enum Listener {
    /// Receives `/account/{key}/updates`.
    Account(AccountCallback),
    /// Receives `/markets/{key}/depth`.
    Depth(DepthCallback),
    /// Receives `/markets/{key}/last_trade`.
    LastTrade(LastTradeCallback),
    /// Receives `/market/{key}`.
    Market(MarketCallback),
}

impl Listener {
    /// The topic category this listener can be registered under.
    pub fn category(&self) -> TopicCategory {
        match self {
            Self::Account(_) => TopicCategory::AccountUpdates,
            Self::Depth(_) => TopicCategory::MarketDepth,
            Self::LastTrade(_) => TopicCategory::MarketLastTrade,
            Self::Market(_) => TopicCategory::Market,
        }
    }

    /// Identity comparison.
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Account(a), Self::Account(b)) => Arc::ptr_eq(a, b),
            (Self::Depth(a), Self::Depth(b)) => Arc::ptr_eq(a, b),
            (Self::LastTrade(a), Self::LastTrade(b)) => Arc::ptr_eq(a, b),
            (Self::Market(a), Self::Market(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").field(&self.category()).finish()
    }
}

/// Destination → callbacks, plus the live subscription id per destination.
///
/// Invariants:
/// - a destination has an entry only while it has at least one listener,
/// - at most one subscription id per destination,
/// - ids are strictly increasing and never reused for the lifetime of the registry.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    listeners: BTreeMap<Destination, Vec<Listener>>,
    subscriptions: BTreeMap<Destination, SubscriptionId>,
    last_id: u64,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `listener` to the callbacks for `destination`.
    ///
    /// Adding a listener that is already registered there is a no-op. When `connected` is
    /// true and the destination has no active subscription yet, a fresh id is allocated and
    /// returned; the caller must emit the SUBSCRIBE for it.
    pub fn add_subscriber(
        &mut self,
        destination: Destination,
        listener: Listener,
        connected: bool,
    ) -> Option<SubscriptionId> {
        debug_assert_eq!(destination.category(), listener.category());

        let callbacks = self.listeners.entry(destination.clone()).or_default();
        if callbacks.iter().any(|l| l.same_as(&listener)) {
            return None;
        }
        callbacks.push(listener);

        if connected && !self.subscriptions.contains_key(&destination) {
            let id = self.allocate_id();
            self.subscriptions.insert(destination, id);
            return Some(id);
        }
        None
    }

    /// Removes `listener` from `destination`.
    ///
    /// When the last listener goes, the destination is forgotten and the id of its active
    /// subscription, if any, is returned; the caller must emit the UNSUBSCRIBE for it.
    /// Removing an unknown listener is a no-op.
    pub fn remove_subscriber(
        &mut self,
        destination: &Destination,
        listener: &Listener,
    ) -> Option<SubscriptionId> {
        let callbacks = self.listeners.get_mut(destination)?;
        let position = callbacks.iter().position(|l| l.same_as(listener))?;
        callbacks.remove(position);

        if callbacks.is_empty() {
            self.listeners.remove(destination);
            return self.subscriptions.remove(destination);
        }
        None
    }

    /// Every destination that currently has at least one listener.
    pub fn all_destinations(&self) -> Vec<Destination> {
        self.listeners.keys().cloned().collect()
    }

    /// The active subscription id for `destination`.
    pub fn subscription_id_for(&self, destination: &Destination) -> Option<SubscriptionId> {
        self.subscriptions.get(destination).copied()
    }

    /// A snapshot of the listeners for `destination`, in registration order.
    pub fn listeners_for(&self, destination: &Destination) -> Vec<Listener> {
        self.listeners.get(destination).cloned().unwrap_or_default()
    }

    /// Number of listeners registered for `destination`.
    pub fn listener_count(&self, destination: &Destination) -> usize {
        self.listeners.get(destination).map_or(0, Vec::len)
    }

    /// Number of destinations with listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no destination has listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Forgets every subscription id. Listeners are kept.
    ///
    /// Called when the socket goes away: its subscriptions went with it.
    pub fn clear_subscriptions(&mut self) {
        self.subscriptions.clear();
    }

    /// Assigns a fresh id to every destination with listeners, replacing any previous ones.
    ///
    /// Returns the SUBSCRIBEs to emit, in destination order.
    pub fn resubscribe_all(&mut self) -> Vec<(SubscriptionId, Destination)> {
        self.subscriptions.clear();
        let destinations = self.all_destinations();
        destinations
            .into_iter()
            .map(|destination| {
                let id = self.allocate_id();
                self.subscriptions.insert(destination.clone(), id);
                (id, destination)
            })
            .collect()
    }

    /// Drops every listener and subscription. The id sequence is not reset.
    pub fn clear(&mut self) {
        self.listeners.clear();
        self.subscriptions.clear();
    }

    fn allocate_id(&mut self) -> SubscriptionId {
        self.last_id += 1;
        SubscriptionId(self.last_id)
    }
}
