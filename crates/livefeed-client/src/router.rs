//! Inbound MESSAGE routing.
//!
//! A frame is classified by its destination, its body is parsed into the payload type of
//! that category, and the payload is handed to a snapshot of the destination's listeners.
//! Each listener runs in isolation: a panicking callback is logged and the remaining
//! callbacks still run.

use std::panic::{AssertUnwindSafe, catch_unwind};

use livefeed_protocol::{AccountUpdate, Destination, Frame, LastTrade, MarketDepth, TopicCategory};
use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::registry::Listener;

/// What happened to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The payload was handed to the destination's listeners.
    Delivered {
        /// Where the frame was addressed.
        destination: Destination,
        /// Callbacks that returned normally.
        delivered: usize,
        /// Callbacks that panicked.
        failed: usize,
    },
    /// Nobody is listening on the destination.
    NoListeners(Destination),
    /// The frame had no destination header.
    MissingDestination,
    /// The destination matches no known template.
    UnknownDestination(String),
    /// The frame had no body.
    MissingBody(Destination),
    /// The body could not be parsed for the destination's category.
    Malformed {
        /// Where the frame was addressed.
        destination: Destination,
        /// Parse failure description.
        reason: String,
    },
}

/// A parsed message body.
#[derive(Debug, Clone, PartialEq)]
enum Payload {
    Account(AccountUpdate),
    Depth(MarketDepth),
    LastTrade(LastTrade),
    Market(Value),
}

impl Payload {
    fn parse(category: TopicCategory, body: &str) -> Result<Self, String> {
        match category {
            TopicCategory::AccountUpdates => {
                let update: AccountUpdate = serde_json::from_str(body).map_err(|e| e.to_string())?;
                if !update.is_well_formed() {
                    return Err(format!(
                        "account update carries {} members, expected at most one",
                        update.populated()
                    ));
                }
                Ok(Self::Account(update))
            }
            TopicCategory::MarketDepth => serde_json::from_str(body)
                .map(Self::Depth)
                .map_err(|e| e.to_string()),
            TopicCategory::MarketLastTrade => serde_json::from_str(body)
                .map(Self::LastTrade)
                .map_err(|e| e.to_string()),
            TopicCategory::Market => serde_json::from_str(body)
                .map(Self::Market)
                .map_err(|e| e.to_string()),
        }
    }

    /// Invokes `listener` if it accepts this payload. Returns `false` on a kind mismatch.
    fn deliver(&self, listener: &Listener) -> bool {
        match (self, listener) {
            (Self::Account(update), Listener::Account(callback)) => callback(update),
            (Self::Depth(depth), Listener::Depth(callback)) => callback(depth),
            (Self::LastTrade(trade), Listener::LastTrade(callback)) => callback(trade),
            (Self::Market(value), Listener::Market(callback)) => callback(value),
            _ => return false,
        }
        true
    }
}

/// Routes one MESSAGE frame.
///
/// `lookup` is asked for the listeners of the frame's destination exactly once, before any
/// callback runs; changes it observes later do not affect this dispatch. It is not called
/// for frames that cannot be classified.
pub fn route<F>(frame: &Frame, lookup: F) -> RouteOutcome
where
    F: FnOnce(&Destination) -> Vec<Listener>,
{
    let Some(raw) = frame.destination() else {
        debug!("Dropping MESSAGE without destination");
        return RouteOutcome::MissingDestination;
    };

    let Some(destination) = Destination::parse(raw) else {
        debug!(destination = raw, "Dropping MESSAGE for unknown destination");
        return RouteOutcome::UnknownDestination(raw.to_string());
    };

    let Some(body) = frame.body.as_deref().filter(|b| !b.is_empty()) else {
        debug!(%destination, "Dropping MESSAGE without body");
        return RouteOutcome::MissingBody(destination);
    };

    let listeners = lookup(&destination);
    if listeners.is_empty() {
        trace!(%destination, "No listeners for destination");
        return RouteOutcome::NoListeners(destination);
    }

    let payload = match Payload::parse(destination.category(), body) {
        Ok(payload) => payload,
        Err(reason) => {
            warn!(%destination, %reason, "Dropping malformed message body");
            return RouteOutcome::Malformed {
                destination,
                reason,
            };
        }
    };

    let mut delivered = 0;
    let mut failed = 0;
    for listener in &listeners {
        match catch_unwind(AssertUnwindSafe(|| payload.deliver(listener))) {
            Ok(true) => delivered += 1,
            Ok(false) => {
                debug!(%destination, ?listener, "Listener kind does not match destination");
            }
            Err(panic) => {
                failed += 1;
                error!(
                    %destination,
                    panic = %panic_message(panic.as_ref()),
                    "Subscriber callback panicked"
                );
            }
        }
    }

    trace!(%destination, delivered, failed, "Routed message");
    RouteOutcome::Delivered {
        destination,
        delivered,
        failed,
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livefeed_protocol::EntityKey;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn message(destination: &str, body: &str) -> Frame {
        Frame::new(livefeed_protocol::Command::Message)
            .header("destination", destination)
            .with_body(body)
    }

    fn account(key: &str) -> Destination {
        Destination::AccountUpdates(EntityKey::new(key).unwrap())
    }

    #[test]
    fn test_routes_balance_to_account_listeners() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener = Listener::Account(Arc::new(move |update: &AccountUpdate| {
            sink.lock().push(update.balance.as_ref().map(|b| b.cash));
        }));

        let frame = message(
            "/account/ACC1/updates",
            r#"{"balance":{"account_key":"ACC1","cash":100.5}}"#,
        );
        let outcome = route(&frame, |destination| {
            assert_eq!(destination, &account("ACC1"));
            vec![listener.clone()]
        });

        assert_eq!(
            outcome,
            RouteOutcome::Delivered {
                destination: account("ACC1"),
                delivered: 1,
                failed: 0
            }
        );
        assert_eq!(*seen.lock(), vec![Some(100.5)]);
    }

    #[test]
    fn test_no_listeners_skips_parsing() {
        let frame = message("/markets/BTC-USD/depth", "not json");
        let outcome = route(&frame, |_| Vec::new());
        assert!(matches!(outcome, RouteOutcome::NoListeners(_)));
    }

    #[test]
    fn test_unknown_destination_does_not_lookup() {
        let frame = message("/somewhere/else", "{}");
        let outcome = route(&frame, |_| panic!("lookup must not run"));
        assert_eq!(
            outcome,
            RouteOutcome::UnknownDestination("/somewhere/else".to_string())
        );
    }

    #[test]
    fn test_missing_destination() {
        let frame = Frame::new(livefeed_protocol::Command::Message).with_body("{}");
        assert_eq!(
            route(&frame, |_| Vec::new()),
            RouteOutcome::MissingDestination
        );
    }

    #[test]
    fn test_malformed_body_is_dropped() {
        let called = Arc::new(Mutex::new(0));
        let counter = called.clone();
        let listener = Listener::Depth(Arc::new(move |_: &MarketDepth| *counter.lock() += 1));

        let frame = message("/markets/BTC-USD/depth", "{\"bids\": 3}");
        let outcome = route(&frame, |_| vec![listener.clone()]);

        assert!(matches!(outcome, RouteOutcome::Malformed { .. }));
        assert_eq!(*called.lock(), 0);
    }

    #[test]
    fn test_account_update_with_two_members_is_malformed() {
        let listener = Listener::Account(Arc::new(|_: &AccountUpdate| {}));
        let frame = message(
            "/account/ACC1/updates",
            r#"{"balance":{"account_key":"ACC1","cash":1.0},
                "order":{"account_key":"ACC1","order_id":"o-1","status":"open"}}"#,
        );
        let outcome = route(&frame, |_| vec![listener.clone()]);
        assert!(matches!(outcome, RouteOutcome::Malformed { .. }));
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first = seen.clone();
        let third = seen.clone();
        let listeners = vec![
            Listener::Market(Arc::new(move |_: &Value| first.lock().push("first"))),
            Listener::Market(Arc::new(|_: &Value| panic!("boom"))),
            Listener::Market(Arc::new(move |_: &Value| third.lock().push("third"))),
        ];

        let frame = message("/market/BTC-USD", r#"{"price": 1}"#);
        let outcome = route(&frame, |_| listeners.clone());

        assert!(matches!(
            outcome,
            RouteOutcome::Delivered {
                delivered: 2,
                failed: 1,
                ..
            }
        ));
        assert_eq!(*seen.lock(), vec!["first", "third"]);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
