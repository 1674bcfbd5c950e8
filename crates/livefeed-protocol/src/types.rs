//! Payload types carried in MESSAGE and SEND bodies.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::destination::{self, EntityKey};
use crate::error::ProtocolError;

/// Trade or order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side.
    #[serde(alias = "BUY", alias = "Buy")]
    Buy,
    /// Sell side.
    #[serde(alias = "SELL", alias = "Sell")]
    Sell,
}

/// Cash balance of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Owning account.
    pub account_key: String,
    /// Cash amount.
    pub cash: f64,
    /// Monotonic version assigned by the server.
    #[serde(default)]
    pub version_number: u64,
    /// Currency code, when the server sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Holding of one instrument in an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Owning account.
    pub account_key: String,
    /// Instrument held.
    pub instrument_key: String,
    /// Signed quantity.
    pub quantity: f64,
    /// Average entry price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_price: Option<f64>,
    /// Monotonic version assigned by the server.
    #[serde(default)]
    pub version_number: u64,
}

/// Execution against an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Owning account.
    pub account_key: String,
    /// Instrument traded.
    pub instrument_key: String,
    /// Execution price.
    pub price: f64,
    /// Executed quantity.
    pub quantity: f64,
    /// Trade side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    /// Server-assigned trade identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<String>,
    /// Execution time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
}

/// Order lifecycle change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderState {
    /// Owning account.
    pub account_key: String,
    /// Order identifier.
    pub order_id: String,
    /// Server status string (e.g. `open`, `filled`, `cancelled`).
    pub status: String,
    /// Instrument of the order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_key: Option<String>,
    /// Quantity filled so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled_quantity: Option<f64>,
    /// Monotonic version assigned by the server.
    #[serde(default)]
    pub version_number: u64,
}

/// Body of an `/account/{key}/updates` message.
///
/// At most one member is populated per message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdate {
    /// New balance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Balance>,
    /// New position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// New trade.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade: Option<Trade>,
    /// Order-state change.
    #[serde(default, alias = "order_state", skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderState>,
}

/// Borrowed view of the populated member of an [`AccountUpdate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccountEvent<'a> {
    /// Balance changed.
    Balance(&'a Balance),
    /// Position changed.
    Position(&'a Position),
    /// Trade executed.
    Trade(&'a Trade),
    /// Order state changed.
    Order(&'a OrderState),
    /// Nothing populated (keep-alive style update).
    Empty,
}

impl AccountUpdate {
    /// Number of populated members.
    pub fn populated(&self) -> usize {
        usize::from(self.balance.is_some())
            + usize::from(self.position.is_some())
            + usize::from(self.trade.is_some())
            + usize::from(self.order.is_some())
    }

    /// Whether the update respects the at-most-one-member rule.
    pub fn is_well_formed(&self) -> bool {
        self.populated() <= 1
    }

    /// The populated member.
    pub fn event(&self) -> AccountEvent<'_> {
        if let Some(balance) = &self.balance {
            AccountEvent::Balance(balance)
        } else if let Some(position) = &self.position {
            AccountEvent::Position(position)
        } else if let Some(trade) = &self.trade {
            AccountEvent::Trade(trade)
        } else if let Some(order) = &self.order {
            AccountEvent::Order(order)
        } else {
            AccountEvent::Empty
        }
    }
}

/// One price level of an order book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level price.
    pub price: f64,
    /// Aggregate quantity at the level.
    pub quantity: f64,
}

/// Body of a `/markets/{key}/depth` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDepth {
    /// Instrument of the book.
    pub instrument_key: String,
    /// Bid levels, best first.
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    /// Ask levels, best first.
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
    /// Snapshot time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MarketDepth {
    /// Best bid, if any.
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Best ask, if any.
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }
}

/// Body of a `/markets/{key}/last_trade` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastTrade {
    /// Instrument traded.
    pub instrument_key: String,
    /// Trade price.
    pub price: f64,
    /// Trade quantity.
    pub quantity: f64,
    /// Aggressor side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    /// Trade time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// What a SEND request asks the server to push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestScope {
    /// Current account balance.
    Balance,
    /// Current account positions.
    Positions,
    /// Current account orders.
    Orders,
    /// Current market snapshot for an instrument.
    Market,
}

impl RequestScope {
    /// All scopes.
    pub const ALL: [Self; 4] = [Self::Balance, Self::Positions, Self::Orders, Self::Market];

    /// Wire spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::Positions => "positions",
            Self::Orders => "orders",
            Self::Market => "market",
        }
    }

    /// SEND destination for a request about `key`.
    ///
    /// Account scopes go to `/account/{key}/request`, `market` to `/markets/{key}/request`.
    pub fn destination_for(&self, key: &EntityKey) -> String {
        match self {
            Self::Balance | Self::Positions | Self::Orders => destination::account_request(key),
            Self::Market => destination::market_request(key),
        }
    }
}

impl fmt::Display for RequestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestScope {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProtocolError::UnknownScope(s.to_string()))
    }
}

/// JSON body of a SEND request: `{"request":"GET","scope":...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Request verb; always `GET`.
    pub request: RequestVerb,
    /// What is requested.
    pub scope: RequestScope,
}

impl RequestBody {
    /// A `GET` for `scope`.
    pub fn get(scope: RequestScope) -> Self {
        Self {
            request: RequestVerb::Get,
            scope,
        }
    }
}

/// Request verb of a [`RequestBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestVerb {
    /// Fetch current state.
    #[serde(rename = "GET")]
    Get,
}
