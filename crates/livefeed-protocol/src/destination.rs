//! Destination templates.
//!
//! Every logical topic is derived from an entity key and a fixed template:
//!
//! | Template | Payload |
//! |---|---|
//! | `/account/{accountKey}/updates` | [`AccountUpdate`](crate::AccountUpdate) |
//! | `/markets/{instrumentKey}/depth` | [`MarketDepth`](crate::MarketDepth) |
//! | `/markets/{instrumentKey}/last_trade` | [`LastTrade`](crate::LastTrade) |
//! | `/market/{key}` | raw JSON (legacy channel) |
//!
//! Keys are percent-encoded inside the template so that a key containing `/` cannot
//! render the same string as a different entity's destination.

use std::borrow::Cow;
use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};

/// Characters escaped in a destination segment (RFC 3986 unreserved characters pass through).
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const ACCOUNT_PREFIX: &str = "/account/";
const ACCOUNT_UPDATES_SUFFIX: &str = "/updates";
const MARKETS_PREFIX: &str = "/markets/";
const DEPTH_SUFFIX: &str = "/depth";
const LAST_TRADE_SUFFIX: &str = "/last_trade";
const LEGACY_MARKET_PREFIX: &str = "/market/";
const REQUEST_SUFFIX: &str = "/request";

/// Key of an account or instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityKey(String);

impl EntityKey {
    /// Create a key, rejecting empty or whitespace-only input.
    pub fn new(key: impl Into<String>) -> ProtocolResult<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ProtocolError::InvalidEntityKey(key));
        }
        Ok(Self(key))
    }

    /// The raw key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key as it appears inside a destination.
    pub fn encoded(&self) -> Cow<'_, str> {
        utf8_percent_encode(&self.0, SEGMENT).into()
    }

    fn decode_segment(segment: &str) -> Option<Self> {
        if segment.is_empty() || segment.contains('/') {
            return None;
        }
        let key = percent_decode_str(segment).decode_utf8().ok()?;
        let key = Self::new(key.into_owned()).ok()?;
        // Only the canonical encoding names a key.
        (key.encoded() == segment).then_some(key)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntityKey {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for EntityKey {
    type Error = ProtocolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntityKey> for String {
    fn from(key: EntityKey) -> Self {
        key.0
    }
}

/// Payload category of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicCategory {
    /// Account balance/position/trade/order updates.
    AccountUpdates,
    /// Order book snapshots.
    MarketDepth,
    /// Last trade prints.
    MarketLastTrade,
    /// Generic market data on the legacy path.
    Market,
}

impl fmt::Display for TopicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountUpdates => write!(f, "account_updates"),
            Self::MarketDepth => write!(f, "market_depth"),
            Self::MarketLastTrade => write!(f, "market_last_trade"),
            Self::Market => write!(f, "market"),
        }
    }
}

/// A logical topic on the feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Destination {
    /// `/account/{key}/updates`
    AccountUpdates(EntityKey),
    /// `/markets/{key}/depth`
    MarketDepth(EntityKey),
    /// `/markets/{key}/last_trade`
    MarketLastTrade(EntityKey),
    /// `/market/{key}`
    Market(EntityKey),
}

impl Destination {
    /// The entity this destination belongs to.
    pub fn entity(&self) -> &EntityKey {
        match self {
            Self::AccountUpdates(key)
            | Self::MarketDepth(key)
            | Self::MarketLastTrade(key)
            | Self::Market(key) => key,
        }
    }

    /// The payload category.
    pub fn category(&self) -> TopicCategory {
        match self {
            Self::AccountUpdates(_) => TopicCategory::AccountUpdates,
            Self::MarketDepth(_) => TopicCategory::MarketDepth,
            Self::MarketLastTrade(_) => TopicCategory::MarketLastTrade,
            Self::Market(_) => TopicCategory::Market,
        }
    }

    /// Classify a wire destination by template. Returns `None` for anything unknown.
    pub fn parse(destination: &str) -> Option<Self> {
        if let Some(rest) = destination.strip_prefix(ACCOUNT_PREFIX) {
            let key = rest.strip_suffix(ACCOUNT_UPDATES_SUFFIX)?;
            return EntityKey::decode_segment(key).map(Self::AccountUpdates);
        }
        if let Some(rest) = destination.strip_prefix(MARKETS_PREFIX) {
            if let Some(key) = rest.strip_suffix(DEPTH_SUFFIX) {
                return EntityKey::decode_segment(key).map(Self::MarketDepth);
            }
            let key = rest.strip_suffix(LAST_TRADE_SUFFIX)?;
            return EntityKey::decode_segment(key).map(Self::MarketLastTrade);
        }
        let key = destination.strip_prefix(LEGACY_MARKET_PREFIX)?;
        EntityKey::decode_segment(key).map(Self::Market)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountUpdates(key) => {
                write!(f, "{ACCOUNT_PREFIX}{}{ACCOUNT_UPDATES_SUFFIX}", key.encoded())
            }
            Self::MarketDepth(key) => write!(f, "{MARKETS_PREFIX}{}{DEPTH_SUFFIX}", key.encoded()),
            Self::MarketLastTrade(key) => {
                write!(f, "{MARKETS_PREFIX}{}{LAST_TRADE_SUFFIX}", key.encoded())
            }
            Self::Market(key) => write!(f, "{LEGACY_MARKET_PREFIX}{}", key.encoded()),
        }
    }
}

/// Destination of SEND requests about an account.
pub(crate) fn account_request(key: &EntityKey) -> String {
    format!("{ACCOUNT_PREFIX}{}{REQUEST_SUFFIX}", key.encoded())
}

/// Destination of SEND requests about an instrument.
pub(crate) fn market_request(key: &EntityKey) -> String {
    format!("{MARKETS_PREFIX}{}{REQUEST_SUFFIX}", key.encoded())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> EntityKey {
        EntityKey::new(k).unwrap()
    }

    #[test]
    fn test_render_templates() {
        assert_eq!(
            Destination::AccountUpdates(key("ACC1")).to_string(),
            "/account/ACC1/updates"
        );
        assert_eq!(
            Destination::MarketDepth(key("BTC-USD")).to_string(),
            "/markets/BTC-USD/depth"
        );
        assert_eq!(
            Destination::MarketLastTrade(key("BTC-USD")).to_string(),
            "/markets/BTC-USD/last_trade"
        );
        assert_eq!(Destination::Market(key("EUR")).to_string(), "/market/EUR");
    }

    #[test]
    fn test_parse_templates() {
        assert_eq!(
            Destination::parse("/account/ACC1/updates"),
            Some(Destination::AccountUpdates(key("ACC1")))
        );
        assert_eq!(
            Destination::parse("/markets/ETH/depth"),
            Some(Destination::MarketDepth(key("ETH")))
        );
        assert_eq!(
            Destination::parse("/markets/ETH/last_trade"),
            Some(Destination::MarketLastTrade(key("ETH")))
        );
        assert_eq!(
            Destination::parse("/market/ETH"),
            Some(Destination::Market(key("ETH")))
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(Destination::parse("/account/ACC1/orders"), None);
        assert_eq!(Destination::parse("/markets/ETH/candles"), None);
        assert_eq!(Destination::parse("/account//updates"), None);
        assert_eq!(Destination::parse("/topic/anything"), None);
        assert_eq!(Destination::parse("/market/"), None);
    }

    #[test]
    fn test_keys_with_separators_do_not_collide() {
        let tricky = Destination::AccountUpdates(key("A/updates/x"));
        let rendered = tricky.to_string();
        assert_eq!(rendered, "/account/A%2Fupdates%2Fx/updates");
        assert_eq!(Destination::parse(&rendered), Some(tricky));
        assert_ne!(
            Destination::AccountUpdates(key("A/B")).to_string(),
            Destination::AccountUpdates(key("A%2FB")).to_string()
        );
    }

    #[test]
    fn test_parse_rejects_non_canonical_encoding() {
        assert_eq!(Destination::parse("/account/ACC%31/updates"), None);
        assert_eq!(Destination::parse("/markets/btc%2dusd/depth"), None);
        assert_eq!(
            Destination::parse("/account/A%2FB/updates"),
            Some(Destination::AccountUpdates(key("A/B")))
        );
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(EntityKey::new("").is_err());
        assert!(EntityKey::new("   ").is_err());
        assert!(serde_json::from_str::<EntityKey>("\"\"").is_err());
    }

    #[test]
    fn test_request_destinations() {
        assert_eq!(account_request(&key("ACC1")), "/account/ACC1/request");
        assert_eq!(market_request(&key("BTC")), "/markets/BTC/request");
    }
}
