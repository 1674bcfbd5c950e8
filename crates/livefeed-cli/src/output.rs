//! Rendering of feed updates

use std::io::Write;

use chrono::{SecondsFormat, Utc};
use livefeed::{AccountEvent, AccountUpdate, LastTrade, MarketDepth};
use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliResult;

/// One printed update
#[derive(Debug, Clone, Serialize)]
pub struct FeedRecord<'a, T: Serialize> {
    /// Receive time (RFC 3339, UTC)
    pub received_at: String,
    /// Topic kind: account, depth, last_trade, market, notification
    pub topic: &'static str,
    /// Account or instrument key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<&'a str>,
    /// The payload as delivered
    pub payload: &'a T,
}

/// Writes updates to stdout in the selected format
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    /// Create a printer for `format`
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print an account update
    pub fn account(&self, key: &str, update: &AccountUpdate) {
        let summary = match update.event() {
            AccountEvent::Balance(b) => format!("balance cash={} v{}", b.cash, b.version_number),
            AccountEvent::Position(p) => format!(
                "position {} qty={} v{}",
                p.instrument_key, p.quantity, p.version_number
            ),
            AccountEvent::Trade(t) => {
                format!("trade {} {}@{}", t.instrument_key, t.quantity, t.price)
            }
            AccountEvent::Order(o) => {
                format!("order {} {} v{}", o.order_id, o.status, o.version_number)
            }
            AccountEvent::Empty => "empty update".to_string(),
        };
        self.emit("account", Some(key), update, &summary);
    }

    /// Print a depth snapshot
    pub fn depth(&self, depth: &MarketDepth) {
        let bid = depth.best_bid().map_or("-".to_string(), |l| format!("{}x{}", l.price, l.quantity));
        let ask = depth.best_ask().map_or("-".to_string(), |l| format!("{}x{}", l.price, l.quantity));
        let summary = format!("bid {bid} / ask {ask}");
        self.emit("depth", Some(&depth.instrument_key), depth, &summary);
    }

    /// Print a last-trade event
    pub fn last_trade(&self, trade: &LastTrade) {
        let summary = format!("{}@{}", trade.quantity, trade.price);
        self.emit("last_trade", Some(&trade.instrument_key), trade, &summary);
    }

    /// Print a legacy market payload
    pub fn market(&self, key: &str, value: &Value) {
        self.emit("market", Some(key), value, &value.to_string());
    }

    /// Print an out-of-band notification
    pub fn notification(&self, value: &Value) {
        self.emit("notification", None, value, &value.to_string());
    }

    fn emit<T: Serialize>(&self, topic: &'static str, key: Option<&str>, payload: &T, summary: &str) {
        let record = FeedRecord {
            received_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            topic,
            key,
            payload,
        };
        if let Err(e) = self.write(&record, summary, &mut std::io::stdout().lock()) {
            tracing::warn!(error = %e, "Failed to write update");
        }
    }

    fn write<T: Serialize>(
        &self,
        record: &FeedRecord<'_, T>,
        summary: &str,
        out: &mut impl Write,
    ) -> CliResult<()> {
        match self.format {
            OutputFormat::Human => {
                let key = record.key.unwrap_or("-");
                writeln!(out, "{} {:<12} {:<10} {}", record.received_at, record.topic, key, summary)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, record)?;
                writeln!(out)?;
            }
            OutputFormat::Compact => {
                serde_json::to_writer(&mut *out, record)?;
                writeln!(out)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(payload: &Value) -> FeedRecord<'_, Value> {
        FeedRecord {
            received_at: "2026-01-01T00:00:00.000Z".to_string(),
            topic: "market",
            key: Some("BTC-USD"),
            payload,
        }
    }

    #[test]
    fn test_human_line() {
        let payload = json!({"last": 1});
        let mut out = Vec::new();
        Printer::new(OutputFormat::Human)
            .write(&record(&payload), "summary", &mut out)
            .unwrap();
        let line = String::from_utf8(out).unwrap();
        assert!(line.starts_with("2026-01-01T00:00:00.000Z market "));
        assert!(line.contains("BTC-USD"));
        assert!(line.trim_end().ends_with("summary"));
    }

    #[test]
    fn test_compact_line_is_json() {
        let payload = json!({"last": 1});
        let mut out = Vec::new();
        Printer::new(OutputFormat::Compact)
            .write(&record(&payload), "ignored", &mut out)
            .unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["topic"], "market");
        assert_eq!(parsed["payload"]["last"], 1);
        assert_eq!(out.iter().filter(|b| **b == b'\n').count(), 1);
    }
}
