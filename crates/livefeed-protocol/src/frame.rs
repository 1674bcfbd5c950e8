//! Line-oriented frame codec.
//!
//! A frame on the wire is a command line, zero or more `name:value` header lines, a blank
//! line, an optional body and a single NUL terminator:
//!
//! ```text
//! COMMAND
//! header-name:header-value
//!
//! body\0
//! ```
//!
//! Decoding is deliberately narrow. Only `CONNECTED`, `MESSAGE` and `ERROR` are parsed as
//! frames; any other text is offered to a JSON fallback so that out-of-band server
//! notifications still surface. MESSAGE bodies are rebuilt by concatenating every line
//! after the blank separator, so a newline embedded in a body is lost. `content-length`
//! is never consulted.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::error::{ProtocolError, ProtocolResult};

/// Byte that terminates every frame.
pub const FRAME_TERMINATOR: char = '\0';

/// Protocol version advertised in CONNECT.
pub const DEFAULT_ACCEPT_VERSION: &str = "1.2";

/// Content type of SEND bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Frame commands understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client handshake.
    Connect,
    /// Server handshake acknowledgement.
    Connected,
    /// Server push for a subscribed destination.
    Message,
    /// Open a subscription.
    Subscribe,
    /// Close a subscription.
    Unsubscribe,
    /// Client request.
    Send,
    /// Graceful client goodbye.
    Disconnect,
    /// Server-side error report.
    Error,
}

impl Command {
    /// Wire spelling of the command.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Message => "MESSAGE",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Send => "SEND",
            Self::Disconnect => "DISCONNECT",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "CONNECTED" => Ok(Self::Connected),
            "MESSAGE" => Ok(Self::Message),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "SEND" => Ok(Self::Send),
            "DISCONNECT" => Ok(Self::Disconnect),
            "ERROR" => Ok(Self::Error),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// A parsed or to-be-encoded protocol frame.
///
/// Header lookup is by name; the first occurrence of a repeated header wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    /// Header name/value pairs in wire order.
    pub headers: Vec<(String, String)>,
    /// Optional body.
    pub body: Option<String>,
}

impl Frame {
    /// Create a frame with no headers and no body.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header, replacing an existing header of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Look up a header by name.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `destination` header, if any.
    pub fn destination(&self) -> Option<&str> {
        self.get_header("destination")
    }

    /// CONNECT frame advertising `accept_version`.
    pub fn connect(accept_version: &str) -> Self {
        Self::new(Command::Connect).header("accept-version", accept_version)
    }

    /// SUBSCRIBE frame with automatic acknowledgement.
    pub fn subscribe(id: u64, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .header("id", id.to_string())
            .header("destination", destination)
            .header("ack", "auto")
    }

    /// UNSUBSCRIBE frame for subscription `id`.
    pub fn unsubscribe(id: u64) -> Self {
        Self::new(Command::Unsubscribe).header("id", id.to_string())
    }

    /// SEND frame carrying `body` serialized as JSON.
    ///
    /// `content-length` is the UTF-8 byte length of the serialized body.
    pub fn send_json<T: Serialize>(destination: &str, body: &T) -> ProtocolResult<Self> {
        let body = serde_json::to_string(body)?;
        Ok(Self::new(Command::Send)
            .header("destination", destination)
            .header("content-type", JSON_CONTENT_TYPE)
            .header("content-length", body.len().to_string())
            .with_body(body))
    }

    /// DISCONNECT frame.
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// Encode to wire text.
    pub fn encode(&self) -> String {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect();
        encode(self.command, &headers, self.body.as_deref())
    }
}

/// Result of decoding one piece of inbound wire text.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Handshake acknowledgement.
    Connected,
    /// A MESSAGE frame with a destination and a non-empty body.
    Message(Frame),
    /// An ERROR frame reported by the server.
    Error {
        /// The `message` header, if present.
        message: Option<String>,
        /// The frame body, if present.
        body: Option<String>,
    },
    /// Non-frame JSON pushed out-of-band by the server.
    Notification(serde_json::Value),
}

/// Encode a frame to wire text.
pub fn encode(command: Command, headers: &[(&str, &str)], body: Option<&str>) -> String {
    let body = body.unwrap_or_default();
    let headers_len: usize = headers.iter().map(|(n, v)| n.len() + v.len() + 2).sum();
    let mut out = String::with_capacity(command.as_str().len() + headers_len + body.len() + 3);

    out.push_str(command.as_str());
    out.push('\n');
    for (name, value) in headers {
        out.push_str(name);
        out.push(':');
        out.push_str(value);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(body);
    out.push(FRAME_TERMINATOR);
    out
}

/// Decode wire text, discarding anything that is not usable.
///
/// The reason a piece of text was discarded is logged at debug level.
pub fn decode(text: &str) -> Option<Inbound> {
    match try_decode(text) {
        Ok(inbound) => Some(inbound),
        Err(err) => {
            debug!(error = %err, "Discarding inbound wire text");
            None
        }
    }
}

/// Split one transport message into the frames it carries.
///
/// Each frame ends at the terminator; a trailing chunk without one is yielded as is.
/// Chunks consisting only of line breaks are skipped.
pub fn split_frames(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(FRAME_TERMINATOR)
        .filter(|chunk| !chunk.trim_matches(['\r', '\n']).is_empty())
}

/// Decode wire text, reporting why it was unusable.
pub fn try_decode(text: &str) -> ProtocolResult<Inbound> {
    // Stray line breaks (heart-beat style) before the command are skipped.
    let text = text.trim_start_matches(['\r', '\n']);
    if text.trim_end_matches(FRAME_TERMINATOR).is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }

    let mut lines = text.split('\n').map(|line| line.trim_end_matches('\r'));
    let command_line = lines.next().unwrap_or_default();

    match command_line.trim_end_matches(FRAME_TERMINATOR) {
        "CONNECTED" => Ok(Inbound::Connected),
        "MESSAGE" => decode_message(lines),
        "ERROR" => {
            let frame = decode_frame(Command::Error, lines);
            Ok(Inbound::Error {
                message: frame.get_header("message").map(str::to_string),
                body: frame.body,
            })
        }
        _ => decode_notification(text),
    }
}

fn decode_message<'a>(lines: impl Iterator<Item = &'a str>) -> ProtocolResult<Inbound> {
    let frame = decode_frame(Command::Message, lines);
    let destination = frame
        .destination()
        .ok_or(ProtocolError::MissingDestination)?;
    if frame.body.as_deref().is_none_or(str::is_empty) {
        return Err(ProtocolError::EmptyBody {
            destination: destination.to_string(),
        });
    }
    Ok(Inbound::Message(frame))
}

/// Scan header lines up to the first blank line; everything after it, up to the
/// terminator, is the body.
fn decode_frame<'a>(command: Command, mut lines: impl Iterator<Item = &'a str>) -> Frame {
    let mut frame = Frame::new(command);

    while let Some(line) = lines.next() {
        if line.is_empty() {
            let body: String = lines.by_ref().collect();
            let body = match body.find(FRAME_TERMINATOR) {
                Some(end) => body[..end].to_string(),
                None => body,
            };
            frame.body = Some(body);
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && frame.get_header(name).is_none()
        {
            frame.headers.push((name.to_string(), value.to_string()));
        }
    }

    frame
}

fn decode_notification(text: &str) -> ProtocolResult<Inbound> {
    let trimmed = text.trim_end_matches(FRAME_TERMINATOR).trim();
    serde_json::from_str(trimmed)
        .map(Inbound::Notification)
        .map_err(|_| ProtocolError::Unrecognized(trimmed.chars().take(64).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_frames() {
        let text = "CONNECTED\n\n\0\nMESSAGE\ndestination:/a\n\n{}\0\n";
        let chunks: Vec<&str> = split_frames(text).collect();
        assert_eq!(
            chunks,
            vec!["CONNECTED\n\n\0", "\nMESSAGE\ndestination:/a\n\n{}\0"]
        );

        let single: Vec<&str> = split_frames("{\"event\":\"ping\"}").collect();
        assert_eq!(single, vec!["{\"event\":\"ping\"}"]);
    }

    #[test]
    fn test_encode_subscribe_frame() {
        let wire = Frame::subscribe(3, "/account/ACC1/updates").encode();
        assert_eq!(
            wire,
            "SUBSCRIBE\nid:3\ndestination:/account/ACC1/updates\nack:auto\n\n\0"
        );
    }

    #[test]
    fn test_encode_without_headers_or_body() {
        assert_eq!(Frame::disconnect().encode(), "DISCONNECT\n\n\0");
        assert_eq!(
            encode(Command::Connect, &[("accept-version", "1.2")], None),
            "CONNECT\naccept-version:1.2\n\n\0"
        );
    }

    #[test]
    fn test_send_json_sets_content_headers() {
        let frame =
            Frame::send_json("/account/A/request", &serde_json::json!({"scope": "é"})).unwrap();
        let body = frame.body.clone().unwrap();
        assert_eq!(frame.get_header("content-type"), Some(JSON_CONTENT_TYPE));
        assert_eq!(
            frame.get_header("content-length"),
            Some(body.len().to_string().as_str())
        );
        assert!(frame.encode().ends_with(&format!("\n\n{body}\0")));
    }

    #[test]
    fn test_header_replaces_existing() {
        let frame = Frame::new(Command::Send).header("a", "1").header("a", "2");
        assert_eq!(frame.headers.len(), 1);
        assert_eq!(frame.get_header("a"), Some("2"));
    }

    #[test]
    fn test_decode_connected() {
        let inbound = try_decode("CONNECTED\nversion:1.2\n\n\0").unwrap();
        assert_eq!(inbound, Inbound::Connected);
    }

    #[test]
    fn test_decode_message() {
        let wire = "MESSAGE\ndestination:/markets/BTC/depth\nsubscription:1\n\n{\"a\":1}\0";
        let Inbound::Message(frame) = try_decode(wire).unwrap() else {
            panic!("expected a MESSAGE frame");
        };
        assert_eq!(frame.destination(), Some("/markets/BTC/depth"));
        assert_eq!(frame.get_header("subscription"), Some("1"));
        assert_eq!(frame.body.as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_decode_message_concatenates_body_lines() {
        let wire = "MESSAGE\ndestination:/d\n\n{\"a\":\n1}\n\0";
        let Some(Inbound::Message(frame)) = decode(wire) else {
            panic!("expected a MESSAGE frame");
        };
        assert_eq!(frame.body.as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_decode_message_value_keeps_colons() {
        let wire = "MESSAGE\ndestination:/d\nx-time:12:30:00\n\nbody\0";
        let Some(Inbound::Message(frame)) = decode(wire) else {
            panic!("expected a MESSAGE frame");
        };
        assert_eq!(frame.get_header("x-time"), Some("12:30:00"));
    }

    #[test]
    fn test_decode_crlf_and_leading_newlines() {
        let wire = "\n\nMESSAGE\r\ndestination:/d\r\n\r\nbody\0";
        let Some(Inbound::Message(frame)) = decode(wire) else {
            panic!("expected a MESSAGE frame");
        };
        assert_eq!(frame.destination(), Some("/d"));
        assert_eq!(frame.body.as_deref(), Some("body"));
    }

    #[test]
    fn test_decode_message_without_destination_is_discarded() {
        assert_eq!(
            try_decode("MESSAGE\nsubscription:1\n\n{}\0"),
            Err(ProtocolError::MissingDestination)
        );
        assert!(decode("MESSAGE\nsubscription:1\n\n{}\0").is_none());
    }

    #[test]
    fn test_decode_message_without_body_is_discarded() {
        assert!(matches!(
            try_decode("MESSAGE\ndestination:/d\n\n\0"),
            Err(ProtocolError::EmptyBody { .. })
        ));
        assert!(matches!(
            try_decode("MESSAGE\ndestination:/d\n"),
            Err(ProtocolError::EmptyBody { .. })
        ));
    }

    #[test]
    fn test_decode_error_frame() {
        let inbound = try_decode("ERROR\nmessage:bad subscription\n\ndetails\0").unwrap();
        assert_eq!(
            inbound,
            Inbound::Error {
                message: Some("bad subscription".to_string()),
                body: Some("details".to_string()),
            }
        );
    }

    #[test]
    fn test_decode_json_notification() {
        let inbound = try_decode("{\"error\":\"session expired\"}").unwrap();
        assert_eq!(
            inbound,
            Inbound::Notification(serde_json::json!({"error": "session expired"}))
        );
    }

    #[test]
    fn test_decode_garbage_is_swallowed() {
        assert!(decode("RECEIPT\nreceipt-id:1\n\n\0").is_none());
        assert!(decode("not a frame").is_none());
        assert_eq!(try_decode("\n"), Err(ProtocolError::EmptyFrame));
        assert_eq!(try_decode(""), Err(ProtocolError::EmptyFrame));
    }

    #[test]
    fn test_command_parse() {
        assert_eq!("SUBSCRIBE".parse::<Command>().unwrap(), Command::Subscribe);
        assert!("subscribe".parse::<Command>().is_err());
        assert_eq!(Command::Unsubscribe.to_string(), "UNSUBSCRIBE");
    }
}
