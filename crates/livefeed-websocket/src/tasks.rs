//! The per-socket task.
//!
//! One task owns one WebSocket stream for its whole life. It is the single reader and the
//! single writer of the stream, so no locking is needed around it.

use std::sync::Arc;

use futures::{SinkExt as _, StreamExt as _};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use livefeed_transport_traits::{TransportError, TransportEvents, validate_message_size};

use crate::config::WebSocketConfig;

/// Connects, then pumps frames until the peer closes, the stream fails, or the handle
/// cancels. Cancellation is silent: no events are emitted after it.
pub(crate) async fn run_socket(
    config: Arc<WebSocketConfig>,
    url: Url,
    events: TransportEvents,
    mut outbound: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    let connection = events.connection();

    let attempt = timeout(config.timeouts.connect, connect_async(url.as_str()));
    let stream = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(%connection, "Socket cancelled while connecting");
            return;
        }
        result = attempt => match result {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                warn!(%connection, %url, error = %e, "WebSocket connection failed");
                events.error(TransportError::ConnectionFailed(e.to_string()));
                events.closed(Some("connection failed".to_string()));
                return;
            }
            Err(_) => {
                let timeout = config.timeouts.connect;
                warn!(%connection, %url, ?timeout, "WebSocket connection timed out");
                events.error(TransportError::ConnectionTimeout { timeout });
                events.closed(Some("connection timed out".to_string()));
                return;
            }
        }
    };

    if cancel.is_cancelled() {
        return;
    }
    info!(%connection, %url, "WebSocket connected");
    events.opened();

    let (mut writer, mut reader) = stream.split();

    let reason = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                // Frames queued before close (DISCONNECT) still go out.
                while let Ok(text) = outbound.try_recv() {
                    if writer.send(Message::text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = writer.send(Message::Close(None)).await;
                debug!(%connection, "Socket closed by owner");
                return;
            }

            outgoing = outbound.recv() => {
                let Some(text) = outgoing else {
                    let _ = writer.send(Message::Close(None)).await;
                    debug!(%connection, "Socket handle dropped");
                    return;
                };
                trace!(%connection, bytes = text.len(), "Sending frame");
                if let Err(e) = writer.send(Message::text(text)).await {
                    events.error(TransportError::SendFailed(e.to_string()));
                    break Some(format!("send failed: {e}"));
                }
            }

            incoming = reader.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = validate_message_size(text.len(), &config.limits) {
                        warn!(%connection, error = %e, "Inbound message rejected");
                        events.error(e);
                        break Some("message too large".to_string());
                    }
                    events.message(text.as_str());
                }
                Some(Ok(Message::Binary(data))) => {
                    if let Err(e) = validate_message_size(data.len(), &config.limits) {
                        warn!(%connection, error = %e, "Inbound message rejected");
                        events.error(e);
                        break Some("message too large".to_string());
                    }
                    events.message(String::from_utf8_lossy(&data).into_owned());
                }
                Some(Ok(Message::Ping(data))) => {
                    if writer.send(Message::Pong(data)).await.is_ok() {
                        trace!(%connection, "Sent pong");
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(%connection, "WebSocket closed by peer");
                    break frame.map(|f| f.reason.as_str().to_string());
                }
                Some(Ok(_)) => {
                    trace!(%connection, "Ignoring control frame");
                }
                Some(Err(e)) => {
                    warn!(%connection, error = %e, "WebSocket error");
                    events.error(TransportError::ReceiveFailed(e.to_string()));
                    break Some(e.to_string());
                }
                None => {
                    info!(%connection, "WebSocket stream ended");
                    break None;
                }
            }
        }
    };

    if !cancel.is_cancelled() {
        events.closed(reason);
    }
    debug!(%connection, "Socket task terminated");
}
