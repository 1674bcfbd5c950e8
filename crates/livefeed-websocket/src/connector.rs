//! Connector and socket handle.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use livefeed_transport_traits::{
    ConnectionId, TransportConnector, TransportError, TransportEvents, TransportHandle,
    TransportResult, TransportType,
};

use crate::config::WebSocketConfig;
use crate::tasks;

/// Opens WebSocket sockets for a session.
///
/// Each `open` spawns one socket task on the ambient tokio runtime. The task connects,
/// reports `Opened`, then pumps frames in both directions until either side closes.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    config: Arc<WebSocketConfig>,
    url: Url,
}

impl WebSocketConnector {
    /// Creates a connector after validating `config`.
    pub fn new(config: WebSocketConfig) -> TransportResult<Self> {
        let url = config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            url,
        })
    }

    /// Creates a connector for `url` with default settings.
    pub fn for_url(url: impl Into<String>) -> TransportResult<Self> {
        Self::new(WebSocketConfig::new(url))
    }

    /// The configuration in use.
    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }
}

impl TransportConnector for WebSocketConnector {
    fn transport_type(&self) -> TransportType {
        TransportType::WebSocket
    }

    fn endpoint(&self) -> String {
        self.url.to_string()
    }

    fn open(&self, events: TransportEvents) -> TransportResult<Box<dyn TransportHandle>> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            TransportError::ConfigurationError(
                "WebSocket transport requires a tokio runtime".to_string(),
            )
        })?;

        let connection = events.connection();
        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_buffer);
        let cancel = CancellationToken::new();

        runtime.spawn(tasks::run_socket(
            self.config.clone(),
            self.url.clone(),
            events,
            outbound_rx,
            cancel.clone(),
        ));
        debug!(%connection, url = %self.url, "Spawned socket task");

        Ok(Box::new(WebSocketHandle {
            connection,
            outbound: outbound_tx,
            cancel,
        }))
    }
}

/// Handle to one socket task. Dropping it closes the socket.
struct WebSocketHandle {
    connection: ConnectionId,
    outbound: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl TransportHandle for WebSocketHandle {
    fn send(&self, text: String) -> TransportResult<()> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::NotConnected);
        }
        self.outbound.try_send(text).map_err(|e| match e {
            TrySendError::Full(_) => {
                TransportError::SendFailed("outbound queue is full".to_string())
            }
            TrySendError::Closed(_) => TransportError::NotConnected,
        })
    }

    fn close(&self) {
        if !self.cancel.is_cancelled() {
            debug!(connection = %self.connection, "Closing socket");
            self.cancel.cancel();
        }
    }
}

impl Drop for WebSocketHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for WebSocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketHandle")
            .field("connection", &self.connection)
            .field("closed", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livefeed_transport_traits::{TransportEvent, TransportEventHandler};
    use std::sync::Weak;

    struct Sink;

    impl TransportEventHandler for Sink {
        fn on_transport_event(&self, _connection: ConnectionId, _event: TransportEvent) {}
    }

    fn detached_events() -> TransportEvents {
        let handler: Weak<dyn TransportEventHandler> = Weak::<Sink>::new();
        TransportEvents::new(ConnectionId(1), handler)
    }

    #[test]
    fn test_connector_rejects_invalid_config() {
        assert!(WebSocketConnector::for_url("ftp://example.com").is_err());
        let connector = WebSocketConnector::for_url("ws://127.0.0.1:9/ws").unwrap();
        assert_eq!(connector.transport_type(), TransportType::WebSocket);
        assert_eq!(connector.endpoint(), "ws://127.0.0.1:9/ws");
    }

    #[test]
    fn test_open_requires_runtime() {
        let connector = WebSocketConnector::for_url("ws://127.0.0.1:9/ws").unwrap();
        assert!(matches!(
            connector.open(detached_events()),
            Err(TransportError::ConfigurationError(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_handle_rejects_send() {
        let connector = WebSocketConnector::for_url("ws://127.0.0.1:9/ws").unwrap();
        let handle = connector.open(detached_events()).unwrap();
        handle.close();
        assert_eq!(
            handle.send("CONNECT\n\n\0".to_string()),
            Err(TransportError::NotConnected)
        );
    }

    #[test]
    fn test_full_queue_reports_send_failure() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = WebSocketHandle {
            connection: ConnectionId(9),
            outbound: tx,
            cancel: CancellationToken::new(),
        };

        assert!(handle.send("one".to_string()).is_ok());
        assert!(matches!(
            handle.send("two".to_string()),
            Err(TransportError::SendFailed(_))
        ));
    }
}
