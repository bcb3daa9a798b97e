//! Transport seam: how the session reaches the core.
//!
//! [`Connector`] opens links, [`Link`] is one live connection. The session
//! only ever holds one link. The production implementation runs over
//! `tokio-tungstenite`; tests substitute scripted links.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use master_core::TransportError;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A data frame delivered by a link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundFrame {
    /// Text frame.
    Text(String),
    /// Binary frame, decoded as UTF-8 text by the session.
    Binary(Vec<u8>),
}

/// One live bidirectional connection.
#[async_trait]
pub trait Link: Send {
    /// Write one text frame.
    async fn send_text(&mut self, frame: &str) -> Result<(), TransportError>;

    /// Next data frame.
    ///
    /// `None` means the peer closed the connection. Must be cancel-safe:
    /// dropping the future before it resolves loses no frame.
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, TransportError>>;

    /// Close the connection. Idempotent.
    async fn close(&mut self);
}

/// Opens links to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new link to `endpoint`.
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Link>, TransportError>;
}

/// WebSocket connector over `tokio-tungstenite`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Link>, TransportError> {
        let (ws, response) =
            connect_async(endpoint)
                .await
                .map_err(|e| TransportError::Connect {
                    endpoint: endpoint.to_owned(),
                    reason: e.to_string(),
                })?;
        debug!(endpoint, status = %response.status(), "websocket handshake complete");
        Ok(Box::new(WsLink {
            ws,
            closed: false,
        }))
    }
}

/// A live WebSocket link.
pub struct WsLink {
    ws: WsStream,
    closed: bool,
}

#[async_trait]
impl Link for WsLink {
    async fn send_text(&mut self, frame: &str) -> Result<(), TransportError> {
        self.ws
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn next_frame(&mut self) -> Option<Result<InboundFrame, TransportError>> {
        loop {
            let msg = match self.ws.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            };
            match msg {
                Message::Text(text) => return Some(Ok(InboundFrame::Text(text.as_str().to_owned()))),
                Message::Binary(bytes) => return Some(Ok(InboundFrame::Binary(bytes.to_vec()))),
                Message::Close(frame) => {
                    debug!(?frame, "peer sent close frame");
                    return None;
                }
                // tungstenite answers pings itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    trace!("skipping control frame");
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.ws.close(None).await {
            trace!(error = %e, "close on a dead socket");
        }
    }
}
