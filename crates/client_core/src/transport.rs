use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use url::Url;

/// What an established connection reports after the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(String),
    Closed { reason: Option<String> },
    Failed(String),
}

/// Opens live connections. A successful `connect` is the transport's
/// confirmation that the connection is ready.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn TransportConnection>>;
}

#[async_trait]
pub trait TransportConnection: Send {
    /// Next inbound event, or `None` once the underlying stream has ended.
    /// Must be cancel safe.
    async fn next_event(&mut self) -> Option<TransportEvent>;
    async fn close(&mut self) -> Result<()>;
}

/// Websocket transport backed by `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &Url) -> Result<Box<dyn TransportConnection>> {
        let (stream, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("failed to connect websocket: {url}"))?;
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl TransportConnection for WsConnection {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(TransportEvent::Message(text)),
                Ok(Message::Close(frame)) => {
                    let reason = frame
                        .map(|frame| frame.reason.to_string())
                        .filter(|reason| !reason.is_empty());
                    return Some(TransportEvent::Closed { reason });
                }
                // ping/pong are answered by tungstenite; binary frames are not part of the feed
                Ok(_) => continue,
                Err(err) => return Some(TransportEvent::Failed(err.to_string())),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream
            .close(None)
            .await
            .context("failed to close websocket")
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
