//! In-process channel with a scriptable coordinator end.

use super::{Connector, Transport};
use crate::error::{CoinFlipError, Result};
use crate::protocol::{ClientMessage, ServerMessage};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

enum Frame {
    Text(String),
    Error(String),
}

/// Create a connector that hands out one in-memory transport, plus the
/// coordinator side of it.
pub fn memory_channel() -> (MemoryConnector, RemoteEnd) {
    let (to_client, inbound) = mpsc::unbounded_channel();
    let (outbound, from_client) = mpsc::unbounded_channel();

    let connector = MemoryConnector {
        transport: Mutex::new(Some(MemoryTransport { inbound, outbound })),
    };
    let remote = RemoteEnd {
        to_client,
        from_client,
    };

    (connector, remote)
}

pub struct MemoryConnector {
    transport: Mutex<Option<MemoryTransport>>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>> {
        let transport = self
            .transport
            .lock()
            .take()
            .ok_or_else(|| CoinFlipError::transport("memory channel already in use"))?;

        tracing::debug!("Opened in-memory channel for {}", url);
        Ok(Box::new(transport))
    }
}

/// Connector for an unreachable coordinator.
pub struct RefusingConnector;

#[async_trait]
impl Connector for RefusingConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>> {
        Err(CoinFlipError::transport(format!(
            "connection to {} refused",
            url
        )))
    }
}

/// Connector whose handshake never completes.
pub struct HangingConnector;

#[async_trait]
impl Connector for HangingConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Transport>> {
        std::future::pending::<()>().await;
        Err(CoinFlipError::internal("pending future resolved"))
    }
}

pub struct MemoryTransport {
    inbound: mpsc::UnboundedReceiver<Frame>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.outbound
            .send(text)
            .map_err(|_| CoinFlipError::ChannelClosed)
    }

    async fn next_frame(&mut self) -> Option<Result<String>> {
        match self.inbound.recv().await? {
            Frame::Text(text) => Some(Ok(text)),
            Frame::Error(msg) => Some(Err(CoinFlipError::transport(msg))),
        }
    }
}

/// The coordinator's side of a memory channel.
pub struct RemoteEnd {
    to_client: mpsc::UnboundedSender<Frame>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl RemoteEnd {
    pub fn send(&self, message: &ServerMessage) {
        if let Ok(text) = serde_json::to_string(message) {
            self.send_raw(&text);
        }
    }

    pub fn send_raw(&self, text: &str) {
        let _ = self.to_client.send(Frame::Text(text.to_string()));
    }

    /// Deliver a channel-level error to the client
    pub fn fail(&self, reason: &str) {
        let _ = self.to_client.send(Frame::Error(reason.to_string()));
    }

    /// Close the channel after any frames already sent
    pub fn close(self) {}

    pub async fn recv_raw(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Next message from the client; `None` once the client side is gone
    pub async fn recv_client(&mut self) -> Option<ClientMessage> {
        let text = self.recv_raw().await?;
        serde_json::from_str(&text).ok()
    }
}
