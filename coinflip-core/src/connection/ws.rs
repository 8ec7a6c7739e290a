//! WebSocket channel using tokio-tungstenite

use super::{Connector, Transport};
use crate::error::Result;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>> {
        install_crypto_provider();

        let (stream, _response) = connect_async(url).await?;
        tracing::info!("Connected to coordinator at {}", url);

        Ok(Box::new(WsTransport { stream }))
    }
}

/// `wss://` needs a process-wide rustls provider; the first caller installs ring
fn install_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        // Losing the race to another installer is fine
        let _ = rustls::crypto::ring::default_provider().install_default();
    }
}

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Result<String>> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    tracing::info!("Coordinator sent close frame: {:?}", frame);
                    return None;
                }
                Ok(Message::Binary(data)) => {
                    tracing::debug!("Ignoring {} byte binary frame", data.len());
                }
                // tungstenite answers pings itself
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }

        None
    }
}
