//! Connection to the room coordinator.
//!
//! The manager owns the socket for its whole life. It joins the room, waits
//! for `start`, then relays flip results until the channel fails. Whatever
//! goes wrong, the caller only ever sees a single [`ConnectionEvent::Offline`].

pub mod memory;
pub mod ws;

pub use ws::WsConnector;

use crate::error::{CoinFlipError, Result};
use crate::protocol::{parse_server_message, ClientMessage, ServerMessage};
use crate::types::{FlipOutcome, PlayerId, RoomId};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Opens bidirectional text channels to the coordinator.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>>;
}

/// An open text channel.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Next inbound text frame, `None` once the channel has closed
    async fn next_frame(&mut self) -> Option<Result<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Ready { your_turn: bool },
    FlipResult { flipper: PlayerId, result: FlipOutcome },
    Offline,
}

/// Send-only handle onto the connection task.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl Outbox {
    /// Outbox plus the receiving end, for callers that drive their own channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, message: ClientMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| CoinFlipError::ChannelClosed)
    }
}

pub struct ConnectionManager {
    url: String,
    connect_timeout: Duration,
    connector: Arc<dyn Connector>,
}

impl ConnectionManager {
    pub fn new(
        url: impl Into<String>,
        connect_timeout: Duration,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
            connector,
        }
    }

    /// Start the single connection attempt on the current runtime.
    ///
    /// Events are pushed into `events` in arrival order. The returned
    /// [`Outbox`] carries messages back out over the same socket. If the
    /// connection task dies without reporting, `Offline` is sent for it.
    pub fn spawn<E>(
        self,
        room: RoomId,
        player_id: PlayerId,
        events: mpsc::UnboundedSender<E>,
    ) -> Outbox
    where
        E: From<ConnectionEvent> + Send + 'static,
    {
        let (outbox, outbound) = Outbox::channel();
        let reported = Arc::new(AtomicBool::new(false));

        let task = {
            let events = events.clone();
            let reported = reported.clone();
            tokio::spawn(async move {
                self.run(room, player_id, events, outbound, reported).await;
            })
        };

        tokio::spawn(async move {
            if let Err(e) = task.await {
                tracing::error!("Connection task failed, going offline: {}", e);
                if !reported.swap(true, Ordering::SeqCst) {
                    let _ = events.send(E::from(ConnectionEvent::Offline));
                }
            }
        });

        outbox
    }

    async fn run<E>(
        self,
        room: RoomId,
        player_id: PlayerId,
        events: mpsc::UnboundedSender<E>,
        mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
        reported: Arc<AtomicBool>,
    ) where
        E: From<ConnectionEvent> + Send + 'static,
    {
        let emit = |event: ConnectionEvent| {
            if event == ConnectionEvent::Offline && reported.swap(true, Ordering::SeqCst) {
                return false;
            }
            events.send(E::from(event)).is_ok()
        };

        tracing::info!("Connecting to {} as {} in room {}", self.url, player_id, room);

        let mut transport = match self.open().await {
            Ok(transport) => transport,
            Err(e) => {
                tracing::warn!("Could not reach coordinator, going offline: {}", e);
                emit(ConnectionEvent::Offline);
                return;
            }
        };

        let join = ClientMessage::Join {
            room: room.clone(),
            player_id: player_id.clone(),
        };
        if let Err(e) = send_message(transport.as_mut(), &join).await {
            tracing::warn!("Failed to join room {}, going offline: {}", room, e);
            emit(ConnectionEvent::Offline);
            return;
        }

        let mut started = false;

        loop {
            tokio::select! {
                frame = transport.next_frame() => {
                    let text = match frame {
                        Some(Ok(text)) => text,
                        Some(Err(e)) => {
                            tracing::warn!("Channel error, going offline: {}", e);
                            emit(ConnectionEvent::Offline);
                            break;
                        }
                        None => {
                            tracing::info!("Coordinator closed the connection");
                            emit(ConnectionEvent::Offline);
                            break;
                        }
                    };

                    let delivered = match parse_server_message(&text) {
                        Some(ServerMessage::Start { your_turn }) => {
                            tracing::info!("Match started in room {} (my turn: {})", room, your_turn);
                            started = true;
                            emit(ConnectionEvent::Ready { your_turn })
                        }
                        Some(ServerMessage::FlipResult { flipper, result }) if started => {
                            tracing::debug!("{} flipped {}", flipper, result);
                            emit(ConnectionEvent::FlipResult { flipper, result })
                        }
                        Some(ServerMessage::FlipResult { .. }) => {
                            tracing::debug!("Ignoring flip result received before start");
                            true
                        }
                        None => true,
                    };

                    if !delivered {
                        tracing::debug!("Scene is gone, dropping connection");
                        break;
                    }
                }
                message = outbound.recv() => {
                    let Some(message) = message else {
                        tracing::debug!("Outbox dropped, dropping connection");
                        break;
                    };

                    if let Err(e) = send_message(transport.as_mut(), &message).await {
                        tracing::warn!("Send failed, going offline: {}", e);
                        emit(ConnectionEvent::Offline);
                        break;
                    }
                }
            }
        }
    }

    async fn open(&self) -> Result<Box<dyn Transport>> {
        match tokio::time::timeout(self.connect_timeout, self.connector.connect(&self.url)).await
        {
            Ok(result) => result,
            Err(_) => Err(CoinFlipError::ConnectTimeout(self.connect_timeout)),
        }
    }
}

async fn send_message(transport: &mut dyn Transport, message: &ClientMessage) -> Result<()> {
    let text = serde_json::to_string(message)?;
    transport.send_text(text).await
}
