//! JSON messages exchanged with the room coordinator.
//!
//! Every frame is a single JSON object tagged by its `type` field.

use crate::types::{FlipOutcome, PlayerId, RoomId};
use serde::{Deserialize, Serialize};

/// Messages sent by this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Register this player in a room
    #[serde(rename_all = "camelCase")]
    Join { room: RoomId, player_id: PlayerId },

    /// Report the outcome this client picked for its flip
    #[serde(rename_all = "camelCase")]
    Flip {
        room: RoomId,
        player_id: PlayerId,
        result: FlipOutcome,
    },
}

/// Messages received from the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Both participants joined; assigns the opening turn
    #[serde(rename_all = "camelCase")]
    Start { your_turn: bool },

    /// Outcome of a flip, broadcast to both participants
    FlipResult {
        flipper: PlayerId,
        result: FlipOutcome,
    },
}

/// Parse an inbound frame. Anything that is not a known message is dropped.
pub fn parse_server_message(text: &str) -> Option<ServerMessage> {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            tracing::debug!("Ignoring unrecognized frame ({}): {}", e, text);
            None
        }
    }
}
