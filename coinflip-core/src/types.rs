use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one participant, stable for a scene's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Room token partitioning players into independent matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipOutcome {
    Heads,
    Tails,
}

impl FlipOutcome {
    /// Uniform choice between heads and tails
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            FlipOutcome::Heads
        } else {
            FlipOutcome::Tails
        }
    }

    /// Upper-case label used in status text
    pub fn label(&self) -> &'static str {
        match self {
            FlipOutcome::Heads => "HEADS",
            FlipOutcome::Tails => "TAILS",
        }
    }
}

impl fmt::Display for FlipOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    MyTurn,
    OpponentTurn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Connecting,
    Online,
    Offline,
}

/// One applied flip, kept in memory for the running session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlipRecord {
    pub flipper: PlayerId,
    pub outcome: FlipOutcome,
    pub by_me: bool,
    pub timestamp: DateTime<Utc>,
}
