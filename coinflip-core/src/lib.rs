//! coinflip core - turn and connection state machine for a two-player coin flip
//!
//! Players either meet in a room on a remote coordinator over a WebSocket,
//! or fall back to an offline test mode where one client plays every turn.

pub mod animation;
pub mod config;
pub mod connection;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod scene;
pub mod session;
pub mod types;

pub use config::{AnimationTiming, GameConfig};
pub use connection::{ConnectionEvent, ConnectionManager, Connector, Outbox, WsConnector};
pub use error::{CoinFlipError, Result};
pub use identity::{HostEnvironment, Identity, IdentitySource, LaunchContext};
pub use scene::{GameScene, SceneEvent, ScenePhase, View};
pub use session::Session;
pub use types::{ConnectionState, FlipOutcome, FlipRecord, PlayerId, RoomId, TurnState};
