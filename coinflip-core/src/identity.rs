//! Player and room resolution from the launching environment.

use crate::types::{PlayerId, RoomId};
use std::collections::HashMap;
use url::Url;
use uuid::Uuid;

pub const USER_ID_ENV: &str = "COINFLIP_USER_ID";
pub const LAUNCH_URL_ENV: &str = "COINFLIP_LAUNCH_URL";
pub const ROOM_PARAM: &str = "room";

/// Read-only view of whatever launched the game.
pub trait HostEnvironment {
    /// User id supplied by an embedding platform, if any
    fn platform_user_id(&self) -> Option<String>;

    /// Launch query parameter by name
    fn query_param(&self, name: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    Platform,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub player_id: PlayerId,
    pub room: RoomId,
    pub source: IdentitySource,
    pub room_defaulted: bool,
}

/// Resolve who is playing and in which room. Never fails: a missing
/// platform id is replaced by a random one and a missing room by `default_room`.
pub fn resolve(host: &dyn HostEnvironment, default_room: &str) -> Identity {
    let (player_id, source) = match host.platform_user_id().filter(|id| !id.is_empty()) {
        Some(id) => (PlayerId::new(id), IdentitySource::Platform),
        None => (
            PlayerId::new(Uuid::new_v4().to_string()),
            IdentitySource::Generated,
        ),
    };

    let (room, room_defaulted) = match host.query_param(ROOM_PARAM).filter(|r| !r.is_empty()) {
        Some(room) => (RoomId::new(room), false),
        None => (RoomId::new(default_room), true),
    };

    tracing::debug!(
        "Resolved player {} ({:?}) in room {}",
        player_id,
        source,
        room
    );

    Identity {
        player_id,
        room,
        source,
        room_defaulted,
    }
}

/// Host environment backed by process environment variables and a launch URL.
#[derive(Debug, Clone, Default)]
pub struct LaunchContext {
    user_id: Option<String>,
    query: HashMap<String, String>,
}

impl LaunchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `COINFLIP_USER_ID` and the query string of `COINFLIP_LAUNCH_URL`
    pub fn from_env() -> Self {
        let mut context = Self::new();

        if let Ok(user_id) = std::env::var(USER_ID_ENV) {
            context.user_id = Some(user_id);
        }

        if let Ok(launch_url) = std::env::var(LAUNCH_URL_ENV) {
            context = context.with_launch_url(&launch_url);
        }

        context
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.query.insert(ROOM_PARAM.to_string(), room.into());
        self
    }

    /// Merge the query parameters of a launch URL. Unparsable URLs are ignored.
    pub fn with_launch_url(mut self, launch_url: &str) -> Self {
        match Url::parse(launch_url) {
            Ok(url) => {
                for (key, value) in url.query_pairs() {
                    self.query
                        .entry(key.into_owned())
                        .or_insert_with(|| value.into_owned());
                }
            }
            Err(e) => {
                tracing::warn!("Ignoring launch URL '{}': {}", launch_url, e);
            }
        }
        self
    }
}

impl HostEnvironment for LaunchContext {
    fn platform_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }

    fn query_param(&self, name: &str) -> Option<String> {
        self.query.get(name).cloned()
    }
}
