use crate::error::{CoinFlipError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ROOM: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub server_url: String,
    pub default_room: String,
    pub offline_only: bool,
    #[serde(rename = "connect_timeout_ms", with = "duration_ms")]
    pub connect_timeout: Duration,
    pub animation: AnimationTiming,
}

/// Durations of the flip animation stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTiming {
    /// One leg of the coin spin; the spin plays forward and back
    #[serde(rename = "coin_spin_ms", with = "duration_ms")]
    pub coin_spin: Duration,
    #[serde(rename = "result_reveal_ms", with = "duration_ms")]
    pub result_reveal: Duration,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            coin_spin: Duration::from_millis(500),
            result_reveal: Duration::from_millis(300),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:8080".to_string(),
            default_room: DEFAULT_ROOM.to_string(),
            offline_only: false,
            connect_timeout: Duration::from_secs(5),
            animation: AnimationTiming::default(),
        }
    }
}

impl GameConfig {
    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GameConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(CoinFlipError::config("Server URL cannot be empty"));
        }

        let url = Url::parse(&self.server_url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(CoinFlipError::config(format!(
                "Server URL must use ws:// or wss://, got {}://",
                url.scheme()
            )));
        }

        if self.default_room.is_empty() {
            return Err(CoinFlipError::config("Default room cannot be empty"));
        }

        if self.connect_timeout.is_zero() {
            return Err(CoinFlipError::config(
                "Connect timeout must be greater than 0",
            ));
        }

        if self.animation.coin_spin.is_zero() || self.animation.result_reveal.is_zero() {
            return Err(CoinFlipError::config(
                "Animation durations must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Durations are written as whole milliseconds in config files
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
