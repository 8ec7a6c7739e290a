use anyhow::Context;
use coinflip_core::GameConfig;
use std::path::{Path, PathBuf};

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coinflip")
        .join("config.json")
}

/// An explicit path must exist; the default one is optional.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<GameConfig> {
    match path {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let path = default_config_path();
            if path.exists() {
                GameConfig::load(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))
            } else {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(GameConfig::default())
            }
        }
    }
}
