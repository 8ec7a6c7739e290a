use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoinFlipError>;

#[derive(Error, Debug)]
pub enum CoinFlipError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection attempt timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoinFlipError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

// conversion from the websocket stack
impl From<tokio_tungstenite::tungstenite::Error> for CoinFlipError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        CoinFlipError::Transport(err.to_string())
    }
}
