//! Pricewatch error type.

use thiserror::Error;

/// Errors produced across the pricewatch crates.
#[derive(Debug, Error)]
pub enum PricewatchError {
    /// Configuration is missing, unreadable, or invalid.
    #[error("config error: {0}")]
    Config(String),

    /// Chat transport failure (Telegram API).
    #[error("channel error: {0}")]
    Channel(String),

    /// Data fetch failed (network, HTTP status).
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Fetched data could not be extracted or parsed into a number.
    #[error("extract error: {0}")]
    Extract(String),

    /// Command references a tracker code not present in the configuration.
    #[error("unrecognized tracker code: {0}")]
    UnknownTracker(String),

    /// Inbound command is not in the command table.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Interval string could not be parsed.
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PricewatchError>;
