//! # Pricewatch Core
//!
//! Shared foundation for the pricewatch workspace: the error type,
//! configuration loading, the `Messenger` trait that every chat transport
//! implements, and the interval duration format used in commands and config.

pub mod config;
pub mod duration;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{CompareOp, NotifyCriterion, SourceKind, TrackerConfig, WatchConfig};
pub use duration::{format_duration, parse_duration};
pub use error::{PricewatchError, Result};
pub use traits::Messenger;
pub use types::{ChatId, InlineButton, InlineMenu, MessageId, ReplyKeyboard};
