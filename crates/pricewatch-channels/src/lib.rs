//! # Pricewatch Channels
//! Chat transport implementations. Telegram is the only channel today; the
//! `Messenger` trait in pricewatch-core is the seam for adding more.

pub mod telegram;

pub use telegram::{TelegramChannel, TelegramUpdate};
