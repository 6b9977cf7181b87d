//! # Pricewatch Bot
//!
//! The interactive layer: command dispatching, per-chat navigation state,
//! menu construction, and update ingestion via long polling or webhook.

pub mod commands;
pub mod menus;
pub mod navigation;
pub mod updates;
pub mod webhook;

pub use commands::Dispatcher;
pub use updates::UpdateHandler;
