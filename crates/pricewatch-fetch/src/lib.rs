//! # Pricewatch Fetch
//!
//! Data-fetch strategies: the pluggable mechanism that turns a tracker's
//! configuration into a numeric sample. Two variants exist — API-backed
//! (HTTP GET + JSON path extraction) and scrape-backed (HTTP GET + CSS
//! selector extraction). Both consult the notification criteria evaluator
//! on every successful sample and deliver any resulting alert to the
//! tracker's chat before returning.
//!
//! The trait seam exists so new fetch mechanisms can be added without
//! touching the tracker loop.

pub mod api;
pub mod criteria;
pub mod scrape;

use std::sync::Arc;

use async_trait::async_trait;

use pricewatch_core::{ChatId, Messenger, Result, SourceKind, TrackerConfig};

pub use api::ApiFetcher;
pub use scrape::ScrapeFetcher;

/// A pluggable data-fetch mechanism bound to a messaging collaborator.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Fetch one sample for `tracker`, evaluate its notification criteria,
    /// send any resulting alert to `chat`, and return the sampled value
    /// formatted with two decimals.
    async fn execute(&self, tracker: &TrackerConfig, chat: ChatId) -> Result<String>;
}

/// Build the fetch strategy for a tracker's source kind.
pub fn strategy_for(kind: SourceKind, messenger: Arc<dyn Messenger>) -> Arc<dyn FetchStrategy> {
    match kind {
        SourceKind::Api => Arc::new(ApiFetcher::new(messenger)),
        SourceKind::Scrape => Arc::new(ScrapeFetcher::new(messenger)),
    }
}

/// Run the criteria evaluator and deliver the notification, shared by both
/// strategy variants.
pub(crate) async fn notify_if_matched(
    messenger: &dyn Messenger,
    tracker: &TrackerConfig,
    chat: ChatId,
    value: f64,
) -> Result<()> {
    if let Some(message) = criteria::evaluate(tracker, value) {
        tracing::info!(code = %tracker.code, value, "notification criterion matched");
        messenger.send_text(chat, &message).await?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pricewatch_core::{InlineMenu, MessageId, ReplyKeyboard};
    use std::sync::Mutex;

    /// Messenger double that records every outbound text.
    #[derive(Default)]
    pub struct RecordingMessenger {
        sent: Mutex<Vec<(ChatId, String)>>,
    }

    impl RecordingMessenger {
        pub fn sent(&self) -> Vec<(ChatId, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_text(&self, chat: ChatId, html: &str) -> Result<()> {
            self.sent.lock().unwrap().push((chat, html.to_string()));
            Ok(())
        }

        async fn send_text_with_menu(
            &self,
            chat: ChatId,
            html: &str,
            _menu: &InlineMenu,
        ) -> Result<()> {
            self.send_text(chat, html).await
        }

        async fn edit_message(
            &self,
            chat: ChatId,
            _message_id: MessageId,
            html: &str,
            _menu: &InlineMenu,
        ) -> Result<()> {
            self.send_text(chat, html).await
        }

        async fn send_text_with_reply_keyboard(
            &self,
            chat: ChatId,
            html: &str,
            _keyboard: &ReplyKeyboard,
        ) -> Result<()> {
            self.send_text(chat, html).await
        }

        async fn remove_reply_keyboard(&self, _chat: ChatId) -> Result<()> {
            Ok(())
        }
    }
}
