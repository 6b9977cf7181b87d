//! Inbound update routing.
//!
//! Classifies each Telegram update and hands it to the dispatcher: slash
//! commands from typed messages, awaited free-text input, and inline-button
//! callbacks (including the generic "back" button).

use std::sync::Arc;
use std::time::Duration;

use pricewatch_channels::{TelegramChannel, TelegramUpdate};

use crate::commands::Dispatcher;

/// Routes Telegram updates into dispatcher calls. Shared between the
/// long-polling loop and the webhook endpoint.
pub struct UpdateHandler {
    channel: Arc<TelegramChannel>,
    dispatcher: Arc<Dispatcher>,
}

impl UpdateHandler {
    pub fn new(channel: Arc<TelegramChannel>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { channel, dispatcher }
    }

    /// Classify and dispatch one update. Handler errors are already reported
    /// to the chat by the dispatcher; they are logged here and swallowed so
    /// one bad update never takes down the ingestion loop.
    pub async fn handle_update(&self, update: TelegramUpdate) {
        if let Some(message) = update.message {
            let chat = message.chat.id;
            let Some(text) = message.text else {
                tracing::debug!(chat, "ignoring non-text message");
                return;
            };

            if text.starts_with('/') {
                // Typed commands start a fresh thread of interaction; no
                // back button and no message to edit in place.
                self.dispatcher.set_back_button(chat, false);
                if let Err(e) = self.dispatcher.handle_command(chat, &text, None, false).await {
                    tracing::warn!(chat, command = %text, "command failed: {e}");
                }
                return;
            }

            if self.dispatcher.awaiting_input(chat) {
                self.dispatcher.set_back_button(chat, true);
                if let Err(e) = self.dispatcher.handle_user_input(chat, &text, None).await {
                    tracing::warn!(chat, "input handling failed: {e}");
                }
                return;
            }

            tracing::debug!(chat, "ignoring plain text with no command awaiting input");
            return;
        }

        if let Some(query) = update.callback_query {
            let Some(message) = query.message else {
                tracing::warn!(callback_id = %query.id, "callback query carries no message");
                return;
            };
            let Some(data) = query.data else {
                tracing::warn!(callback_id = %query.id, "callback query carries no data");
                return;
            };
            let chat = message.chat.id;
            let message_id = message.message_id;

            // Button-driven interactions always get the back button.
            self.dispatcher.set_back_button(chat, true);
            let result = if data == "back" {
                self.dispatcher.handle_return(chat, Some(message_id)).await
            } else {
                self.dispatcher
                    .handle_command(chat, &data, Some(message_id), false)
                    .await
            };
            if let Err(e) = result {
                tracing::warn!(chat, data = %data, "callback handling failed: {e}");
            }
        }
    }

    /// Long-poll getUpdates forever. Poll failures back off and retry; the
    /// loop only ends with the process.
    pub async fn run_long_polling(&self) {
        let mut offset: i64 = 0;
        tracing::info!("starting long polling for updates");

        loop {
            let updates = match self.channel.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!("failed to fetch updates: {e}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                self.handle_update(update).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pricewatch_channels::TelegramUpdate;

    fn parse(raw: &str) -> TelegramUpdate {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_update_classification_fields() {
        let command = parse(
            r#"{"update_id": 1, "message": {"message_id": 2, "chat": {"id": 7, "type": "private"}, "text": "/run btc", "date": 0}}"#,
        );
        let text = command.message.unwrap().text.unwrap();
        assert!(text.starts_with('/'));

        let input = parse(
            r#"{"update_id": 2, "message": {"message_id": 3, "chat": {"id": 7, "type": "private"}, "text": "15m", "date": 0}}"#,
        );
        assert!(!input.message.unwrap().text.unwrap().starts_with('/'));

        let callback = parse(
            r#"{"update_id": 3, "callback_query": {"id": "9", "from": {"id": 5, "is_bot": false, "first_name": "Ada"}, "message": {"message_id": 4, "chat": {"id": 7, "type": "private"}, "date": 0}, "data": "back"}}"#,
        );
        assert_eq!(callback.callback_query.unwrap().data.as_deref(), Some("back"));
    }
}
