//! The messaging seam between the core logic and the chat transport.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatId, InlineMenu, MessageId, ReplyKeyboard};

/// Outbound messaging operations the trackers and the command dispatcher
/// rely on. Text is HTML-formatted; the implementation owns the wire format.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send an HTML text message.
    async fn send_text(&self, chat: ChatId, html: &str) -> Result<()>;

    /// Send an HTML text message with an inline menu attached.
    async fn send_text_with_menu(&self, chat: ChatId, html: &str, menu: &InlineMenu) -> Result<()>;

    /// Edit an existing message in place, replacing text and menu.
    async fn edit_message(
        &self,
        chat: ChatId,
        message_id: MessageId,
        html: &str,
        menu: &InlineMenu,
    ) -> Result<()>;

    /// Send an HTML text message showing a custom reply keyboard.
    async fn send_text_with_reply_keyboard(
        &self,
        chat: ChatId,
        html: &str,
        keyboard: &ReplyKeyboard,
    ) -> Result<()>;

    /// Dismiss any active custom reply keyboard in the chat.
    async fn remove_reply_keyboard(&self, chat: ChatId) -> Result<()>;
}
