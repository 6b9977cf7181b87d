//! Telegram Bot channel — long polling + message sending via Bot API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use pricewatch_core::{
    ChatId, InlineMenu, Messenger, MessageId, PricewatchError, ReplyKeyboard, Result,
};

/// Telegram Bot API client. Sends are stateless; the long-poll offset is
/// owned by the caller so the client can be shared behind an `Arc`.
pub struct TelegramChannel {
    bot_token: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.bot_token, method)
    }

    /// POST a method call and unwrap the Bot API envelope.
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| PricewatchError::Channel(format!("{method} failed: {e}")))?;

        let envelope: TelegramApiResponse<T> = response
            .json()
            .await
            .map_err(|e| PricewatchError::Channel(format!("invalid {method} response: {e}")))?;

        if !envelope.ok {
            return Err(PricewatchError::Channel(format!(
                "{method} error: {}",
                envelope.description.unwrap_or_default()
            )));
        }
        envelope
            .result
            .ok_or_else(|| PricewatchError::Channel(format!("{method} returned no result")))
    }

    /// Get bot info.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        self.call("getMe", &json!({})).await
    }

    /// Long-poll for new updates past `offset`. Listens for both plain
    /// messages and inline-button callbacks.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": 30,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    /// Register the webhook endpoint with Telegram.
    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        let _: serde_json::Value = self.call("setWebhook", &json!({ "url": url })).await?;
        tracing::info!(url, "telegram webhook set");
        Ok(())
    }

    /// Remove any registered webhook (required before long polling).
    pub async fn delete_webhook(&self) -> Result<()> {
        let _: serde_json::Value = self.call("deleteWebhook", &json!({})).await?;
        tracing::info!("telegram webhook deleted");
        Ok(())
    }

    async fn send_message(
        &self,
        chat: ChatId,
        html: &str,
        reply_markup: Option<serde_json::Value>,
    ) -> Result<TelegramMessage> {
        let mut body = json!({
            "chat_id": chat,
            "text": html,
            "parse_mode": "HTML",
        });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = markup;
        }
        let sent: TelegramMessage = self.call("sendMessage", &body).await?;
        tracing::debug!(chat, message_id = sent.message_id, "message sent");
        Ok(sent)
    }

    pub async fn delete_message(&self, chat: ChatId, message_id: MessageId) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "deleteMessage",
                &json!({ "chat_id": chat, "message_id": message_id }),
            )
            .await?;
        Ok(())
    }

    fn inline_markup(menu: &InlineMenu) -> serde_json::Value {
        let rows: Vec<Vec<serde_json::Value>> = menu
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| json!({ "text": b.text, "callback_data": b.data }))
                    .collect()
            })
            .collect();
        json!({ "inline_keyboard": rows })
    }

    fn reply_markup(keyboard: &ReplyKeyboard) -> serde_json::Value {
        let rows: Vec<Vec<serde_json::Value>> = keyboard
            .rows
            .iter()
            .map(|row| row.iter().map(|text| json!({ "text": text })).collect())
            .collect();
        json!({
            "keyboard": rows,
            "one_time_keyboard": keyboard.one_time,
            "resize_keyboard": true,
        })
    }
}

#[async_trait]
impl Messenger for TelegramChannel {
    async fn send_text(&self, chat: ChatId, html: &str) -> Result<()> {
        self.send_message(chat, html, None).await.map(|_| ())
    }

    async fn send_text_with_menu(&self, chat: ChatId, html: &str, menu: &InlineMenu) -> Result<()> {
        self.send_message(chat, html, Some(Self::inline_markup(menu)))
            .await
            .map(|_| ())
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message_id: MessageId,
        html: &str,
        menu: &InlineMenu,
    ) -> Result<()> {
        let body = json!({
            "chat_id": chat,
            "message_id": message_id,
            "text": html,
            "parse_mode": "HTML",
            "reply_markup": Self::inline_markup(menu),
        });
        let _: serde_json::Value = self.call("editMessageText", &body).await?;
        tracing::debug!(chat, message_id, "message edited in place");
        Ok(())
    }

    async fn send_text_with_reply_keyboard(
        &self,
        chat: ChatId,
        html: &str,
        keyboard: &ReplyKeyboard,
    ) -> Result<()> {
        self.send_message(chat, html, Some(Self::reply_markup(keyboard)))
            .await
            .map(|_| ())
    }

    async fn remove_reply_keyboard(&self, chat: ChatId) -> Result<()> {
        // The Bot API can only drop a custom keyboard by sending a message
        // carrying remove_keyboard markup; delete it right away to avoid
        // cluttering the chat.
        let sent = self
            .send_message(
                chat,
                "processing input...",
                Some(json!({ "remove_keyboard": true })),
            )
            .await?;
        self.delete_message(chat, sent.message_id).await
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
    pub callback_query: Option<TelegramCallbackQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
    pub date: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramCallbackQuery {
    pub id: String,
    pub from: TelegramUser,
    pub message: Option<TelegramMessage>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
}
