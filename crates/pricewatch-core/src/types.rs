//! Chat and UI value types shared between the dispatcher and the transport.

use serde::{Deserialize, Serialize};

/// Telegram chat identifier.
pub type ChatId = i64;

/// Telegram message identifier within a chat.
pub type MessageId = i64;

/// One button of an inline menu attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    /// Label shown to the user.
    pub text: String,
    /// Callback payload delivered back when the button is pressed.
    pub data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// Inline keyboard: rows of callback buttons rendered under a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineMenu {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineMenu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row of buttons, builder style.
    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.rows.push(buttons);
        self
    }

    pub fn push_row(&mut self, buttons: Vec<InlineButton>) {
        self.rows.push(buttons);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Custom reply keyboard: rows of plain-text suggestions replacing the
/// user's normal keyboard until dismissed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
    /// Hide the keyboard automatically after one use.
    pub one_time: bool,
}

impl ReplyKeyboard {
    pub fn one_time(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows,
            one_time: true,
        }
    }
}
