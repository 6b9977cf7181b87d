//! Per-chat navigation state.
//!
//! Each chat keeps a LIFO stack of the commands it has fully handled, which
//! powers the generic "<< Return" button and the collect-free-text-then-
//! resume flow. The stack's top always reflects the most recently handled
//! non-replay command.

use pricewatch_core::MessageId;

/// One parsed command invocation: name plus positional params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub name: String,
    pub params: Vec<String>,
}

impl CommandInvocation {
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Reconstruct the command string this invocation was parsed from.
    pub fn command_string(&self) -> String {
        let mut out = format!("/{}", self.name);
        for param in &self.params {
            out.push(' ');
            out.push_str(param);
        }
        out
    }
}

/// Navigation state for one chat. Created lazily, lives for the process.
#[derive(Debug, Default)]
pub struct NavigationState {
    /// Set when the current interaction came from an inline-button press;
    /// replies then edit that message in place instead of sending a new one.
    pub callback_message_id: Option<MessageId>,
    pub back_button_enabled: bool,
    /// The next plain-text message from this chat resumes the top-of-stack
    /// command with the text appended.
    pub awaiting_input: bool,
    /// A custom reply keyboard is showing and must be dismissed once input
    /// is consumed.
    pub custom_keyboard_active: bool,
    stack: Vec<CommandInvocation>,
}

impl NavigationState {
    pub fn push(&mut self, invocation: CommandInvocation) {
        self.stack.push(invocation);
    }

    pub fn pop(&mut self) -> Option<CommandInvocation> {
        self.stack.pop()
    }

    pub fn peek(&self) -> Option<&CommandInvocation> {
        self.stack.last()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
