pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

use crate::registry::ChatRef;

/// A message received from the platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Chat the message was sent in
    pub chat_id: i64,
    /// Platform message id, used for forwarding
    pub message_id: i32,
    /// Sender's handle, without the leading `@`
    pub username: Option<String>,
    /// Sender's first name
    pub first_name: Option<String>,
    /// Message text, if it is a text message
    pub text: Option<String>,
    /// Leading bot command as marked up by the platform, e.g. `/start@my_bot`.
    /// `None` for messages that merely begin with a slash.
    pub command: Option<String>,
}

impl IncomingMessage {
    pub fn chat(&self) -> ChatRef {
        ChatRef::from(self.chat_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    Html,
}

/// Outbound calls the bot makes to the messaging platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, to: &ChatRef, text: &str, format: TextFormat) -> Result<()>;

    /// Forward an existing message, preserving its original type.
    async fn forward(&self, to: &ChatRef, from: &ChatRef, message_id: i32) -> Result<()>;
}
