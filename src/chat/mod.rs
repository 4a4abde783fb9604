//! Transport-neutral chat types. The dispatcher only ever sees these; the
//! Twitch binding in [`twitch`] translates to and from the wire client.

pub mod twitch;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Who the bot is logged in as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub login: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub channel: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    /// Set when the message was sent by the bot's own account.
    pub echo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Login completed; the bot can start sending.
    Ready(BotIdentity),
    Message(ChatMessage),
}

pub type ChatSendFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a>>;
pub type ChannelLookupFuture<'a> = Pin<Box<dyn Future<Output = bool> + 'a>>;

/// Outbound side of a chat connection.
pub trait ChatSink {
    fn send<'a>(&'a self, channel: &'a str, text: &'a str) -> ChatSendFuture<'a>;

    /// Whether `channel` is currently joined and can receive messages.
    fn is_joined<'a>(&'a self, channel: &'a str) -> ChannelLookupFuture<'a>;
}

/// Flattens `text` onto one line. Each CR or LF becomes a space, so the
/// character count is unchanged and a reply can never end the IRC line early.
pub fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}
