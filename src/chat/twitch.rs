use anyhow::{Context, Result, anyhow};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use twitch_irc::login::StaticLoginCredentials;
use twitch_irc::message::{IRCMessage, ServerMessage};
use twitch_irc::{ClientConfig, SecureTCPTransport, TwitchIRCClient, irc};

use crate::chat::{
    BotIdentity, ChannelLookupFuture, ChatEvent, ChatMessage, ChatSendFuture, ChatSink,
    single_line,
};
use crate::config::ChatConfig;

const VALIDATE_URL: &str = "https://id.twitch.tv/oauth2/validate";
const VALIDATE_TIMEOUT_SECS: u64 = 15;

type IrcClient = TwitchIRCClient<SecureTCPTransport, StaticLoginCredentials>;

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    login: String,
    user_id: String,
}

/// A live Twitch chat connection split into its outbound sink and the
/// stream of inbound events.
pub struct TwitchConnection {
    pub identity: BotIdentity,
    pub sink: TwitchSink,
    pub events: UnboundedReceiver<ChatEvent>,
}

pub struct TwitchSink {
    client: IrcClient,
}

impl ChatSink for TwitchSink {
    fn send<'a>(&'a self, channel: &'a str, text: &'a str) -> ChatSendFuture<'a> {
        Box::pin(async move {
            self.client
                .send_message(privmsg_line(channel, text))
                .await
                .map_err(|err| {
                    anyhow!("Failed to send message to #{}: {}", channel_login(channel), err)
                })
        })
    }

    fn is_joined<'a>(&'a self, channel: &'a str) -> ChannelLookupFuture<'a> {
        Box::pin(async move {
            let (_wanted, joined) = self.client.get_channel_status(channel_login(channel)).await;
            joined
        })
    }
}

/// The exact line written for a chat message. The text goes out verbatim
/// apart from line breaks, with no `say`-style `". "` prefix.
fn privmsg_line(channel: &str, text: &str) -> IRCMessage {
    irc!["PRIVMSG", format!("#{}", channel_login(channel)), single_line(text)]
}

/// Twitch channel logins are lowercase and carry no leading `#`.
pub fn channel_login(raw: &str) -> String {
    raw.trim().trim_start_matches('#').to_ascii_lowercase()
}

/// IRC wants the bare token; chat tokens are often pasted as `oauth:...`.
fn bare_token(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix("oauth:").unwrap_or(trimmed)
}

async fn validate_token(http: &Client, token: &str) -> Result<BotIdentity> {
    let response = http
        .get(VALIDATE_URL)
        .header("Authorization", format!("OAuth {token}"))
        .send()
        .await
        .context("Failed to reach Twitch token validation endpoint")?;

    match response.status() {
        StatusCode::OK => {}
        StatusCode::UNAUTHORIZED => {
            return Err(anyhow!(
                "Twitch rejected chat.token as invalid or expired"
            ));
        }
        status => {
            return Err(anyhow!(
                "Twitch token validation failed with status {}",
                status
            ));
        }
    }

    let parsed: ValidateResponse = response
        .json()
        .await
        .context("Failed to parse Twitch token validation response")?;
    Ok(BotIdentity {
        login: parsed.login,
        user_id: parsed.user_id,
    })
}

/// Validates the token, connects, joins the configured channel, and starts a
/// task that forwards inbound traffic as [`ChatEvent`]s.
pub async fn connect(cfg: &ChatConfig) -> Result<TwitchConnection> {
    let http = Client::builder()
        .timeout(Duration::from_secs(VALIDATE_TIMEOUT_SECS))
        .build()
        .context("Failed to initialize HTTP client")?;
    let token = bare_token(&cfg.token);
    let identity = validate_token(&http, token).await?;
    info!(login = %identity.login, user_id = %identity.user_id, "validated chat token");

    let credentials = StaticLoginCredentials::new(identity.login.clone(), Some(token.to_string()));
    let (incoming, client) = IrcClient::new(ClientConfig::new_simple(credentials));

    let channel = channel_login(&cfg.channel);
    client
        .join(channel.clone())
        .map_err(|err| anyhow!("Invalid chat.channel '{}': {}", cfg.channel, err))?;
    info!(channel = %channel, "joining chat channel");

    let (tx, events) = mpsc::unbounded_channel();
    tokio::spawn(forward_events(incoming, tx, identity.clone(), channel));

    Ok(TwitchConnection {
        identity,
        sink: TwitchSink { client },
        events,
    })
}

async fn forward_events(
    mut incoming: UnboundedReceiver<ServerMessage>,
    tx: UnboundedSender<ChatEvent>,
    identity: BotIdentity,
    channel: String,
) {
    while let Some(message) = incoming.recv().await {
        let Some(event) = to_chat_event(message, &identity, &channel) else {
            continue;
        };
        if tx.send(event).is_err() {
            debug!("dispatcher stopped; closing chat event forwarder");
            return;
        }
    }
    warn!("chat transport closed its message stream");
}

// Ready waits for the server to confirm our own JOIN of the configured
// channel; before that, sends to it are dropped.
fn to_chat_event(
    message: ServerMessage,
    identity: &BotIdentity,
    channel: &str,
) -> Option<ChatEvent> {
    match message {
        ServerMessage::Join(msg)
            if msg.user_login.eq_ignore_ascii_case(&identity.login)
                && msg.channel_login.eq_ignore_ascii_case(channel) =>
        {
            Some(ChatEvent::Ready(identity.clone()))
        }
        ServerMessage::Privmsg(msg) => Some(ChatEvent::Message(ChatMessage {
            echo: msg.sender.login.eq_ignore_ascii_case(&identity.login),
            channel: msg.channel_login,
            author: msg.sender.login,
            timestamp: msg.server_timestamp,
            content: msg.message_text,
        })),
        _ => None,
    }
}
