pub mod broadcaster;
pub mod commands;

use anyhow::{Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use crate::ai::AiSession;
use crate::chat::{BotIdentity, ChatEvent, ChatMessage, ChatSink, single_line};
use crate::config::ChatConfig;
use crate::model_gateway::ModelGateway;
use broadcaster::{BROADCAST_MESSAGE, Broadcaster};
use commands::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Disconnected,
    Connecting,
    Ready,
    Handling,
}

/// Single-owner dispatcher: consumes chat events one at a time, so the AI
/// session needs no locking.
pub struct Bot<S, G> {
    channel: String,
    prefix: String,
    session: AiSession<G>,
    sink: S,
    broadcaster: Broadcaster,
    identity: Option<BotIdentity>,
    state: BotState,
}

impl<S, G> Bot<S, G>
where
    S: ChatSink,
    G: ModelGateway,
{
    pub fn new(chat: &ChatConfig, session: AiSession<G>, sink: S) -> Self {
        Self {
            channel: chat.channel.clone(),
            prefix: chat.prefix.clone(),
            session,
            sink,
            broadcaster: Broadcaster::default(),
            identity: None,
            state: BotState::Disconnected,
        }
    }

    pub fn with_broadcaster(mut self, broadcaster: Broadcaster) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    pub fn state(&self) -> BotState {
        self.state
    }

    pub fn identity(&self) -> Option<&BotIdentity> {
        self.identity.as_ref()
    }

    pub fn session(&self) -> &AiSession<G> {
        &self.session
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Runs until the event stream closes. Broadcaster firings are
    /// interleaved with chat events on this one task.
    pub async fn run(&mut self, mut events: UnboundedReceiver<ChatEvent>) {
        self.transition(BotState::Connecting);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                _ = self.broadcaster.tick() => self.broadcast().await,
            }
        }

        self.transition(BotState::Disconnected);
        info!("chat event stream closed");
    }

    pub async fn handle_event(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::Ready(identity) => self.on_ready(identity),
            ChatEvent::Message(message) => self.on_message(message).await,
        }
    }

    fn transition(&mut self, next: BotState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "bot state change");
            self.state = next;
        }
    }

    fn on_ready(&mut self, identity: BotIdentity) {
        info!(login = %identity.login, user_id = %identity.user_id, "logged in to chat");
        self.identity = Some(identity);
        self.transition(BotState::Ready);

        if self.broadcaster.start() {
            info!(
                channel = %self.channel,
                remaining = self.broadcaster.remaining(),
                "started periodic broadcaster"
            );
        } else {
            debug!("broadcaster already started; not restarting on reconnect");
        }
    }

    async fn on_message(&mut self, message: ChatMessage) {
        if message.echo {
            return;
        }
        info!(
            channel = %message.channel,
            author = %message.author,
            timestamp = %message.timestamp.to_rfc3339(),
            content = %message.content,
            "chat message"
        );

        let Some(command) = commands::parse(&self.prefix, &message.content) else {
            return;
        };

        let previous = self.state;
        self.transition(BotState::Handling);
        if let Err(err) = self.execute(command, &message).await {
            error!(
                command = command.name(),
                channel = %message.channel,
                author = %message.author,
                error = %format!("{err:#}"),
                "command failed"
            );
        }
        self.transition(previous);
    }

    async fn execute(&mut self, command: Command<'_>, message: &ChatMessage) -> Result<()> {
        match command {
            Command::Hello => {
                let greeting = format!("Hello {}!", message.author);
                self.reply(&message.channel, &greeting).await
            }
            Command::Get => {
                self.reply(&message.channel, self.session.personality())
                    .await
            }
            Command::Set(personality) => {
                if personality.is_empty() {
                    warn!(author = %message.author, "ignoring set without a personality");
                    return Ok(());
                }
                self.session.set_personality(personality);
                info!(author = %message.author, personality = %personality, "personality updated");
                Ok(())
            }
            Command::Help => {
                let help = commands::help_text(&self.prefix);
                self.reply(&message.channel, &help).await
            }
            Command::Promt(prompt) => {
                if prompt.is_empty() {
                    debug!(author = %message.author, "ignoring promt without text");
                    return Ok(());
                }
                let answer = self
                    .session
                    .respond(prompt)
                    .await
                    .context("AI request failed")?;
                self.reply(&message.channel, commands::truncate_reply(&answer))
                    .await
            }
        }
    }

    async fn reply(&self, channel: &str, text: &str) -> Result<()> {
        self.sink.send(channel, &single_line(text)).await
    }

    async fn broadcast(&self) {
        if !self.sink.is_joined(&self.channel).await {
            error!(channel = %self.channel, "channel not found; skipping broadcast");
            return;
        }

        match self.sink.send(&self.channel, BROADCAST_MESSAGE).await {
            Ok(()) => debug!(
                channel = %self.channel,
                remaining = self.broadcaster.remaining(),
                "sent scheduled broadcast"
            ),
            Err(err) => error!(
                channel = %self.channel,
                error = %format!("{err:#}"),
                "scheduled broadcast failed"
            ),
        }
    }
}
