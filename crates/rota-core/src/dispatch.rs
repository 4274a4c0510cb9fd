//! Command dispatch and the single-worker event loop.
//!
//! Dispatch is data-driven: commands live in a name→handler table, so new
//! commands never touch the loop. `/start` stays special because it runs
//! before any username is bound.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    errors::Error,
    messaging::{
        port::{MessagingPort, UpdateSource},
        types::{InboundEvent, InboundUpdate, OutboundMessage, ReplyKeyboard},
    },
    registry::ChatRegistry,
    schedule::{format_schedule, ScheduleProvider},
};

const DENIAL_TEXT: &str = "Sorry, you don't have access to this bot.";
const WELCOME_TEXT: &str =
    "Welcome to the Rota Schedule Bot!\nYou are successfully registered. See /help for available commands.";
const HELP_TEXT: &str = "type /schedule to know your schedule";
const NO_SCHEDULE_TEXT: &str = "You don't have schedule right now.";
const SCHEDULE_FAILED_TEXT: &str = "Something went wrong, contact your manager.";
const UNKNOWN_COMMAND_TEXT: &str = "I don't know that command";

/// Pause before re-polling after a failed long-poll cycle.
const POLL_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// One entry in the dispatcher's command table. Handlers run only for
/// commands from an already-linked chat; `username` is the resolved owner.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, username: &str, update: &InboundUpdate) -> String;
}

pub struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn handle(&self, _username: &str, _update: &InboundUpdate) -> String {
        HELP_TEXT.to_string()
    }
}

pub struct ScheduleCommand {
    provider: Arc<dyn ScheduleProvider>,
}

impl ScheduleCommand {
    pub fn new(provider: Arc<dyn ScheduleProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CommandHandler for ScheduleCommand {
    async fn handle(&self, username: &str, _update: &InboundUpdate) -> String {
        match self.provider.get_schedule(username).await {
            Ok(plan) => format_schedule(&plan),
            Err(Error::ScheduleNotFound) => NO_SCHEDULE_TEXT.to_string(),
            Err(e) => {
                tracing::warn!(%username, error = %e, "schedule lookup failed");
                SCHEDULE_FAILED_TEXT.to_string()
            }
        }
    }
}

/// Classifies one inbound update and produces at most one response.
pub struct Dispatcher {
    registry: ChatRegistry,
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
    keyboard: ReplyKeyboard,
}

impl Dispatcher {
    pub fn new(registry: ChatRegistry) -> Self {
        Self {
            registry,
            handlers: HashMap::new(),
            keyboard: ReplyKeyboard::schedule_shortcut(),
        }
    }

    pub fn with_command(
        mut self,
        name: &'static str,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        self.handlers.insert(name, Box::new(handler));
        self
    }

    /// The bot's stock command set: `/help` and `/schedule`.
    pub fn standard(registry: ChatRegistry, provider: Arc<dyn ScheduleProvider>) -> Self {
        Self::new(registry)
            .with_command("help", HelpCommand)
            .with_command("schedule", ScheduleCommand::new(provider))
    }

    /// `None` for non-command messages (deliberately unanswered); every
    /// produced response carries the fixed `/schedule` reply keyboard.
    pub async fn dispatch(&self, update: &InboundUpdate) -> Option<OutboundMessage> {
        let name = update.command.as_deref()?;

        let text = if name == "start" {
            self.handle_start(update)
        } else {
            self.handle_linked_command(name, update).await
        };

        Some(OutboundMessage {
            chat: update.chat,
            text,
            keyboard: Some(self.keyboard.clone()),
        })
    }

    /// `/start <token>` — the only command a not-yet-linked chat may use.
    /// Validation failures are surfaced verbatim as the reply text, so the
    /// user sees exactly why the link was refused.
    fn handle_start(&self, update: &InboundUpdate) -> String {
        let mut words = update.text.split_whitespace();
        let (Some(_cmd), Some(token)) = (words.next(), words.next()) else {
            return DENIAL_TEXT.to_string();
        };

        match self.registry.validate_and_bind(token, update.chat) {
            Ok(()) => WELCOME_TEXT.to_string(),
            Err(e) => e.to_string(),
        }
    }

    async fn handle_linked_command(&self, name: &str, update: &InboundUpdate) -> String {
        // Refuse further conversation with unlinked chats: reply with empty
        // text (keyboard still attached) and nothing else.
        let Ok(username) = self.registry.lookup_by_chat(update.chat) else {
            return String::new();
        };

        match self.handlers.get(name) {
            Some(handler) => handler.handle(&username, update).await,
            None => UNKNOWN_COMMAND_TEXT.to_string(),
        }
    }
}

/// The single background worker: long-polls the update source and processes
/// one event fully, including its outbound send, before awaiting the next.
///
/// Poll failures and send failures are logged and never end the loop. An
/// event with no message payload is logged and skipped rather than stopping
/// the consumer, so one stray transport event cannot silence the bot.
pub async fn run_loop(
    mut source: impl UpdateSource,
    dispatcher: &Dispatcher,
    transport: Arc<dyn MessagingPort>,
) {
    loop {
        let events = match source.next_events().await {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "update feed poll failed");
                tokio::time::sleep(POLL_RETRY_BACKOFF).await;
                continue;
            }
        };

        for event in events {
            let update = match event {
                InboundEvent::Message(update) => update,
                InboundEvent::Malformed => {
                    tracing::warn!("dropping transport event without message payload");
                    continue;
                }
            };

            let Some(reply) = dispatcher.dispatch(&update).await else {
                continue;
            };
            if let Err(e) = transport.send(&reply).await {
                tracing::warn!(chat = reply.chat.0, error = %e, "failed to send reply");
            }
        }
    }
}
