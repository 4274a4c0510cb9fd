use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{Message, UpdateKind},
};

use rota_core::{
    domain::ChatId,
    errors::Error,
    messaging::{
        port::UpdateSource,
        types::{InboundEvent, InboundUpdate},
    },
    Result,
};

/// Fixed server-side long-poll window per cycle.
pub const POLL_TIMEOUT_SECS: u32 = 60;

/// Long-polled feed of inbound Telegram updates.
///
/// Tracks the confirmed offset itself, so each cycle acknowledges the
/// previous batch; the feed is not restartable.
pub struct TelegramUpdateSource {
    bot: Bot,
    offset: i32,
}

impl TelegramUpdateSource {
    pub fn new(bot: Bot) -> Self {
        Self { bot, offset: 0 }
    }
}

#[async_trait]
impl UpdateSource for TelegramUpdateSource {
    async fn next_events(&mut self) -> Result<Vec<InboundEvent>> {
        let updates = self
            .bot
            .get_updates()
            .offset(self.offset)
            .timeout(POLL_TIMEOUT_SECS)
            .await
            .map_err(|e| Error::TransportSend(format!("telegram long poll failed: {e}")))?;

        tracing::debug!(count = updates.len(), "polled updates");

        let mut events = Vec::with_capacity(updates.len());
        for update in updates {
            self.offset = self.offset.max(update.id + 1);
            events.push(match update.kind {
                UpdateKind::Message(message) => map_message(&message),
                // Anything without a message payload (edits, member events,
                // callback queries): surfaced as malformed, the loop skips it.
                _ => InboundEvent::Malformed,
            });
        }
        Ok(events)
    }
}

fn map_message(message: &Message) -> InboundEvent {
    let chat = ChatId(message.chat.id.0);
    let text = message.text().unwrap_or_default().to_string();
    let command = command_name(&text);
    InboundEvent::Message(InboundUpdate {
        chat,
        text,
        command,
    })
}

/// Command name of a message, if it is one. Telegram may send
/// `/cmd@botname arg1 ...`; the `@botname` suffix is stripped and the name
/// lowercased.
fn command_name(text: &str) -> Option<String> {
    let first = text.trim().split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or("").to_lowercase();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
