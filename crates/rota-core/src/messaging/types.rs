use crate::domain::ChatId;

/// One inbound chat event as seen by the dispatch loop.
#[derive(Clone, Debug)]
pub enum InboundEvent {
    Message(InboundUpdate),
    /// Transport event that carried no message payload at all (edited
    /// message, member update, ...). Logged and skipped by the loop.
    Malformed,
}

/// An inbound chat message. Ephemeral, never persisted.
#[derive(Clone, Debug)]
pub struct InboundUpdate {
    pub chat: ChatId,
    pub text: String,
    /// Command name (without the leading `/` or `@botname` suffix) when the
    /// message is a command, `None` for plain text.
    pub command: Option<String>,
}

/// An outbound chat message. Ephemeral, never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat: ChatId,
    pub text: String,
    pub keyboard: Option<ReplyKeyboard>,
}

/// Fixed reply keyboard attached to every dispatcher response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyKeyboard {
    /// Rows of button labels.
    pub rows: Vec<Vec<String>>,
}

impl ReplyKeyboard {
    /// The one keyboard the bot uses: a single `/schedule` shortcut.
    pub fn schedule_shortcut() -> Self {
        Self {
            rows: vec![vec!["/schedule".to_string()]],
        }
    }
}
