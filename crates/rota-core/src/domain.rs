use chrono::{DateTime, Utc};

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// One persisted username↔chat association plus its token state.
///
/// The username is a foreign reference owned by the identity system; this
/// row is the single source of truth for both identity resolution and
/// token lifecycle (one row per username, never split).
#[derive(Clone, Debug)]
pub struct ChatLink {
    pub username: String,
    /// Unset until a token successfully binds.
    pub chat_id: Option<ChatId>,
    /// Rotated on every issue and every successful bind.
    pub registration_token: String,
    pub token_expiration: DateTime<Utc>,
}

impl ChatLink {
    /// A token validates only strictly before its expiration.
    pub fn token_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.token_expiration
    }
}
