use crate::{registry::ChatRegistry, Result};

/// Host of the chat client's deep links.
const TRANSPORT_HOST: &str = "t.me";

/// Builds registration deep links on top of the registry's token lifecycle.
///
/// Opening the returned link in the chat client starts a conversation with
/// the bot carrying the token as the `/start` payload. Issuing is
/// unconditional: every call rotates the stored token, including for
/// usernames that are already linked, so an outstanding link dies the
/// moment a new one is requested.
pub struct RegistrationLinker {
    registry: ChatRegistry,
    bot_alias: String,
}

impl RegistrationLinker {
    pub fn new(registry: ChatRegistry, bot_alias: impl Into<String>) -> Self {
        Self {
            registry,
            bot_alias: bot_alias.into(),
        }
    }

    pub fn issue_link(&self, username: &str) -> Result<String> {
        let token = self.registry.issue_token(username)?;
        Ok(format!(
            "https://{TRANSPORT_HOST}/{}?start={token}",
            self.bot_alias
        ))
    }
}
