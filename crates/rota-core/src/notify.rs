use std::sync::Arc;

use crate::{
    errors::Error,
    messaging::{port::MessagingPort, types::OutboundMessage},
    registry::ChatRegistry,
    Result,
};

/// Pushes a message to a user's bound chat, independently of the dispatch
/// loop. Called from arbitrary concurrent contexts, sharing the registry
/// and the transport handle with the loop.
pub struct NotificationSender {
    registry: ChatRegistry,
    transport: Arc<dyn MessagingPort>,
}

impl NotificationSender {
    pub fn new(registry: ChatRegistry, transport: Arc<dyn MessagingPort>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Fails with `UserNotLinked` before touching the transport when the
    /// username has no bound chat. A delivery failure comes back as a
    /// recoverable `TransportSend` error; it is never fatal to the process.
    pub async fn send_notification(&self, username: &str, text: &str) -> Result<()> {
        let chat = self.registry.lookup_by_username(username).map_err(|e| {
            if matches!(e, Error::NotFound) {
                Error::UserNotLinked
            } else {
                e
            }
        })?;

        self.transport
            .send(&OutboundMessage {
                chat,
                text: text.to_string(),
                keyboard: None,
            })
            .await
    }
}
