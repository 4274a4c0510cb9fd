use async_trait::async_trait;

use crate::{
    messaging::types::{InboundEvent, OutboundMessage},
    Result,
};

/// Outbound side of the transport.
///
/// Shared between the dispatch loop and `NotificationSender`, which runs in
/// arbitrary concurrent contexts, so implementations must be `Send + Sync`.
/// Failures surface as a recoverable `Error::TransportSend`.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<()>;
}

/// Inbound side of the transport: a long-polled feed of chat events.
///
/// One cycle blocks up to the transport's fixed poll timeout and returns
/// whatever arrived (possibly nothing). The feed is conceptually infinite
/// and not restartable; the dispatch loop is its only consumer.
#[async_trait]
pub trait UpdateSource: Send {
    async fn next_events(&mut self) -> Result<Vec<InboundEvent>>;
}
