use {anyhow::Result, async_trait::async_trait};

use veil_common::{ChannelId, UserId};

/// Outbound surface of the chat platform.
///
/// Implementations perform real network calls; callers treat both methods
/// as blocking I/O and keep them off the event-classification path.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Resolve the direct-message channel for a user, creating it if absent.
    async fn open_dm(&self, user: &UserId) -> Result<ChannelId>;

    /// Deliver `text` to a channel.
    async fn send_text(&self, channel: &ChannelId, text: &str) -> Result<()>;
}
