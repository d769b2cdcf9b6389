use std::sync::Arc;

use {
    anyhow::Result,
    tracing::{debug, warn},
};

use {
    veil_channels::ChannelOutbound,
    veil_common::{ChannelId, MessageEvent, UserId},
    veil_pairing::{SessionRegistry, StartOutcome, StopOutcome},
};

use crate::{command::Command, replies};

/// Classifies inbound events and turns registry outcomes into sends.
///
/// Registry calls are short in-memory mutations; network sends happen after
/// the registry has already transitioned, and a failed send never rolls the
/// transition back.
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    outbound: Arc<dyn ChannelOutbound>,
    bot_user: UserId,
    prefix: String,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<SessionRegistry>,
        outbound: Arc<dyn ChannelOutbound>,
        bot_user: UserId,
        prefix: String,
    ) -> Self {
        Self {
            registry,
            outbound,
            bot_user,
            prefix,
        }
    }

    /// Handle one inbound event to completion.
    ///
    /// Classification order: self-echo, command, in-session chat, drop.
    pub async fn handle(&self, event: MessageEvent) -> Result<()> {
        if event.author_id == self.bot_user {
            return Ok(());
        }

        match Command::parse(&event.content, &self.prefix) {
            Some(Command::Start) => self.handle_start(&event.author_id).await,
            Some(Command::Stop) => self.handle_stop(&event.author_id).await,
            None => {
                self.handle_chat(&event).await;
                Ok(())
            },
        }
    }

    async fn handle_start(&self, author: &UserId) -> Result<()> {
        let dm = self.outbound.open_dm(author).await?;
        match self.registry.request_start(&dm) {
            StartOutcome::Waiting { name } => {
                self.send(&dm, &replies::hello_waiting(&name)).await;
            },
            StartOutcome::Matched {
                own_name,
                peer_name,
                peer_channel,
            } => {
                // Both notices go out concurrently; either may land first.
                let own_notice = replies::hello_matched(&own_name, &peer_name);
                let peer_notice = replies::peer_connected(&own_name);
                tokio::join!(
                    self.send(&dm, &own_notice),
                    self.send(&peer_channel, &peer_notice),
                );
            },
            StartOutcome::AlreadyActive => {
                debug!(channel = %dm, "start ignored: channel already active");
            },
        }
        Ok(())
    }

    async fn handle_stop(&self, author: &UserId) -> Result<()> {
        let dm = self.outbound.open_dm(author).await?;
        match self.registry.request_stop(&dm) {
            StopOutcome::Disconnected {
                own_name,
                peer_channel,
            } => {
                let peer_notice = replies::peer_disconnected(&own_name);
                tokio::join!(
                    self.send(&dm, replies::DISCONNECTED),
                    self.send(&peer_channel, &peer_notice),
                );
            },
            // A withdrawn pending request had no session either; the reply
            // matches the plain no-session case.
            StopOutcome::CancelledPending | StopOutcome::NoSession => {
                self.send(&dm, replies::NO_ONGOING_CHAT).await;
            },
        }
        Ok(())
    }

    /// Relay a non-command message to the session peer, or drop it.
    async fn handle_chat(&self, event: &MessageEvent) {
        let Some(side) = self.registry.route(&event.channel_id) else {
            return;
        };
        self.send(
            &side.peer_channel,
            &replies::relayed(&side.own_name, &event.content),
        )
        .await;
    }

    /// Best-effort send: failures are logged and dropped, never retried and
    /// never surfaced to the other party.
    async fn send(&self, channel: &ChannelId, text: &str) {
        if let Err(e) = self.outbound.send_text(channel, text).await {
            warn!(channel = %channel, error = %e, "send failed");
        }
    }
}
