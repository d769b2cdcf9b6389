use std::collections::HashMap;

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tokio::sync::Mutex,
};

use {
    veil_channels::ChannelOutbound,
    veil_common::{ChannelId, UserId},
};

/// Discord REST API base URL.
const API_BASE: &str = "https://discord.com/api/v10";

/// Outbound REST client.
///
/// DM channels are cached per user for the process lifetime; Discord returns
/// the same channel for repeated create calls, so the cache only saves a
/// round trip.
pub struct DiscordRest {
    client: Client,
    token: Secret<String>,
    dm_cache: Mutex<HashMap<UserId, ChannelId>>,
}

impl std::fmt::Debug for DiscordRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordRest")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChannelPayload {
    id: String,
}

impl DiscordRest {
    pub fn new(token: Secret<String>) -> Self {
        Self {
            client: Client::new(),
            token,
            dm_cache: Mutex::new(HashMap::new()),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token.expose_secret())
    }

    /// Identify the bot's own user, for self-echo suppression.
    pub async fn current_user(&self) -> Result<UserId> {
        let user: UserPayload = self
            .client
            .get(format!("{API_BASE}/users/@me"))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .context("fetch current user")?
            .error_for_status()?
            .json()
            .await?;
        Ok(UserId(user.id))
    }
}

#[async_trait]
impl ChannelOutbound for DiscordRest {
    async fn open_dm(&self, user: &UserId) -> Result<ChannelId> {
        if let Some(channel) = self.dm_cache.lock().await.get(user) {
            return Ok(channel.clone());
        }

        let payload: ChannelPayload = self
            .client
            .post(format!("{API_BASE}/users/@me/channels"))
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "recipient_id": user.as_str() }))
            .send()
            .await
            .with_context(|| format!("open dm channel for user {user}"))?
            .error_for_status()?
            .json()
            .await?;

        let channel = ChannelId(payload.id);
        self.dm_cache
            .lock()
            .await
            .insert(user.clone(), channel.clone());
        Ok(channel)
    }

    async fn send_text(&self, channel: &ChannelId, text: &str) -> Result<()> {
        self.client
            .post(format!("{API_BASE}/channels/{channel}/messages"))
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "content": text }))
            .send()
            .await
            .with_context(|| format!("send message to channel {channel}"))?
            .error_for_status()?;
        Ok(())
    }
}
