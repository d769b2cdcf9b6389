use {
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VeilConfig {
    pub discord: DiscordConfig,
    pub relay: RelayConfig,
}

/// Discord platform credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token. The `VEIL_DISCORD_TOKEN` env var takes precedence if set.
    pub token: Option<String>,
}

impl DiscordConfig {
    /// Resolve the bot token: env var first, then the config file value.
    pub fn resolve_token(&self) -> Option<Secret<String>> {
        std::env::var("VEIL_DISCORD_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.token.clone())
            .map(Secret::new)
    }
}

/// Relay behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Prefix for the start/stop commands. The command words themselves are
    /// fixed; `"++"` yields the `++start` / `++stop` pair.
    pub command_prefix: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            command_prefix: "++".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prefix_is_plus_plus() {
        assert_eq!(VeilConfig::default().relay.command_prefix, "++");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: VeilConfig = toml::from_str("[discord]\ntoken = \"abc\"\n").unwrap();
        assert_eq!(cfg.discord.token.as_deref(), Some("abc"));
        assert_eq!(cfg.relay.command_prefix, "++");
    }
}
