//! Service bootstrap: wire config, platform client, registry, and relay.

use std::sync::Arc;

use {
    anyhow::Context,
    tracing::info,
};

use {
    veil_channels::ChannelOutbound,
    veil_discord::{DiscordGateway, DiscordRest},
    veil_gateway::{Dispatcher, RelayService},
    veil_pairing::SessionRegistry,
};

/// Start the relay and run until the gateway intake ends.
pub async fn run_relay() -> anyhow::Result<()> {
    let config = veil_config::discover_and_load();
    let token = config
        .discord
        .resolve_token()
        .context("no bot token: set VEIL_DISCORD_TOKEN or [discord] token in veil.toml")?;

    let rest = Arc::new(DiscordRest::new(token.clone()));
    let bot_user = rest.current_user().await.context("identify bot user")?;
    info!(bot_user = %bot_user, "authenticated");

    let registry = Arc::new(SessionRegistry::new());
    let dispatcher = Dispatcher::new(
        registry,
        Arc::clone(&rest) as Arc<dyn ChannelOutbound>,
        bot_user,
        config.relay.command_prefix.clone(),
    );
    let service = RelayService::new(dispatcher);

    let (gateway, events) = DiscordGateway::new(token);
    let intake = tokio::spawn(gateway.run());

    // Startup banner.
    let lines = [
        format!("veil v{}", env!("CARGO_PKG_VERSION")),
        format!(
            "commands: {p}start / {p}stop",
            p = config.relay.command_prefix
        ),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    service.run(events).await;

    // The relay only stops when intake does; surface its exit reason.
    intake.await.context("gateway task panicked")?
}

/// Validate the discovered config without touching the network.
pub fn doctor() -> anyhow::Result<()> {
    let config = veil_config::discover_and_load();
    let mut problems = Vec::new();

    if config.discord.resolve_token().is_none() {
        problems.push("no bot token: set VEIL_DISCORD_TOKEN or [discord] token");
    }
    if config.relay.command_prefix.is_empty() {
        problems.push("[relay] command_prefix is empty; bare words would become commands");
    }

    if problems.is_empty() {
        println!("config ok");
        return Ok(());
    }
    for problem in &problems {
        println!("problem: {problem}");
    }
    anyhow::bail!("{} problem(s) found", problems.len())
}
