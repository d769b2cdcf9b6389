use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the resolved configuration (token redacted).
    Get,
    /// Set a config value, e.g. `relay.command_prefix "!!"`.
    Set { key: String, value: String },
    /// Print the config file path.
    Path,
}

pub fn handle_config(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get => {
            let mut config = veil_config::discover_and_load();
            if config.discord.token.is_some() {
                config.discord.token = Some("[REDACTED]".into());
            }
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        },
        ConfigAction::Set { key, value } => {
            match key.as_str() {
                "discord.token" | "relay.command_prefix" => {},
                other => anyhow::bail!("unknown config key: {other}"),
            }
            let path = veil_config::update_config(|config| match key.as_str() {
                "discord.token" => config.discord.token = Some(value),
                "relay.command_prefix" => config.relay.command_prefix = value,
                _ => {},
            })?;
            println!("wrote {}", path.display());
            Ok(())
        },
        ConfigAction::Path => {
            println!(
                "{}",
                veil_config::loader::find_or_default_config_path().display()
            );
            Ok(())
        },
    }
}
