//! Configuration: schema, discovery, and loading.
//!
//! Config lives in `veil.{toml,yaml,yml,json}`, project-local or under
//! `~/.config/veil/`. String values may reference environment variables as
//! `${VAR}`; placeholders are substituted before parsing.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{discover_and_load, load_config, set_config_dir, update_config},
    schema::{DiscordConfig, RelayConfig, VeilConfig},
};
