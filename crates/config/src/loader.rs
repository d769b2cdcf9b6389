use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::VeilConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["veil.toml", "veil.yaml", "veil.yml", "veil.json"];

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set a custom config directory. When set, discovery only looks in this
/// directory; project-local and user-global paths are skipped. Each call
/// replaces the previous override.
pub fn set_config_dir(path: PathBuf) {
    *lock_override() = Some(path);
}

/// Clear the config directory override, restoring default discovery.
pub fn clear_config_dir() {
    *lock_override() = None;
}

fn lock_override() -> std::sync::MutexGuard<'static, Option<PathBuf>> {
    CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<VeilConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./veil.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/veil/veil.{toml,yaml,yml,json}` (user-global)
///
/// When no file exists, a default `veil.toml` is written to the user-global
/// path and the defaults are returned.
pub fn discover_and_load() -> VeilConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
        return VeilConfig::default();
    }

    debug!("no config file found, writing default config");
    let config = VeilConfig::default();
    if let Err(e) = write_default_config(&config) {
        warn!(error = %e, "failed to write default config file");
    }
    config
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = lock_override().clone() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
        // Override is set: don't fall through to other locations.
        return None;
    }

    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/veil/
    if let Some(dir) = home_dir().map(|h| h.join(".config").join("veil")) {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the config directory: override, or `~/.config/veil/`.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = lock_override().clone() {
        return Some(dir);
    }
    home_dir().map(|h| h.join(".config").join("veil"))
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("veil.toml")
}

/// Lock guarding config read-modify-write cycles.
static CONFIG_SAVE_LOCK: Mutex<()> = Mutex::new(());

/// Atomically load the current config, apply `f`, and save.
///
/// Holds a process-wide lock so concurrent callers cannot race.
/// Returns the path written to.
pub fn update_config(f: impl FnOnce(&mut VeilConfig)) -> anyhow::Result<PathBuf> {
    let _guard = CONFIG_SAVE_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let mut config = discover_and_load();
    f(&mut config);
    save_config_inner(&config)
}

fn save_config_inner(config: &VeilConfig) -> anyhow::Result<PathBuf> {
    let path = find_or_default_config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?;
    std::fs::write(&path, toml_str)?;
    debug!(path = %path.display(), "saved config");
    Ok(path)
}

/// Write the default config file. Only called when no config file exists.
fn write_default_config(config: &VeilConfig) -> anyhow::Result<()> {
    let path = find_or_default_config_path();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?;
    std::fs::write(&path, &toml_str)?;
    debug!(path = %path.display(), "wrote default config file");
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<VeilConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("veil.toml");
        std::fs::write(&path, "[relay]\ncommand_prefix = \"!!\"\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.relay.command_prefix, "!!");
        assert!(cfg.discord.token.is_none());
    }

    #[test]
    fn loads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("veil.yaml");
        std::fs::write(&path, "discord:\n  token: abc\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discord.token.as_deref(), Some("abc"));
    }

    #[test]
    fn loads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("veil.json");
        std::fs::write(&path, r#"{"discord": {"token": "abc"}}"#).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discord.token.as_deref(), Some("abc"));
    }

    #[test]
    fn substitutes_env_in_file() {
        unsafe { std::env::set_var("VEIL_LOADER_TEST_TOKEN", "from-env") };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("veil.toml");
        std::fs::write(&path, "[discord]\ntoken = \"${VEIL_LOADER_TEST_TOKEN}\"\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discord.token.as_deref(), Some("from-env"));
        unsafe { std::env::remove_var("VEIL_LOADER_TEST_TOKEN") };
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("veil.ini");
        std::fs::write(&path, "whatever").unwrap();
        assert!(load_config(&path).is_err());
    }
}
