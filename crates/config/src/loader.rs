use std::{
    path::{Path, PathBuf},
    sync::RwLock,
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::HeraldConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["herald.toml", "herald.yaml", "herald.yml", "herald.json"];

/// Process-wide directory overrides, set from CLI flags before anything
/// else touches the config.
static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);
static DATA_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Override the config directory for this process.
pub fn set_config_dir(path: impl Into<PathBuf>) {
    if let Ok(mut guard) = CONFIG_DIR_OVERRIDE.write() {
        *guard = Some(path.into());
    }
}

/// Remove the config directory override.
pub fn clear_config_dir() {
    if let Ok(mut guard) = CONFIG_DIR_OVERRIDE.write() {
        *guard = None;
    }
}

/// Override the data directory for this process.
pub fn set_data_dir(path: impl Into<PathBuf>) {
    if let Ok(mut guard) = DATA_DIR_OVERRIDE.write() {
        *guard = Some(path.into());
    }
}

/// Remove the data directory override.
pub fn clear_data_dir() {
    if let Ok(mut guard) = DATA_DIR_OVERRIDE.write() {
        *guard = None;
    }
}

fn config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE.read().ok().and_then(|g| g.clone())
}

fn data_dir_override() -> Option<PathBuf> {
    DATA_DIR_OVERRIDE.read().ok().and_then(|g| g.clone())
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<HeraldConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. the `--config-dir` override, when set
/// 2. `./herald.{toml,yaml,yml,json}` (project-local)
/// 3. `~/.config/herald/herald.{toml,yaml,yml,json}` (user-global)
///
/// Returns `HeraldConfig::default()` if no config file is found.
pub fn discover_and_load() -> HeraldConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    HeraldConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/herald/
    if let Some(dirs) = directories::ProjectDirs::from("", "", "herald") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the config directory (override, else `~/.config/herald/`).
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        return Some(dir);
    }
    directories::ProjectDirs::from("", "", "herald").map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory used for persistent state such as browser
/// profiles.
///
/// Resolution order: `--data-dir` override, `HERALD_DATA_DIR`, the
/// platform data dir (`~/.local/share/herald` on Linux), then `./herald-data`.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = data_dir_override() {
        return dir;
    }
    if let Ok(dir) = std::env::var("HERALD_DATA_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    directories::ProjectDirs::from("", "", "herald")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("herald-data"))
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("herald.toml")
}

/// Serialize `config` to TOML and write it to the config path.
///
/// Creates parent directories if needed. Returns the path written to.
pub fn save_config(config: &HeraldConfig) -> anyhow::Result<PathBuf> {
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

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<HeraldConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.toml");
        std::fs::write(&path, "[server]\nport = 9000\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.whatsapp.country_code, "+91");
    }

    #[test]
    fn loads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.yaml");
        std::fs::write(&path, "whatsapp:\n  bulk_delay_secs: 10\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.whatsapp.bulk_delay_secs, 10);
    }

    #[test]
    fn loads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.json");
        std::fs::write(&path, r#"{"browser": {"headless": true}}"#).unwrap();
        let cfg = load_config(&path).unwrap();
        assert!(cfg.browser.headless);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.ini");
        std::fs::write(&path, "port=1").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn save_and_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        set_config_dir(dir.path());
        let cfg = HeraldConfig {
            server: crate::schema::ServerConfig {
                port: 4242,
                ..Default::default()
            },
            ..Default::default()
        };
        let written = save_config(&cfg).unwrap();
        assert!(written.starts_with(dir.path()));
        let reloaded = load_config(&written).unwrap();
        assert_eq!(reloaded.server.port, 4242);
        clear_config_dir();
    }

    #[test]
    fn data_dir_override_wins() {
        set_data_dir("/tmp/herald-test-data");
        assert_eq!(data_dir(), PathBuf::from("/tmp/herald-test-data"));
        clear_data_dir();
    }
}
