//! Shared configuration for pvreg.
//!
//! TOML file plus `PVREG_` environment overrides, client backend
//! definitions, store locations, and translation to
//! `pvreg_core::RegistryConfig`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pvreg_core::RegistryConfig;

/// Prefix of every environment override. Nested keys are separated by a
/// double underscore, e.g. `PVREG_REGISTRY__REFRESH_INTERVAL_SECS`.
pub const ENV_PREFIX: &str = "PVREG_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(default)]
    pub store: StoreSettings,

    /// Client backends, each backed by a JSON snapshot file.
    #[serde(default)]
    pub clients: Vec<ClientEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}

/// Refresh tuning, mirrored into `RegistryConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegistrySettings {
    /// Seconds between background refresh cycles. 0 = never.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_event_channel_size")]
    pub event_channel_size: usize,

    #[serde(default = "default_true")]
    pub load_on_start: bool,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            event_channel_size: default_event_channel_size(),
            load_on_start: true,
        }
    }
}

fn default_refresh_interval() -> u64 {
    60
}
fn default_event_channel_size() -> usize {
    64
}
fn default_true() -> bool {
    true
}

/// Where the JSON stores live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreSettings {
    /// Directory holding `providers.json` and `media.json`. Defaults to
    /// the platform data directory.
    pub dir: Option<PathBuf>,

    /// Keep everything in memory; nothing survives the process.
    #[serde(default)]
    pub ephemeral: bool,
}

impl StoreSettings {
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(data_dir)
    }

    pub fn providers_path(&self) -> PathBuf {
        self.dir().join("providers.json")
    }

    pub fn media_path(&self) -> PathBuf {
        self.dir().join("media.json")
    }
}

/// One client backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientEntry {
    pub id: i32,

    /// JSON snapshot describing the backend. Relative paths resolve
    /// against the config file's directory.
    pub path: PathBuf,

    /// Overrides the `enabled` flag in the snapshot.
    pub enabled: Option<bool>,
}

impl ClientEntry {
    pub fn resolve_path(&self, base: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            base.join(&self.path)
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.event_channel_size == 0 {
            return Err(ConfigError::Validation {
                field: "registry.event_channel_size".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let mut seen = HashSet::new();
        for client in &self.clients {
            if !seen.insert(client.id) {
                return Err(ConfigError::Validation {
                    field: "clients".into(),
                    reason: format!("client id {} is defined more than once", client.id),
                });
            }
        }
        Ok(())
    }

    /// Registry tuning for `RegistryHost`.
    pub fn registry_config(&self) -> Result<RegistryConfig, ConfigError> {
        self.validate()?;
        Ok(RegistryConfig {
            refresh_interval_secs: self.registry.refresh_interval_secs,
            event_channel_size: self.registry.event_channel_size,
            load_on_start: self.registry.load_on_start,
        })
    }
}

// ── Paths ───────────────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "pvreg", "pvreg").map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default directory for the JSON stores.
pub fn data_dir() -> PathBuf {
    ProjectDirs::from("org", "pvreg", "pvreg")
        .map_or_else(|| dirs_fallback().join("data"), |dirs| dirs.data_dir().to_path_buf())
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pvreg");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file + environment. A missing file yields the
/// defaults (still subject to env overrides).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        Jail::expect_with(|_jail| {
            let cfg = load_config_from(Path::new("absent.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg, Config::default());
            assert_eq!(cfg.registry.refresh_interval_secs, 60);
            assert!(cfg.clients.is_empty());
            Ok(())
        });
    }

    #[test]
    fn file_values_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [registry]
                refresh_interval_secs = 15

                [store]
                dir = "/var/lib/pvreg"

                [[clients]]
                id = 1
                path = "clients/one.json"

                [[clients]]
                id = 2
                path = "/abs/two.json"
                enabled = false
                "#,
            )?;
            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;

            assert_eq!(cfg.registry.refresh_interval_secs, 15);
            assert_eq!(cfg.registry.event_channel_size, 64);
            assert_eq!(cfg.store.media_path(), PathBuf::from("/var/lib/pvreg/media.json"));
            assert_eq!(cfg.clients.len(), 2);
            assert_eq!(cfg.clients[1].enabled, Some(false));
            assert_eq!(
                cfg.clients[0].resolve_path(Path::new("/etc/pvreg")),
                PathBuf::from("/etc/pvreg/clients/one.json")
            );
            assert_eq!(
                cfg.clients[1].resolve_path(Path::new("/etc/pvreg")),
                PathBuf::from("/abs/two.json")
            );
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[registry]\nrefresh_interval_secs = 15\n")?;
            jail.set_env("PVREG_REGISTRY__REFRESH_INTERVAL_SECS", "5");
            jail.set_env("PVREG_DEFAULTS__OUTPUT", "json");

            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.registry.refresh_interval_secs, 5);
            assert_eq!(cfg.defaults.output, "json");
            Ok(())
        });
    }

    #[test]
    fn duplicate_client_ids_are_rejected() {
        let cfg = Config {
            clients: vec![
                ClientEntry {
                    id: 1,
                    path: "a.json".into(),
                    enabled: None,
                },
                ClientEntry {
                    id: 1,
                    path: "b.json".into(),
                    enabled: None,
                },
            ],
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn registry_config_translation() {
        let mut cfg = Config::default();
        cfg.registry.refresh_interval_secs = 0;
        cfg.registry.load_on_start = false;

        let rc = cfg.registry_config().unwrap();
        assert_eq!(rc.refresh_interval_secs, 0);
        assert_eq!(rc.event_channel_size, 64);
        assert!(!rc.load_on_start);

        cfg.registry.event_channel_size = 0;
        assert!(cfg.registry_config().is_err());
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.clients.push(ClientEntry {
            id: 7,
            path: "seven.json".into(),
            enabled: Some(true),
        });

        save_config_to(&cfg, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, cfg);
    }
}
