//! CLI configuration: thin wrapper around `pvreg_config` shared types.
//!
//! Adds `--config` resolution and turns the loaded config into a
//! one-shot `RegistryHost` wired to file-backed clients and stores.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;

use pvreg_core::{
    ClientId, ClientSources, JsonFileStore, MediaTag, MemoryStore, PersistentStore, Provider,
    RegistryConfig, RegistryHost,
};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::source::FileClientSource;

// ── Re-exports from shared crate ────────────────────────────────────

pub use pvreg_config::{ClientEntry, Config, load_config_from, save_config_to};

// ── CLI-specific helpers ────────────────────────────────────────────

/// `--config` / `PVREG_CONFIG`, else the platform default.
pub fn resolve_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(pvreg_config::config_path)
}

/// Directory relative client paths resolve against.
pub fn base_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Fill in `--output` from `defaults.output` when the flag was not given.
/// An unrecognised value in the file falls back to the table.
pub fn apply_defaults(global: &mut GlobalOpts, cfg: &Config) {
    if global.output.is_none() {
        global.output = OutputFormat::from_str(&cfg.defaults.output, true).ok();
    }
}

/// Build a host for a single command: no background task, nothing loaded.
/// Each handler decides whether it needs the store, a refresh, or both.
pub async fn open_host(cfg: &Config, config_path: &Path) -> Result<RegistryHost, CliError> {
    let base = base_dir(config_path);
    let clients = Arc::new(ClientSources::new());
    for entry in &cfg.clients {
        let source =
            FileClientSource::open(ClientId(entry.id), entry.resolve_path(&base), entry.enabled)
                .await;
        clients.register(Arc::new(source));
    }

    let (provider_store, media_store): (
        Arc<dyn PersistentStore<Provider>>,
        Arc<dyn PersistentStore<MediaTag>>,
    ) = if cfg.store.ephemeral {
        (Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    } else {
        (
            Arc::new(JsonFileStore::new(cfg.store.providers_path())),
            Arc::new(JsonFileStore::new(cfg.store.media_path())),
        )
    };

    let registry = RegistryConfig {
        refresh_interval_secs: 0,
        load_on_start: false,
        ..cfg.registry_config()?
    };
    Ok(RegistryHost::new(registry, clients, provider_store, media_store)?)
}
