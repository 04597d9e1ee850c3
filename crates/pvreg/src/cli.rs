//! Clap derive structures for the `pvreg` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pvreg -- inspect and reconcile PVR provider and media registries
#[derive(Debug, Parser)]
#[command(
    name = "pvreg",
    version,
    about = "Reconcile PVR providers and media across client backends",
    long_about = "Keeps a local registry of content providers and media items in sync\n\
        with the PVR client backends listed in the config file.\n\n\
        Each backend is described by a JSON snapshot; refresh cycles merge what\n\
        the backends report into the local JSON stores.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "PVREG_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (defaults to `defaults.output` from the config)
    #[arg(long, short = 'o', global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

impl GlobalOpts {
    pub fn format(&self) -> OutputFormat {
        self.output.clone().unwrap_or(OutputFormat::Table)
    }
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a refresh cycle against every configured backend
    #[command(alias = "r")]
    Refresh(RefreshArgs),

    /// Inspect and edit content providers
    #[command(alias = "prov", alias = "p")]
    Providers(ProvidersArgs),

    /// Inspect media items and their playback state
    #[command(alias = "m")]
    Media(MediaArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Refresh ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Only refresh this registry
    #[arg(long, value_enum)]
    pub only: Option<RegistryName>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RegistryName {
    Providers,
    Media,
}

// ── Providers ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProvidersArgs {
    #[command(subcommand)]
    pub command: ProvidersCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProvidersCommand {
    /// List providers
    #[command(alias = "ls")]
    List(ProviderListArgs),

    /// Show one provider by id or `client/uid`
    Get {
        /// Surrogate id or `client/uid` key
        provider: String,
    },

    /// Change the display name of a provider and persist it
    Rename {
        /// Surrogate id or `client/uid` key
        provider: String,
        /// New display name
        name: String,
    },

    /// Remove a provider from the registry and the store
    #[command(alias = "rm")]
    Remove {
        /// Surrogate id or `client/uid` key
        provider: String,
    },
}

#[derive(Debug, Args)]
pub struct ProviderListArgs {
    /// Only providers of this client backend
    #[arg(long)]
    pub client: Option<i32>,

    /// Only providers of this type (cable, satellite, iptv, ...)
    #[arg(long = "type")]
    pub provider_type: Option<String>,

    /// Only the per-backend default providers
    #[arg(long, conflicts_with = "provider_type")]
    pub defaults: bool,

    /// Run a refresh cycle before listing
    #[arg(long)]
    pub refresh: bool,
}

// ── Media ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MediaArgs {
    #[command(subcommand)]
    pub command: MediaCommand,
}

#[derive(Debug, Subcommand)]
pub enum MediaCommand {
    /// List media items
    #[command(alias = "ls")]
    List(MediaListArgs),

    /// Show one media item by id, `client/uid` key, or `pvr://` path
    Get {
        /// Surrogate id, `client/uid` key, or `pvr://media/...` path
        item: String,
    },

    /// Count TV and radio items and report deleted bins
    Stats {
        /// Run a refresh cycle first
        #[arg(long)]
        refresh: bool,
    },

    /// Set the play count of an item
    PlayCount {
        /// Surrogate id, `client/uid` key, or `pvr://media/...` path
        item: String,
        count: u32,
    },

    /// Mark an item watched (or unwatched with --unset)
    Watched {
        /// Surrogate id, `client/uid` key, or `pvr://media/...` path
        item: String,
        #[arg(long)]
        unset: bool,
    },

    /// Store where playback stopped
    Resume {
        /// Surrogate id, `client/uid` key, or `pvr://media/...` path
        item: String,
        /// Position in seconds
        position: f64,
        /// Total length in seconds
        total: f64,
    },

    /// Forget where playback stopped
    ResetResume {
        /// Surrogate id, `client/uid` key, or `pvr://media/...` path
        item: String,
    },
}

#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct MediaListArgs {
    /// Only items of this client backend
    #[arg(long)]
    pub client: Option<i32>,

    /// Only TV items
    #[arg(long, conflicts_with = "radio")]
    pub tv: bool,

    /// Only radio items
    #[arg(long)]
    pub radio: bool,

    /// Show the deleted bin instead of active items
    #[arg(long)]
    pub deleted: bool,

    /// Only items that were never played
    #[arg(long)]
    pub unwatched: bool,

    /// Case-insensitive title search
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Run a refresh cycle before listing
    #[arg(long)]
    pub refresh: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Register a client backend snapshot
    AddClient {
        /// Client id
        id: i32,
        /// Path to the backend's JSON snapshot
        path: PathBuf,
        /// Register the backend as disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Remove a client backend from the config
    RemoveClient {
        /// Client id
        id: i32,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
