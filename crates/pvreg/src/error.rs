//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use pvreg_config::ConfigError;
use pvreg_core::{ClientError, CoreError, EntityKind};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CLIENT: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Client backends ──────────────────────────────────────────────

    #[error("Client backend {client_id} is unavailable: {reason}")]
    #[diagnostic(
        code(pvreg::client_unavailable),
        help(
            "Check the snapshot file registered for client {client_id}.\n\
             Run: pvreg config show"
        )
    )]
    ClientUnavailable { client_id: i32, reason: String },

    #[error("Client backend {client_id} rejected the change: {message}")]
    #[diagnostic(
        code(pvreg::client_failed),
        help("The local registry keeps the new value; the backend will report its own on the next refresh.")
    )]
    ClientFailed { client_id: i32, message: String },

    #[error("Client backend {client_id} does not support {operation}")]
    #[diagnostic(code(pvreg::unsupported))]
    Unsupported { client_id: i32, operation: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(pvreg::not_found),
        help("Run: pvreg {list_command} to see available entries")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Store ────────────────────────────────────────────────────────

    #[error("Persistent store error: {message}")]
    #[diagnostic(
        code(pvreg::store),
        help("Check that the store directory is writable. Run: pvreg config show")
    )]
    Store { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pvreg::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(pvreg::config_exists),
        help("Pass --force to overwrite: {path}")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(pvreg::config))]
    Config(Box<figment::Error>),

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(pvreg::config_invalid))]
    ConfigInvalid { message: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(pvreg::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(pvreg::json))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ClientUnavailable { .. } | Self::ClientFailed { .. } => exit_code::CLIENT,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::ConfigExists { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

fn list_command(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Provider => "providers list",
        EntityKind::Media => "media list",
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { kind, identifier } => CliError::NotFound {
                resource_type: kind.to_string(),
                identifier,
                list_command: list_command(kind).into(),
            },
            CoreError::Client(client) => client.into(),
            CoreError::Store(e) => CliError::Store {
                message: e.to_string(),
            },
            CoreError::Config { message } => CliError::ConfigInvalid { message },
            CoreError::Internal(msg) => CliError::Internal(msg),
        }
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unavailable { client_id, reason } => CliError::ClientUnavailable {
                client_id: client_id.get(),
                reason,
            },
            ClientError::Failed { client_id, message } => CliError::ClientFailed {
                client_id: client_id.get(),
                message,
            },
            ClientError::Unsupported {
                client_id,
                operation,
            } => CliError::Unsupported {
                client_id: client_id.get(),
                operation,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Serialization(e) => CliError::ConfigInvalid {
                message: e.to_string(),
            },
        }
    }
}
