// ── Core error types ──
//
// Client and store failures are separate enums because a refresh cycle
// records them as data instead of propagating them. `CoreError` is what
// the facade operations return to callers.

use thiserror::Error;

use crate::entity::EntityKind;
use crate::model::ClientId;

/// Failure talking to a client backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("client {client_id} unavailable: {reason}")]
    Unavailable { client_id: ClientId, reason: String },

    #[error("client {client_id} failed: {message}")]
    Failed { client_id: ClientId, message: String },

    #[error("client {client_id} does not support {operation}")]
    Unsupported {
        client_id: ClientId,
        operation: String,
    },
}

impl ClientError {
    pub fn client_id(&self) -> ClientId {
        match self {
            Self::Unavailable { client_id, .. }
            | Self::Failed { client_id, .. }
            | Self::Unsupported { client_id, .. } => *client_id,
        }
    }
}

/// Failure reading or writing the persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{kind} not found: {identifier}")]
    NotFound { kind: EntityKind, identifier: String },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn not_found(kind: EntityKind, identifier: impl ToString) -> Self {
        Self::NotFound {
            kind,
            identifier: identifier.to_string(),
        }
    }
}
