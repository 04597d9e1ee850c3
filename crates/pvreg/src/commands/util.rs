//! Shared helpers for command handlers.

use std::sync::Arc;

use pvreg_core::{
    ClientId, MediaLibrary, MediaTag, Provider, Providers, RefreshOutcome, Registry,
    RegistryEntity, SurrogateId,
};

use crate::error::CliError;

/// Resolve a provider by surrogate id or `client/uid` key.
pub fn resolve_provider(providers: &Providers, identifier: &str) -> Result<Arc<Provider>, CliError> {
    let found = if let Ok(id) = identifier.parse::<u64>() {
        providers.by_surrogate_id(SurrogateId(id))
    } else {
        let (client, uid) = split_key(identifier)?;
        let uid = uid.parse::<i64>().map_err(|_| CliError::Validation {
            field: "provider".into(),
            reason: format!("provider uid must be an integer, got '{uid}'"),
        })?;
        providers.by_client(client, uid)
    };
    found.ok_or_else(|| not_found("provider", identifier, "providers list"))
}

/// Resolve a media item by surrogate id, `client/uid` key, or `pvr://` path.
pub fn resolve_media(media: &MediaLibrary, identifier: &str) -> Result<Arc<MediaTag>, CliError> {
    let found = if identifier.starts_with("pvr://") {
        media.by_path(identifier)
    } else if let Ok(id) = identifier.parse::<u64>() {
        media.by_surrogate_id(SurrogateId(id))
    } else {
        let (client, uid) = split_key(identifier)?;
        media.by_client(client, uid)
    };
    found.ok_or_else(|| not_found("media", identifier, "media list"))
}

/// Bring a registry up to date for a command: the stored state, plus a
/// refresh cycle against the backends when asked.
pub async fn hydrate<T>(registry: &Arc<Registry<T>>, refresh: bool) -> Option<RefreshOutcome>
where
    T: RegistryEntity,
{
    if refresh {
        Some(registry.load().await)
    } else {
        let rows = registry.load_from_store().await;
        tracing::debug!(kind = %T::KIND, rows, "loaded from store");
        None
    }
}

fn split_key(identifier: &str) -> Result<(ClientId, &str), CliError> {
    let invalid = || CliError::Validation {
        field: "identifier".into(),
        reason: format!("expected an id or 'client/uid', got '{identifier}'"),
    };
    let (client, uid) = identifier.split_once('/').ok_or_else(invalid)?;
    let client = client.parse::<i32>().map_err(|_| invalid())?;
    if uid.is_empty() {
        return Err(invalid());
    }
    Ok((ClientId(client), uid))
}

fn not_found(resource_type: &str, identifier: &str, list_command: &str) -> CliError {
    CliError::NotFound {
        resource_type: resource_type.into(),
        identifier: identifier.into(),
        list_command: list_command.into(),
    }
}

/// `-` for an empty list, otherwise the items joined by ", ".
pub fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".into()
    } else {
        items.join(", ")
    }
}
