// ── Provider facade ──

use std::sync::Arc;

use crate::error::CoreError;
use crate::model::{ADDON_PROVIDER_UID, ClientId, EntityKey, Provider, SurrogateId};
use crate::registry::Registry;
use crate::store::RefreshOutcome;
use crate::stream::{EntityStream, ProviderFilter};

/// Provider-specific view over a `Registry<Provider>`.
#[derive(Clone)]
pub struct Providers {
    registry: Arc<Registry<Provider>>,
}

impl Providers {
    pub fn new(registry: Arc<Registry<Provider>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry<Provider>> {
        &self.registry
    }

    pub async fn load(&self) -> RefreshOutcome {
        self.registry.load().await
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        self.registry.refresh().await
    }

    // ── Lookups ─────────────────────────────────────────────────────

    pub fn by_surrogate_id(&self, id: SurrogateId) -> Option<Arc<Provider>> {
        self.registry.by_surrogate_id(id)
    }

    pub fn by_client(&self, client_id: ClientId, uid: i64) -> Option<Arc<Provider>> {
        self.registry.get(&EntityKey::new(client_id, uid))
    }

    /// The provider standing for the backend itself.
    pub fn default_provider(&self, client_id: ClientId) -> Option<Arc<Provider>> {
        self.by_client(client_id, ADDON_PROVIDER_UID)
    }

    pub fn list(&self) -> Vec<Arc<Provider>> {
        self.registry.list()
    }

    pub fn filtered(&self, filter: &ProviderFilter) -> Vec<Arc<Provider>> {
        self.list().into_iter().filter(|p| filter.matches(p)).collect()
    }

    pub fn count(&self) -> usize {
        self.registry.len()
    }

    pub fn stream(&self) -> EntityStream<Provider> {
        self.registry.entities()
    }

    // ── Mutations ───────────────────────────────────────────────────

    pub async fn remove(&self, key: &EntityKey) -> Result<Arc<Provider>, CoreError> {
        self.registry.remove(key).await
    }

    /// Store user edits (renames, icons) and apply them to the registry.
    /// A later client merge may overwrite them again.
    pub async fn persist_user_changes(&self, providers: &[Provider]) -> Result<(), CoreError> {
        self.registry.persist(providers).await
    }
}
