// ── Persistent store port ──
//
// The registry reads the store once on load and writes through on every
// insert, change and removal. Writes are best-effort: a failure is logged
// by the caller and never rolls back the in-memory state.

mod json_file;
mod memory;

use async_trait::async_trait;

use crate::entity::RegistryEntity;
use crate::error::StoreError;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Storage for one entity kind, addressed by the entity's key.
/// Last writer wins.
#[async_trait]
pub trait PersistentStore<T: RegistryEntity>: Send + Sync {
    async fn load_all(&self) -> Result<Vec<T>, StoreError>;

    async fn upsert(&self, entity: &T) -> Result<(), StoreError>;

    async fn delete(&self, entity: &T) -> Result<(), StoreError>;
}
