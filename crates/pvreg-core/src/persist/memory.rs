use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::Mutex;

use super::PersistentStore;
use crate::entity::RegistryEntity;
use crate::error::StoreError;
use crate::model::EntityKey;

/// In-process store. Used when nothing needs to survive a restart, and
/// in tests, where write failures can be switched on.
pub struct MemoryStore<T: RegistryEntity> {
    rows: Mutex<IndexMap<EntityKey, T>>,
    fail_writes: AtomicBool,
}

impl<T: RegistryEntity> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(IndexMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Store pre-filled with `rows`, as if persisted by an earlier run.
    pub fn with_rows(rows: impl IntoIterator<Item = T>) -> Self {
        let rows = rows.into_iter().map(|r| (r.key(), r)).collect();
        Self {
            rows: Mutex::new(rows),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent upsert and delete fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn get(&self, key: &EntityKey) -> Option<T> {
        self.rows.lock().await.get(key).cloned()
    }

    pub async fn contains(&self, key: &EntityKey) -> bool {
        self.rows.lock().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Backend("writes disabled".into()))
        } else {
            Ok(())
        }
    }
}

impl<T: RegistryEntity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: RegistryEntity> PersistentStore<T> for MemoryStore<T> {
    async fn load_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.rows.lock().await.values().cloned().collect())
    }

    async fn upsert(&self, entity: &T) -> Result<(), StoreError> {
        self.check_writable()?;
        self.rows.lock().await.insert(entity.key(), entity.clone());
        Ok(())
    }

    async fn delete(&self, entity: &T) -> Result<(), StoreError> {
        self.check_writable()?;
        self.rows.lock().await.shift_remove(&entity.key());
        Ok(())
    }
}
