use std::path::{Path, PathBuf};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use super::PersistentStore;
use crate::entity::RegistryEntity;
use crate::error::StoreError;
use crate::model::EntityKey;

/// Store backed by a single JSON array on disk.
///
/// The file is read lazily on first access and rewritten whole on every
/// write, through a temp file and a rename so a crash never leaves a
/// truncated file behind. A missing file reads as empty.
pub struct JsonFileStore<T: RegistryEntity> {
    path: PathBuf,
    rows: Mutex<Option<IndexMap<EntityKey, T>>>,
}

impl<T> JsonFileStore<T>
where
    T: RegistryEntity + Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rows: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> Result<IndexMap<EntityKey, T>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "store file missing, starting empty");
                return Ok(IndexMap::new());
            }
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(IndexMap::new());
        }
        let rows: Vec<T> = serde_json::from_slice(&bytes)?;
        Ok(rows.into_iter().map(|r| (r.key(), r)).collect())
    }

    async fn write_file(&self, rows: &IndexMap<EntityKey, T>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let values: Vec<&T> = rows.values().collect();
        let data = serde_json::to_vec_pretty(&values)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Apply `edit` to a copy of the rows, write it out, and only then
    /// make it the cached state.
    async fn commit(
        &self,
        edit: impl FnOnce(&mut IndexMap<EntityKey, T>) + Send,
    ) -> Result<(), StoreError> {
        let mut guard = self.rows.lock().await;
        let mut next = match guard.as_ref() {
            Some(rows) => rows.clone(),
            None => self.read_file().await?,
        };
        edit(&mut next);
        self.write_file(&next).await?;
        *guard = Some(next);
        Ok(())
    }
}

#[async_trait]
impl<T> PersistentStore<T> for JsonFileStore<T>
where
    T: RegistryEntity + Serialize + DeserializeOwned,
{
    async fn load_all(&self) -> Result<Vec<T>, StoreError> {
        let mut guard = self.rows.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file().await?);
        }
        Ok(guard
            .as_ref()
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert(&self, entity: &T) -> Result<(), StoreError> {
        let row = entity.clone();
        self.commit(move |rows| {
            rows.insert(row.key(), row);
        })
        .await
    }

    async fn delete(&self, entity: &T) -> Result<(), StoreError> {
        let key = entity.key();
        self.commit(move |rows| {
            rows.shift_remove(&key);
        })
        .await
    }
}
