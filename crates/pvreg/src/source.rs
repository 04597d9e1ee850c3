//! Client backends read from JSON snapshot files.
//!
//! Each configured client points at a file shaped like:
//!
//! ```json
//! {
//!   "name": "Tuner box",
//!   "icon": "", "thumb": "",
//!   "enabled": true,
//!   "capabilities": { "supports_providers": true, "supports_media": true },
//!   "providers": [ { "uid": 3, "name": "Cable", "provider_type": "cable" } ],
//!   "media": [ { "uid": "rec-1", "title": "News", "is_deleted": false } ]
//! }
//! ```
//!
//! Entries never carry their owning client; it comes from the config.
//! Play count and resume point changes are written back into the file when
//! the snapshot advertises the matching capability.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use pvreg_core::{
    ClientCapabilities, ClientError, ClientId, ClientIdentity, ClientSource, MediaTag, Provider,
    ResumePoint,
};

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    name: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    thumb: String,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "ClientCapabilities::all")]
    capabilities: ClientCapabilities,
    #[serde(default)]
    providers: Vec<Value>,
    #[serde(default)]
    media: Vec<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

/// What `open` learned about the backend. Identity and capabilities are
/// fixed for the life of the source; items are re-read on every call.
#[derive(Debug, Clone)]
struct Header {
    identity: ClientIdentity,
    capabilities: ClientCapabilities,
    enabled: bool,
}

pub struct FileClientSource {
    id: ClientId,
    path: PathBuf,
    enabled_override: Option<bool>,
    header: Header,
    write_lock: Mutex<()>,
}

impl FileClientSource {
    /// Open a snapshot. An unreadable file still yields a source: it keeps
    /// its default provider and reports itself unavailable on enumeration,
    /// so nothing it reported earlier is pruned.
    pub async fn open(id: ClientId, path: impl Into<PathBuf>, enabled: Option<bool>) -> Self {
        let path = path.into();
        let header = match read_snapshot(id, &path).await {
            Ok(snap) => Header {
                identity: ClientIdentity {
                    name: if snap.name.is_empty() {
                        fallback_name(id)
                    } else {
                        snap.name
                    },
                    icon_path: snap.icon,
                    thumb_path: snap.thumb,
                },
                capabilities: snap.capabilities,
                enabled: snap.enabled,
            },
            Err(e) => {
                warn!(client_id = %id, path = %path.display(), error = %e, "client snapshot unreadable");
                Header {
                    identity: ClientIdentity {
                        name: fallback_name(id),
                        ..ClientIdentity::default()
                    },
                    capabilities: ClientCapabilities {
                        supports_providers: true,
                        supports_media: true,
                        ..ClientCapabilities::default()
                    },
                    enabled: true,
                }
            }
        };

        Self {
            id,
            path,
            enabled_override: enabled,
            header,
            write_lock: Mutex::new(()),
        }
    }

    async fn entries<T: DeserializeOwned>(
        &self,
        pick: impl FnOnce(Snapshot) -> Vec<Value>,
        what: &str,
    ) -> Result<Vec<T>, ClientError> {
        let snap = read_snapshot(self.id, &self.path).await?;
        pick(snap)
            .into_iter()
            .map(|value| {
                serde_json::from_value(owned_by(value, self.id)).map_err(|e| ClientError::Failed {
                    client_id: self.id,
                    message: format!("invalid {what} entry: {e}"),
                })
            })
            .collect()
    }

    /// Rewrite one media entry in place.
    async fn edit_media(
        &self,
        uid: &str,
        edit: impl FnOnce(&mut Map<String, Value>),
    ) -> Result<(), ClientError> {
        let _guard = self.write_lock.lock().await;
        let mut snap = read_snapshot(self.id, &self.path).await?;

        let entry = snap
            .media
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find(|m| m.get("uid").and_then(Value::as_str) == Some(uid))
            .ok_or_else(|| ClientError::Failed {
                client_id: self.id,
                message: format!("unknown media uid {uid}"),
            })?;
        edit(entry);

        let body = serde_json::to_vec_pretty(&snap).map_err(|e| self.failed(&e))?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| self.failed(&e))?;
        debug!(client_id = %self.id, uid, "snapshot updated");
        Ok(())
    }

    fn failed(&self, err: &dyn std::fmt::Display) -> ClientError {
        ClientError::Failed {
            client_id: self.id,
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ClientSource for FileClientSource {
    fn client_id(&self) -> ClientId {
        self.id
    }

    fn is_enabled(&self) -> bool {
        self.enabled_override.unwrap_or(self.header.enabled)
    }

    fn capabilities(&self) -> ClientCapabilities {
        self.header.capabilities
    }

    fn identity(&self) -> ClientIdentity {
        self.header.identity.clone()
    }

    async fn providers(&self) -> Result<Vec<Provider>, ClientError> {
        self.entries(|s| s.providers, "provider").await
    }

    async fn media(&self, deleted: bool) -> Result<Vec<MediaTag>, ClientError> {
        let all: Vec<MediaTag> = self.entries(|s| s.media, "media").await?;
        Ok(all.into_iter().filter(|m| m.is_deleted == deleted).collect())
    }

    async fn set_play_count(&self, tag: &MediaTag, count: u32) -> Result<(), ClientError> {
        self.edit_media(tag.uid(), |entry| {
            entry.insert("play_count".into(), Value::from(count));
        })
        .await
    }

    async fn set_resume_point(
        &self,
        tag: &MediaTag,
        point: Option<ResumePoint>,
    ) -> Result<(), ClientError> {
        let value = serde_json::to_value(point).map_err(|e| self.failed(&e))?;
        self.edit_media(tag.uid(), |entry| {
            entry.insert("resume_point".into(), value);
        })
        .await
    }
}

fn fallback_name(id: ClientId) -> String {
    format!("Client {id}")
}

async fn read_snapshot(id: ClientId, path: &Path) -> Result<Snapshot, ClientError> {
    let unavailable = |reason: String| ClientError::Unavailable {
        client_id: id,
        reason,
    };
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| unavailable(format!("{}: {e}", path.display())))?;
    serde_json::from_slice(&bytes).map_err(|e| unavailable(format!("{}: {e}", path.display())))
}

/// Stamp an entry with its owning client. Registry-assigned fields in the
/// file are dropped.
fn owned_by(mut value: Value, id: ClientId) -> Value {
    if let Value::Object(map) = &mut value {
        map.insert("client_id".into(), Value::from(id.get()));
        map.remove("surrogate_id");
        map.remove("is_client_provider");
    }
    value
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use pvreg_core::RegistryEntity;

    const SNAPSHOT: &str = r#"{
        "name": "Tuner",
        "capabilities": { "supports_providers": true, "supports_media": true,
                          "supports_media_deleted": true, "supports_media_play_count": true },
        "providers": [ { "uid": 3, "name": "Cable", "provider_type": "cable" } ],
        "media": [
            { "uid": "a", "title": "A" },
            { "uid": "b", "title": "B", "is_deleted": true }
        ],
        "vendor": "acme"
    }"#;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("client.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn entries_are_owned_by_the_configured_client() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileClientSource::open(ClientId(9), write(&dir, SNAPSHOT), None).await;

        assert_eq!(source.identity().name, "Tuner");
        assert!(source.is_enabled());

        let providers = source.providers().await.unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].client_id(), ClientId(9));
        assert!(!providers[0].is_client_provider());

        let active = source.media(false).await.unwrap();
        let deleted = source.media(true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(deleted[0].uid(), "b");
    }

    #[tokio::test]
    async fn missing_file_is_unavailable_but_keeps_an_identity() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileClientSource::open(ClientId(2), dir.path().join("nope.json"), None).await;

        assert_eq!(source.identity().name, "Client 2");
        assert!(source.capabilities().supports_media);
        let err = source.media(false).await.unwrap_err();
        assert!(matches!(err, ClientError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn config_override_disables_the_backend() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileClientSource::open(ClientId(1), write(&dir, SNAPSHOT), Some(false)).await;
        assert!(!source.is_enabled());
    }

    #[tokio::test]
    async fn play_count_is_written_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, SNAPSHOT);
        let source = FileClientSource::open(ClientId(1), &path, None).await;
        let tag = MediaTag::new(1, "a", "A");

        source.set_play_count(&tag, 3).await.unwrap();

        let media = source.media(false).await.unwrap();
        assert_eq!(media[0].play_count, 3);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"vendor\": \"acme\""));
    }

    #[tokio::test]
    async fn unknown_uid_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileClientSource::open(ClientId(1), write(&dir, SNAPSHOT), None).await;
        let tag = MediaTag::new(1, "ghost", "Ghost");

        let err = source.set_resume_point(&tag, None).await.unwrap_err();
        assert!(matches!(err, ClientError::Failed { .. }));
    }
}
