// ── Client backends ──
//
// A `ClientSource` is one PVR backend feeding the registries. The set of
// registered backends lives in `ClientSources`, shared by every registry.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::ClientError;
use crate::model::{
    ClientCapabilities, ClientId, ClientIdentity, MediaTag, Provider, ResumePoint,
};

/// One client backend.
///
/// Enumeration calls may block for as long as the backend takes; the
/// registry never holds its own lock across them.
#[async_trait]
pub trait ClientSource: Send + Sync {
    fn client_id(&self) -> ClientId;

    /// Disabled backends stay registered (their default provider is kept)
    /// but are not queried for items.
    fn is_enabled(&self) -> bool;

    fn capabilities(&self) -> ClientCapabilities;

    fn identity(&self) -> ClientIdentity;

    async fn providers(&self) -> Result<Vec<Provider>, ClientError>;

    /// Active media, or the deleted bin when `deleted` is set.
    async fn media(&self, deleted: bool) -> Result<Vec<MediaTag>, ClientError>;

    async fn set_play_count(&self, _tag: &MediaTag, _count: u32) -> Result<(), ClientError> {
        Err(ClientError::Unsupported {
            client_id: self.client_id(),
            operation: "play count".into(),
        })
    }

    async fn set_resume_point(
        &self,
        _tag: &MediaTag,
        _point: Option<ResumePoint>,
    ) -> Result<(), ClientError> {
        Err(ClientError::Unsupported {
            client_id: self.client_id(),
            operation: "resume point".into(),
        })
    }
}

/// Registered client backends, keyed by client id.
#[derive(Default)]
pub struct ClientSources {
    by_id: DashMap<ClientId, Arc<dyn ClientSource>>,
}

impl ClientSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, replacing any previous one with the same id.
    pub fn register(&self, source: Arc<dyn ClientSource>) {
        let id = source.client_id();
        debug!(client_id = %id, "registering client source");
        self.by_id.insert(id, source);
    }

    pub fn unregister(&self, id: ClientId) -> Option<Arc<dyn ClientSource>> {
        debug!(client_id = %id, "unregistering client source");
        self.by_id.remove(&id).map(|(_, source)| source)
    }

    pub fn get(&self, id: ClientId) -> Option<Arc<dyn ClientSource>> {
        self.by_id.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Capabilities of a registered backend, all off if unknown.
    pub fn capabilities(&self, id: ClientId) -> ClientCapabilities {
        self.get(id)
            .map(|s| s.capabilities())
            .unwrap_or_default()
    }

    /// Every registered backend, ordered by client id.
    pub fn all(&self) -> Vec<Arc<dyn ClientSource>> {
        let mut sources: Vec<Arc<dyn ClientSource>> =
            self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        sources.sort_by_key(|s| s.client_id());
        sources
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(i32);

    #[async_trait]
    impl ClientSource for Dummy {
        fn client_id(&self) -> ClientId {
            ClientId(self.0)
        }
        fn is_enabled(&self) -> bool {
            true
        }
        fn capabilities(&self) -> ClientCapabilities {
            ClientCapabilities::default()
        }
        fn identity(&self) -> ClientIdentity {
            ClientIdentity::default()
        }
        async fn providers(&self) -> Result<Vec<Provider>, ClientError> {
            Ok(Vec::new())
        }
        async fn media(&self, _deleted: bool) -> Result<Vec<MediaTag>, ClientError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn all_is_sorted_by_client_id() {
        let sources = ClientSources::new();
        sources.register(Arc::new(Dummy(3)));
        sources.register(Arc::new(Dummy(1)));
        sources.register(Arc::new(Dummy(2)));

        let ids: Vec<i32> = sources.all().iter().map(|s| s.client_id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn register_replaces_same_id() {
        let sources = ClientSources::new();
        sources.register(Arc::new(Dummy(1)));
        sources.register(Arc::new(Dummy(1)));
        assert_eq!(sources.len(), 1);

        assert!(sources.unregister(ClientId(1)).is_some());
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn default_play_count_forwarding_is_unsupported() {
        let source = Dummy(5);
        let tag = MediaTag::new(5, "x", "X");
        let err = source.set_play_count(&tag, 1).await.err();
        assert!(matches!(err, Some(ClientError::Unsupported { .. })));
    }
}
