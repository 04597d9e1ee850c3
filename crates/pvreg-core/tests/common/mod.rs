// Shared fixtures for the registry integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Notify, broadcast};

use pvreg_core::{
    ClientCapabilities, ClientError, ClientId, ClientIdentity, ClientSource, ClientSources,
    MediaTag, PersistentStore, Provider, Registry, RegistryEntity, RegistryEvent, ResumePoint,
};

/// Scriptable client backend.
pub struct MockSource {
    id: ClientId,
    enabled: AtomicBool,
    caps: Mutex<ClientCapabilities>,
    identity: Mutex<ClientIdentity>,
    providers: Mutex<Result<Vec<Provider>, ClientError>>,
    media: Mutex<Result<Vec<MediaTag>, ClientError>>,
    deleted_media: Mutex<Vec<MediaTag>>,
    gate: Mutex<Option<Arc<Notify>>>,
    fail_forwarding: AtomicBool,
    pub forwarded_play_counts: Mutex<Vec<(String, u32)>>,
    pub forwarded_resume_points: Mutex<Vec<(String, Option<ResumePoint>)>>,
}

impl MockSource {
    pub fn new(id: i32) -> Arc<Self> {
        Arc::new(Self {
            id: ClientId(id),
            enabled: AtomicBool::new(true),
            caps: Mutex::new(ClientCapabilities {
                supports_providers: true,
                supports_media: true,
                supports_media_deleted: true,
                ..ClientCapabilities::default()
            }),
            identity: Mutex::new(ClientIdentity {
                name: format!("Backend {id}"),
                ..ClientIdentity::default()
            }),
            providers: Mutex::new(Ok(Vec::new())),
            media: Mutex::new(Ok(Vec::new())),
            deleted_media: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            fail_forwarding: AtomicBool::new(false),
            forwarded_play_counts: Mutex::new(Vec::new()),
            forwarded_resume_points: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_capabilities(&self, caps: ClientCapabilities) {
        *self.caps.lock().unwrap() = caps;
    }

    pub fn set_name(&self, name: &str) {
        self.identity.lock().unwrap().name = name.to_owned();
    }

    pub fn report_providers(&self, providers: Vec<Provider>) {
        *self.providers.lock().unwrap() = Ok(providers);
    }

    pub fn report_media(&self, media: Vec<MediaTag>) {
        *self.media.lock().unwrap() = Ok(media);
    }

    pub fn report_deleted_media(&self, media: Vec<MediaTag>) {
        *self.deleted_media.lock().unwrap() = media;
    }

    /// Make every enumeration fail until the next `report_*` call.
    pub fn fail(&self) {
        let err = ClientError::Unavailable {
            client_id: self.id,
            reason: "connection refused".into(),
        };
        *self.providers.lock().unwrap() = Err(err.clone());
        *self.media.lock().unwrap() = Err(err);
    }

    pub fn fail_forwarding(&self) {
        self.fail_forwarding.store(true, Ordering::SeqCst);
    }

    /// Block enumerations until the returned notifier fires.
    pub fn hold(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    async fn wait_gate(&self) {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn check_forwarding(&self) -> Result<(), ClientError> {
        if self.fail_forwarding.load(Ordering::SeqCst) {
            Err(ClientError::Failed {
                client_id: self.id,
                message: "backend rejected update".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ClientSource for MockSource {
    fn client_id(&self) -> ClientId {
        self.id
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn capabilities(&self) -> ClientCapabilities {
        *self.caps.lock().unwrap()
    }

    fn identity(&self) -> ClientIdentity {
        self.identity.lock().unwrap().clone()
    }

    async fn providers(&self) -> Result<Vec<Provider>, ClientError> {
        self.wait_gate().await;
        self.providers.lock().unwrap().clone()
    }

    async fn media(&self, deleted: bool) -> Result<Vec<MediaTag>, ClientError> {
        self.wait_gate().await;
        if deleted {
            Ok(self.deleted_media.lock().unwrap().clone())
        } else {
            self.media.lock().unwrap().clone()
        }
    }

    async fn set_play_count(&self, tag: &MediaTag, count: u32) -> Result<(), ClientError> {
        self.check_forwarding()?;
        self.forwarded_play_counts
            .lock()
            .unwrap()
            .push((tag.uid().to_owned(), count));
        Ok(())
    }

    async fn set_resume_point(
        &self,
        tag: &MediaTag,
        point: Option<ResumePoint>,
    ) -> Result<(), ClientError> {
        self.check_forwarding()?;
        self.forwarded_resume_points
            .lock()
            .unwrap()
            .push((tag.uid().to_owned(), point));
        Ok(())
    }
}

pub fn sources(list: &[&Arc<MockSource>]) -> Arc<ClientSources> {
    let sources = Arc::new(ClientSources::new());
    for &source in list {
        let source: Arc<dyn ClientSource> = source.clone();
        sources.register(source);
    }
    sources
}

pub fn registry<T: RegistryEntity>(
    clients: &Arc<ClientSources>,
    store: Arc<dyn PersistentStore<T>>,
) -> (Arc<Registry<T>>, broadcast::Receiver<RegistryEvent>) {
    let (events, rx) = broadcast::channel(16);
    (Arc::new(Registry::new(Arc::clone(clients), store, events)), rx)
}

pub fn tag(client: i32, uid: &str, title: &str) -> MediaTag {
    MediaTag::new(client, uid, title)
}

/// Count events waiting on `rx` without blocking.
pub fn drain(rx: &mut broadcast::Receiver<RegistryEvent>) -> usize {
    let mut n = 0;
    while rx.try_recv().is_ok() {
        n += 1;
    }
    n
}
