// ── Registry host ──
//
// Owns the provider and media registries, the client source set, the
// shared event channel, and the background refresh task.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::error::CoreError;
use crate::event::RegistryEvent;
use crate::media::MediaLibrary;
use crate::model::{MediaTag, Provider};
use crate::persist::PersistentStore;
use crate::providers::Providers;
use crate::registry::Registry;
use crate::source::ClientSources;
use crate::store::RefreshOutcome;

/// Top-level handle. Cheaply cloneable via `Arc<HostInner>`.
#[derive(Clone)]
pub struct RegistryHost {
    inner: Arc<HostInner>,
}

struct HostInner {
    config: RegistryConfig,
    clients: Arc<ClientSources>,
    providers: Providers,
    media: MediaLibrary,
    events: broadcast::Sender<RegistryEvent>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl RegistryHost {
    /// Build both registries. Does not load or refresh; call
    /// [`start()`](Self::start) for that.
    pub fn new(
        config: RegistryConfig,
        clients: Arc<ClientSources>,
        provider_store: Arc<dyn PersistentStore<Provider>>,
        media_store: Arc<dyn PersistentStore<MediaTag>>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let (events, _) = broadcast::channel(config.event_channel_size);

        let providers = Providers::new(Arc::new(Registry::new(
            Arc::clone(&clients),
            provider_store,
            events.clone(),
        )));
        let media = MediaLibrary::new(Arc::new(Registry::new(
            Arc::clone(&clients),
            media_store,
            events.clone(),
        )));

        Ok(Self {
            inner: Arc::new(HostInner {
                config,
                clients,
                providers,
                media,
                events,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    pub fn clients(&self) -> &Arc<ClientSources> {
        &self.inner.clients
    }

    pub fn providers(&self) -> &Providers {
        &self.inner.providers
    }

    pub fn media(&self) -> &MediaLibrary {
        &self.inner.media
    }

    pub fn events(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.events.subscribe()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Load both registries (if configured) and spawn the periodic
    /// refresh task (if an interval is set).
    pub async fn start(&self) {
        if self.inner.config.load_on_start {
            self.load_all().await;
        }

        if let Some(period) = self.inner.config.refresh_interval() {
            let host = self.clone();
            let cancel = self.inner.cancel.clone();
            let handle = tokio::spawn(refresh_task(host, period, cancel));
            self.inner.task_handles.lock().await.push(handle);
        }
        info!(clients = self.inner.clients.len(), "registry host started");
    }

    /// Stop the background task and wait for it. A cycle already running
    /// is allowed to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("registry host stopped");
    }

    /// Reload both registries from their stores, providers first.
    pub async fn load_all(&self) -> (RefreshOutcome, RefreshOutcome) {
        let providers = self.inner.providers.load().await;
        let media = self.inner.media.load().await;
        (providers, media)
    }

    /// One refresh cycle on each registry, providers first.
    pub async fn refresh_all(&self) -> (RefreshOutcome, RefreshOutcome) {
        let providers = self.inner.providers.refresh().await;
        let media = self.inner.media.refresh().await;
        (providers, media)
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn refresh_task(host: RegistryHost, period: std::time::Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let (providers, media) = host.refresh_all().await;
                if !providers.is_completed() || !media.is_completed() {
                    debug!("periodic refresh overlapped a running cycle");
                }
            }
        }
    }
}
