// ── Registry service ──
//
// Reconciles one entity kind across the registered client backends and the
// persistent store. Client-owned entities are settled first, then the
// entities each enabled backend reports. Pruning only trusts backends that
// answered this cycle.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::entity::RegistryEntity;
use crate::error::CoreError;
use crate::event::RegistryEvent;
use crate::model::{ClientId, EntityKey, SurrogateId};
use crate::persist::PersistentStore;
use crate::source::ClientSources;
use crate::store::{ClientOutcome, CycleReport, MergeBatch, RefreshOutcome, RegistryContainer};
use crate::stream::EntityStream;

/// Registry of one entity kind.
///
/// Shared behind `Arc` by the facades and the background refresh task.
pub struct Registry<T: RegistryEntity> {
    container: RegistryContainer<T>,
    clients: Arc<ClientSources>,
    store: Arc<dyn PersistentStore<T>>,
    events: broadcast::Sender<RegistryEvent>,
    last_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl<T: RegistryEntity> Registry<T> {
    pub fn new(
        clients: Arc<ClientSources>,
        store: Arc<dyn PersistentStore<T>>,
        events: broadcast::Sender<RegistryEvent>,
    ) -> Self {
        let (last_refresh, _) = watch::channel(None);
        Self {
            container: RegistryContainer::new(),
            clients,
            store,
            events,
            last_refresh,
        }
    }

    pub fn container(&self) -> &RegistryContainer<T> {
        &self.container
    }

    pub fn clients(&self) -> &Arc<ClientSources> {
        &self.clients
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Reload from scratch: clear, hydrate from the store, then refresh.
    pub async fn load(&self) -> RefreshOutcome {
        self.unload();
        self.load_from_store().await;
        self.refresh().await
    }

    /// Hydrate from the persistent store. A read failure is logged and
    /// treated as an empty store. Returns the number of rows loaded.
    pub async fn load_from_store(&self) -> usize {
        let rows = match self.store.load_all().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(kind = %T::KIND, error = %e, "failed to read store, starting empty");
                return 0;
            }
        };

        let count = rows.len();
        for row in rows {
            self.container.upsert_from_store(row);
        }
        info!(kind = %T::KIND, count, "loaded from store");
        if count > 0 {
            self.notify();
        }
        count
    }

    pub fn unload(&self) {
        if !self.container.is_empty() {
            self.container.clear();
            self.notify();
        }
    }

    // ── Refresh cycle ───────────────────────────────────────────────

    /// Run one reconciliation cycle. Never fails: client and store errors
    /// are logged and recorded in the returned report.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(_guard) = self.container.begin_update() else {
            debug!(kind = %T::KIND, "refresh already running, skipping");
            return RefreshOutcome::AlreadyRunning;
        };

        let mut report = CycleReport::new(T::KIND);
        let sources = self.clients.all();

        // ── Client-owned entities ──
        // Built from every registered backend, enabled or not.
        let owned: Vec<_> = sources
            .iter()
            .filter_map(|s| {
                T::from_client_identity(s.client_id(), &s.identity()).map(|e| (e, s.capabilities()))
            })
            .collect();
        self.container.mark_dirty(T::is_client_sourced);
        let merged = self.container.merge_batch(owned);
        report.record_merge(&merged);
        self.write_through(&merged, &mut report).await;

        let gone = self.container.take_dirty(T::is_client_sourced);
        self.delete_through(&gone, &mut report).await;

        // ── Backend-reported entities ──
        let mut enabled = Vec::new();
        for source in &sources {
            if source.is_enabled() {
                enabled.push(Arc::clone(source));
            } else {
                report.clients.push((source.client_id(), ClientOutcome::Disabled));
            }
        }

        let results = join_all(enabled.iter().map(|source| async move {
            let result = T::enumerate(source.as_ref()).await;
            (source.client_id(), source.capabilities(), result)
        }))
        .await;

        let mut gathered = Vec::new();
        for (client_id, caps, result) in results {
            match result {
                Ok(items) => {
                    debug!(kind = %T::KIND, %client_id, count = items.len(), "client enumerated");
                    for item in items {
                        if item.client_id() == client_id {
                            gathered.push((item, caps));
                        } else {
                            warn!(
                                kind = %T::KIND,
                                %client_id,
                                key = %item.key(),
                                "client reported an entity it does not own, ignoring"
                            );
                        }
                    }
                    report.clients.push((client_id, ClientOutcome::Ok));
                }
                Err(e) => {
                    warn!(kind = %T::KIND, %client_id, error = %e, "client enumeration failed");
                    report.clients.push((client_id, ClientOutcome::Failed(e)));
                }
            }
        }
        report.clients.sort_by_key(|(id, _)| *id);

        let reported = |e: &T| !e.is_client_sourced();
        self.container.mark_dirty(reported);
        let merged = self.container.merge_batch(gathered);
        report.record_merge(&merged);
        self.write_through(&merged, &mut report).await;

        let keep: HashSet<ClientId> = report.unconfirmed_clients().into_iter().collect();
        let gone = self
            .container
            .take_dirty(|e| reported(e) && !keep.contains(&e.client_id()));
        self.delete_through(&gone, &mut report).await;
        // Entries of unconfirmed clients stay, unflagged.
        self.container.clear_dirty();

        report.finished_at = Utc::now();
        self.last_refresh.send_replace(Some(report.finished_at));
        if report.changed() {
            self.notify();
        }

        info!(
            kind = %T::KIND,
            inserted = report.inserted,
            updated = report.updated,
            removed = report.removed,
            store_failures = report.store_failures,
            failed_clients = report.failed_clients().len(),
            total = self.container.len(),
            "refresh cycle complete"
        );
        RefreshOutcome::Completed(report)
    }

    async fn write_through(&self, merged: &MergeBatch<T>, report: &mut CycleReport) {
        for entity in &merged.changed {
            if let Err(e) = self.store.upsert(entity).await {
                warn!(kind = %T::KIND, key = %entity.key(), error = %e, "failed to persist");
                report.store_failures += 1;
            }
        }
    }

    async fn delete_through(&self, removed: &[Arc<T>], report: &mut CycleReport) {
        for entity in removed {
            debug!(kind = %T::KIND, key = %entity.key(), "removed");
            report.removed += 1;
            if let Err(e) = self.store.delete(entity).await {
                warn!(kind = %T::KIND, key = %entity.key(), error = %e, "failed to delete from store");
                report.store_failures += 1;
            }
        }
    }

    // ── Local changes ───────────────────────────────────────────────

    /// Edit an entry in place and write it through. A store failure is
    /// logged; the in-memory edit stands.
    pub async fn apply_local_change(
        &self,
        key: &EntityKey,
        edit: impl FnOnce(&mut T),
    ) -> Result<Arc<T>, CoreError> {
        let updated = self
            .container
            .update(key, edit)
            .ok_or_else(|| CoreError::not_found(T::KIND, key))?;
        if let Err(e) = self.store.upsert(&updated).await {
            warn!(kind = %T::KIND, %key, error = %e, "failed to persist local change");
        }
        self.notify();
        Ok(updated)
    }

    /// Write caller-edited entities to the store and into the registry.
    /// Existing entries are overwritten field by field. Returns the first
    /// store error after attempting every entity.
    pub async fn persist(&self, entities: &[T]) -> Result<(), CoreError> {
        let mut first_err = None;
        for entity in entities {
            let key = entity.key();
            self.container.upsert_from_store(entity.clone());
            let Some(stored) = self.container.get(&key) else {
                continue;
            };
            if let Err(e) = self.store.upsert(&stored).await {
                warn!(kind = %T::KIND, %key, error = %e, "failed to persist");
                first_err.get_or_insert(e);
            }
        }
        if !entities.is_empty() {
            self.notify();
        }
        first_err.map_or(Ok(()), |e| Err(e.into()))
    }

    /// Erase an entry from the registry and the store. A store failure is
    /// logged; the entry stays gone from memory.
    pub async fn remove(&self, key: &EntityKey) -> Result<Arc<T>, CoreError> {
        let removed = self
            .container
            .remove(key)
            .ok_or_else(|| CoreError::not_found(T::KIND, key))?;
        if let Err(e) = self.store.delete(&removed).await {
            warn!(kind = %T::KIND, %key, error = %e, "failed to delete from store");
        }
        debug!(kind = %T::KIND, %key, "removed");
        self.notify();
        Ok(removed)
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn get(&self, key: &EntityKey) -> Option<Arc<T>> {
        self.container.get(key)
    }

    pub fn by_surrogate_id(&self, id: SurrogateId) -> Option<Arc<T>> {
        self.container.find_by_surrogate(id)
    }

    pub fn list(&self) -> Vec<Arc<T>> {
        self.container.list_all()
    }

    pub fn len(&self) -> usize {
        self.container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.container.is_empty()
    }

    // ── Subscriptions ───────────────────────────────────────────────

    /// Change events for every registry sharing this event channel.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    pub fn entities(&self) -> EntityStream<T> {
        EntityStream::new(self.container.subscribe())
    }

    pub fn last_refresh(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_refresh.subscribe()
    }

    fn notify(&self) {
        // No receivers is fine.
        let _ = self.events.send(RegistryEvent::new(T::KIND));
    }
}
