// ── Registry container ──
//
// Keyed storage for one entity kind. The map, the surrogate id counter and
// the in-progress flag sit behind one mutex so id assignment and insertion
// are atomic. Every mutation rebuilds the snapshot that subscribers get.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use tokio::sync::watch;

use crate::entity::RegistryEntity;
use crate::model::{BackendUid, ClientCapabilities, ClientId, EntityKey, SurrogateId};

/// Result of an insert-or-update.
#[derive(Debug, Clone)]
pub enum Upsert<T> {
    /// New key; a surrogate id was assigned.
    Inserted(Arc<T>),
    /// Existing key whose fields changed.
    Updated(Arc<T>),
    Unchanged,
}

impl<T> Upsert<T> {
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    pub fn entity(&self) -> Option<&Arc<T>> {
        match self {
            Self::Inserted(e) | Self::Updated(e) => Some(e),
            Self::Unchanged => None,
        }
    }
}

struct Slot<T> {
    entity: Arc<T>,
    /// Awaiting confirmation in the current refresh cycle.
    dirty: bool,
}

struct Inner<T> {
    entries: IndexMap<EntityKey, Slot<T>>,
    last_id: u64,
    updating: bool,
}

/// Thread-safe collection of registry entities keyed by `(client, uid)`.
///
/// Entities are held behind `Arc` and updated copy-on-write, so a reader
/// holding an earlier `Arc` keeps a consistent value while the entry moves
/// on. No method blocks on I/O while the lock is held.
pub struct RegistryContainer<T: RegistryEntity> {
    inner: Mutex<Inner<T>>,
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: RegistryEntity> RegistryContainer<T> {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Mutex::new(Inner {
                entries: IndexMap::new(),
                last_id: 0,
                updating: false,
            }),
            snapshot,
        }
    }

    // ── Lookups ─────────────────────────────────────────────────────

    pub fn get(&self, key: &EntityKey) -> Option<Arc<T>> {
        self.lock().entries.get(key).map(|s| Arc::clone(&s.entity))
    }

    pub fn find_by_client(&self, client_id: ClientId, uid: impl Into<BackendUid>) -> Option<Arc<T>> {
        self.get(&EntityKey::new(client_id, uid))
    }

    pub fn find_by_surrogate(&self, id: SurrogateId) -> Option<Arc<T>> {
        self.lock()
            .entries
            .values()
            .find(|s| s.entity.surrogate_id() == Some(id))
            .map(|s| Arc::clone(&s.entity))
    }

    /// Copy of the current entries, in insertion order.
    pub fn list_all(&self) -> Vec<Arc<T>> {
        self.lock()
            .entries
            .values()
            .map(|s| Arc::clone(&s.entity))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Highest surrogate id handed out (or loaded) so far.
    pub fn last_surrogate_id(&self) -> u64 {
        self.lock().last_id
    }

    // ── Merging ─────────────────────────────────────────────────────

    /// Merge a client-reported entity, inserting it with a fresh surrogate
    /// id if its key is new. Confirms the entry for the current cycle.
    pub fn upsert_from_client(&self, mut entity: T, caps: &ClientCapabilities) -> Upsert<T> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let key = entity.key();

        let outcome = if let Some(slot) = inner.entries.get_mut(&key) {
            slot.dirty = false;
            if Arc::make_mut(&mut slot.entity).merge_from_client(&entity, caps) {
                Upsert::Updated(Arc::clone(&slot.entity))
            } else {
                Upsert::Unchanged
            }
        } else {
            inner.last_id += 1;
            entity.set_surrogate_id(SurrogateId(inner.last_id));
            let entity = Arc::new(entity);
            inner.entries.insert(
                key,
                Slot {
                    entity: Arc::clone(&entity),
                    dirty: false,
                },
            );
            Upsert::Inserted(entity)
        };

        if outcome.changed() {
            self.publish(inner);
        }
        outcome
    }

    /// Hydrate from a persisted entity. An existing entry is overwritten
    /// but keeps the surrogate id it already has, and is reported as
    /// `Unchanged`. A new one keeps its stored surrogate id (the counter is
    /// raised past it) unless that id is missing or already held by another
    /// entry; then it gets a fresh one.
    pub fn upsert_from_store(&self, mut entity: T) -> Upsert<T> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let key = entity.key();

        let outcome = if let Some(slot) = inner.entries.get_mut(&key) {
            let held = slot.entity.surrogate_id();
            let merged = Arc::make_mut(&mut slot.entity);
            merged.merge_from_store(&entity);
            match held {
                Some(id) => merged.set_surrogate_id(id),
                None => {
                    if let Some(id) = merged.surrogate_id() {
                        inner.last_id = inner.last_id.max(id.get());
                    }
                }
            }
            Upsert::Unchanged
        } else {
            let taken = entity.surrogate_id().filter(|id| {
                inner
                    .entries
                    .values()
                    .any(|s| s.entity.surrogate_id() == Some(*id))
            });
            match entity.surrogate_id() {
                Some(id) if taken.is_none() => inner.last_id = inner.last_id.max(id.get()),
                _ => {
                    inner.last_id += 1;
                    entity.set_surrogate_id(SurrogateId(inner.last_id));
                }
            }
            let entity = Arc::new(entity);
            inner.entries.insert(
                key,
                Slot {
                    entity: Arc::clone(&entity),
                    dirty: false,
                },
            );
            Upsert::Inserted(entity)
        };

        self.publish(inner);
        outcome
    }

    /// Apply a local edit to an existing entry. Identity fields cannot be
    /// touched through `&mut T`'s public API.
    pub fn update(&self, key: &EntityKey, edit: impl FnOnce(&mut T)) -> Option<Arc<T>> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let slot = inner.entries.get_mut(key)?;
        edit(Arc::make_mut(&mut slot.entity));
        let updated = Arc::clone(&slot.entity);
        self.publish(inner);
        Some(updated)
    }

    // ── Removal ─────────────────────────────────────────────────────

    /// Erase an entry. Its surrogate id is not reused.
    pub fn remove(&self, key: &EntityKey) -> Option<Arc<T>> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let removed = inner.entries.shift_remove(key).map(|s| s.entity);
        if removed.is_some() {
            self.publish(inner);
        }
        removed
    }

    pub fn clear(&self) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.entries.clear();
        self.publish(inner);
    }

    // ── Cycle bookkeeping ───────────────────────────────────────────

    /// Flag every entry matching `pred` as awaiting confirmation.
    pub(crate) fn mark_dirty(&self, pred: impl Fn(&T) -> bool) {
        for slot in self.lock().entries.values_mut() {
            if pred(&slot.entity) {
                slot.dirty = true;
            }
        }
    }

    /// Remove and return every still-dirty entry matching `pred`.
    pub(crate) fn take_dirty(&self, pred: impl Fn(&T) -> bool) -> Vec<Arc<T>> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let mut taken = Vec::new();
        inner.entries.retain(|_, slot| {
            if slot.dirty && pred(&slot.entity) {
                taken.push(Arc::clone(&slot.entity));
                false
            } else {
                true
            }
        });
        if !taken.is_empty() {
            self.publish(inner);
        }
        taken
    }

    pub(crate) fn clear_dirty(&self) {
        for slot in self.lock().entries.values_mut() {
            slot.dirty = false;
        }
    }

    /// Set the in-progress flag. Returns `None` if a cycle already holds it.
    pub(crate) fn begin_update(&self) -> Option<UpdateGuard<'_, T>> {
        let mut inner = self.lock();
        if inner.updating {
            return None;
        }
        inner.updating = true;
        Some(UpdateGuard { container: self })
    }

    pub fn is_updating(&self) -> bool {
        self.lock().updating
    }

    // ── Subscriptions ───────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    // ── Private helpers ─────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // A panic inside a closure passed to `update` must not wedge the
        // registry; the map itself is never left half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Broadcast the current entries. Called with the lock held so
    /// snapshots are published in mutation order.
    fn publish(&self, inner: &Inner<T>) {
        let values: Vec<Arc<T>> = inner.entries.values().map(|s| Arc::clone(&s.entity)).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

impl<T: RegistryEntity> Default for RegistryContainer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the in-progress flag when dropped, on every exit path.
pub(crate) struct UpdateGuard<'a, T: RegistryEntity> {
    container: &'a RegistryContainer<T>,
}

impl<T: RegistryEntity> Drop for UpdateGuard<'_, T> {
    fn drop(&mut self) {
        self.container.lock().updating = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{MediaTag, Provider};
    use pretty_assertions::assert_eq;

    fn caps() -> ClientCapabilities {
        ClientCapabilities::all()
    }

    #[test]
    fn insert_assigns_monotonic_ids() {
        let col = RegistryContainer::new();
        let a = col.upsert_from_client(Provider::new(1, 1, "A"), &caps());
        let b = col.upsert_from_client(Provider::new(1, 2, "B"), &caps());

        assert!(matches!(a, Upsert::Inserted(_)));
        assert_eq!(a.entity().unwrap().surrogate_id(), Some(SurrogateId(1)));
        assert_eq!(b.entity().unwrap().surrogate_id(), Some(SurrogateId(2)));
    }

    #[test]
    fn same_key_never_duplicates() {
        let col = RegistryContainer::new();
        for name in ["A", "B", "A", "C"] {
            col.upsert_from_client(Provider::new(1, 1, name), &caps());
        }
        assert_eq!(col.len(), 1);
        assert_eq!(col.find_by_client(ClientId(1), 1_i64).unwrap().name, "C");
    }

    #[test]
    fn update_keeps_surrogate_and_reports_once() {
        let col = RegistryContainer::new();
        col.upsert_from_client(MediaTag::new(1, "1", "Foo"), &caps());

        let first = col.upsert_from_client(MediaTag::new(1, "1", "Bar"), &caps());
        let second = col.upsert_from_client(MediaTag::new(1, "1", "Bar"), &caps());

        assert!(matches!(first, Upsert::Updated(_)));
        assert!(matches!(second, Upsert::Unchanged));
        let tag = col.find_by_client(ClientId(1), "1").unwrap();
        assert_eq!(tag.title, "Bar");
        assert_eq!(tag.surrogate_id(), Some(SurrogateId(1)));
    }

    #[test]
    fn old_arc_keeps_pre_merge_value() {
        let col = RegistryContainer::new();
        col.upsert_from_client(Provider::new(1, 1, "Before"), &caps());
        let held = col.find_by_client(ClientId(1), 1_i64).unwrap();

        col.upsert_from_client(Provider::new(1, 1, "After"), &caps());
        assert_eq!(held.name, "Before");
        assert_eq!(col.find_by_client(ClientId(1), 1_i64).unwrap().name, "After");
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let col = RegistryContainer::new();
        col.upsert_from_client(Provider::new(1, 1, "A"), &caps());
        col.remove(&EntityKey::new(1, 1_i64));
        let again = col.upsert_from_client(Provider::new(1, 1, "A"), &caps());

        assert_eq!(again.entity().unwrap().surrogate_id(), Some(SurrogateId(2)));
    }

    #[test]
    fn store_upsert_keeps_stored_id_and_raises_counter() {
        let col = RegistryContainer::new();
        let mut stored = Provider::new(1, 1, "Stored");
        stored.set_surrogate_id(SurrogateId(40));

        assert!(matches!(col.upsert_from_store(stored), Upsert::Inserted(_)));
        assert_eq!(col.last_surrogate_id(), 40);

        let next = col.upsert_from_client(Provider::new(1, 2, "New"), &caps());
        assert_eq!(next.entity().unwrap().surrogate_id(), Some(SurrogateId(41)));
    }

    #[test]
    fn store_upsert_on_existing_is_silent() {
        let col = RegistryContainer::new();
        col.upsert_from_client(Provider::new(1, 1, "A"), &caps());
        let outcome = col.upsert_from_store(Provider::new(1, 1, "Hydrated"));

        assert!(!outcome.changed());
        assert_eq!(col.find_by_client(ClientId(1), 1_i64).unwrap().name, "Hydrated");
    }

    #[test]
    fn store_upsert_on_existing_keeps_assigned_id() {
        let col = RegistryContainer::new();
        col.upsert_from_client(Provider::new(1, 1, "A"), &caps());
        col.upsert_from_client(Provider::new(1, 2, "B"), &caps());

        let mut edit = Provider::new(1, 1, "Renamed");
        edit.set_surrogate_id(SurrogateId(2));
        col.upsert_from_store(edit);

        let a = col.find_by_client(ClientId(1), 1_i64).unwrap();
        assert_eq!(a.name, "Renamed");
        assert_eq!(a.surrogate_id(), Some(SurrogateId(1)));
    }

    #[test]
    fn store_insert_with_taken_id_gets_a_fresh_one() {
        let col = RegistryContainer::new();
        col.upsert_from_client(Provider::new(1, 1, "A"), &caps());
        col.upsert_from_client(Provider::new(1, 2, "B"), &caps());

        let mut clash = Provider::new(1, 9, "Clash");
        clash.set_surrogate_id(SurrogateId(2));
        let outcome = col.upsert_from_store(clash);

        assert_eq!(outcome.entity().unwrap().surrogate_id(), Some(SurrogateId(3)));
        let mut ids: Vec<_> = col.list_all().iter().filter_map(|p| p.surrogate_id()).collect();
        ids.sort_by_key(|id| id.get());
        ids.dedup();
        assert_eq!(ids.len(), col.len());
    }

    #[test]
    fn take_dirty_only_takes_unconfirmed_matches() {
        let col = RegistryContainer::new();
        col.upsert_from_client(Provider::new(1, 1, "A"), &caps());
        col.upsert_from_client(Provider::new(1, 2, "B"), &caps());
        col.upsert_from_client(Provider::new(2, 1, "C"), &caps());

        col.mark_dirty(|_| true);
        col.upsert_from_client(Provider::new(1, 1, "A"), &caps());

        let taken = col.take_dirty(|p| p.client_id() == ClientId(1));
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].name, "B");
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn update_guard_is_exclusive_and_released_on_drop() {
        let col: RegistryContainer<Provider> = RegistryContainer::new();
        let guard = col.begin_update();
        assert!(guard.is_some());
        assert!(col.begin_update().is_none());
        assert!(col.is_updating());

        drop(guard);
        assert!(!col.is_updating());
        assert!(col.begin_update().is_some());
    }

    #[test]
    fn find_by_surrogate() {
        let col = RegistryContainer::new();
        col.upsert_from_client(Provider::new(1, 1, "A"), &caps());
        col.upsert_from_client(Provider::new(1, 2, "B"), &caps());

        assert_eq!(col.find_by_surrogate(SurrogateId(2)).unwrap().name, "B");
        assert!(col.find_by_surrogate(SurrogateId(9)).is_none());
    }

    #[test]
    fn snapshot_reflects_current_state() {
        let col = RegistryContainer::new();
        assert!(col.snapshot().is_empty());

        col.upsert_from_client(Provider::new(1, 1, "A"), &caps());
        col.upsert_from_client(Provider::new(1, 2, "B"), &caps());
        assert_eq!(col.snapshot().len(), 2);

        col.clear();
        assert!(col.snapshot().is_empty());
        assert!(col.is_empty());
    }
}
