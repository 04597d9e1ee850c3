// ── Refresh cycle bookkeeping ──
//
// Batch merge of client-reported entities into a container, and the
// per-cycle report the registry hands back to callers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::debug;

use super::collection::{RegistryContainer, Upsert};
use crate::entity::{EntityKind, RegistryEntity};
use crate::error::ClientError;
use crate::model::{ClientCapabilities, ClientId};

/// How one client fared during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientOutcome {
    Ok,
    Failed(ClientError),
    /// Registered but not enabled; not queried.
    Disabled,
}

/// Summary of one completed refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub kind: EntityKind,
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    /// Store writes or deletes that failed. The in-memory state stands.
    pub store_failures: usize,
    pub clients: Vec<(ClientId, ClientOutcome)>,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    pub(crate) fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            inserted: 0,
            updated: 0,
            removed: 0,
            store_failures: 0,
            clients: Vec::new(),
            finished_at: Utc::now(),
        }
    }

    /// Anything inserted, updated or removed.
    pub fn changed(&self) -> bool {
        self.inserted + self.updated + self.removed > 0
    }

    pub fn failed_clients(&self) -> Vec<ClientId> {
        self.clients
            .iter()
            .filter(|(_, o)| matches!(o, ClientOutcome::Failed(_)))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn disabled_clients(&self) -> Vec<ClientId> {
        self.clients
            .iter()
            .filter(|(_, o)| matches!(o, ClientOutcome::Disabled))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Clients whose entities must not be pruned this cycle.
    pub(crate) fn unconfirmed_clients(&self) -> Vec<ClientId> {
        self.clients
            .iter()
            .filter(|(_, o)| !matches!(o, ClientOutcome::Ok))
            .map(|(id, _)| *id)
            .collect()
    }

    pub(crate) fn record_merge<T>(&mut self, merged: &MergeBatch<T>) {
        self.inserted += merged.inserted;
        self.updated += merged.updated;
    }
}

/// Result of [`refresh()`](crate::Registry::refresh).
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Another cycle held the registry; nothing was done.
    AlreadyRunning,
    Completed(CycleReport),
}

impl RefreshOutcome {
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            Self::Completed(r) => Some(r),
            Self::AlreadyRunning => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Entities inserted or changed by a batch merge, to be written through.
pub(crate) struct MergeBatch<T> {
    pub changed: Vec<Arc<T>>,
    pub inserted: usize,
    pub updated: usize,
}

impl<T: RegistryEntity> RegistryContainer<T> {
    /// Merge a batch of client-reported entities.
    ///
    /// Keys repeated within the batch collapse to the last occurrence
    /// before anything touches the container.
    pub(crate) fn merge_batch(
        &self,
        items: impl IntoIterator<Item = (T, ClientCapabilities)>,
    ) -> MergeBatch<T> {
        let mut deduped = IndexMap::new();
        for (entity, caps) in items {
            let key = entity.key();
            if deduped.insert(key.clone(), (entity, caps)).is_some() {
                debug!(kind = %T::KIND, %key, "duplicate identity in batch, keeping last");
            }
        }

        let mut batch = MergeBatch {
            changed: Vec::new(),
            inserted: 0,
            updated: 0,
        };
        for (key, (entity, caps)) in deduped {
            match self.upsert_from_client(entity, &caps) {
                Upsert::Inserted(e) => {
                    debug!(kind = %T::KIND, %key, id = ?e.surrogate_id(), "added");
                    batch.inserted += 1;
                    batch.changed.push(e);
                }
                Upsert::Updated(e) => {
                    debug!(kind = %T::KIND, %key, "updated");
                    batch.updated += 1;
                    batch.changed.push(e);
                }
                Upsert::Unchanged => {}
            }
        }
        batch
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Provider;
    use pretty_assertions::assert_eq;

    #[test]
    fn batch_keeps_last_duplicate() {
        let col = RegistryContainer::new();
        let caps = ClientCapabilities::all();
        let batch = col.merge_batch([
            (Provider::new(1, 7, "First"), caps),
            (Provider::new(1, 8, "Other"), caps),
            (Provider::new(1, 7, "Last"), caps),
        ]);

        assert_eq!(batch.inserted, 2);
        assert_eq!(col.len(), 2);
        assert_eq!(col.find_by_client(ClientId(1), 7_i64).unwrap().name, "Last");
    }

    #[test]
    fn batch_counts_updates_only_when_changed() {
        let col = RegistryContainer::new();
        let caps = ClientCapabilities::all();
        col.merge_batch([(Provider::new(1, 1, "A"), caps)]);

        let same = col.merge_batch([(Provider::new(1, 1, "A"), caps)]);
        assert_eq!((same.inserted, same.updated), (0, 0));
        assert!(same.changed.is_empty());

        let renamed = col.merge_batch([(Provider::new(1, 1, "B"), caps)]);
        assert_eq!((renamed.inserted, renamed.updated), (0, 1));
    }

    #[test]
    fn report_client_lists() {
        let mut report = CycleReport::new(EntityKind::Provider);
        report.clients = vec![
            (ClientId(1), ClientOutcome::Ok),
            (
                ClientId(2),
                ClientOutcome::Failed(ClientError::Failed {
                    client_id: ClientId(2),
                    message: "boom".into(),
                }),
            ),
            (ClientId(3), ClientOutcome::Disabled),
        ];

        assert_eq!(report.failed_clients(), vec![ClientId(2)]);
        assert_eq!(report.disabled_clients(), vec![ClientId(3)]);
        assert_eq!(report.unconfirmed_clients(), vec![ClientId(2), ClientId(3)]);
        assert!(!report.changed());
    }
}
