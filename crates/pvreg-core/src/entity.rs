// ── Registry entity contract ──
//
// Provider and MediaTag both implement `RegistryEntity`. The registry
// container and refresh service are generic over it.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::model::{ClientCapabilities, ClientId, ClientIdentity, EntityKey, SurrogateId};
use crate::source::ClientSource;

/// Which registry an entity (or an event) belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Provider,
    Media,
}

/// A value stored in a registry.
///
/// Identity is [`key()`](Self::key); two values with the same key are the
/// same entity with an update pending. The surrogate id is assigned by the
/// container on first insertion and carried across every later merge.
pub trait RegistryEntity: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn key(&self) -> EntityKey;

    fn client_id(&self) -> ClientId;

    fn surrogate_id(&self) -> Option<SurrogateId>;

    fn set_surrogate_id(&mut self, id: SurrogateId);

    /// True for an entity representing the backend itself rather than an
    /// item the backend reported.
    fn is_client_sourced(&self) -> bool {
        false
    }

    /// Hydrate from a persisted copy: overwrite every mutable field.
    fn merge_from_store(&mut self, other: &Self);

    /// Merge a client-reported copy. Returns `true` iff any field changed.
    fn merge_from_client(&mut self, other: &Self, caps: &ClientCapabilities) -> bool;

    /// Entity standing for the backend itself, if this kind has one.
    fn from_client_identity(_client_id: ClientId, _identity: &ClientIdentity) -> Option<Self> {
        None
    }

    /// Fetch this kind's entities from a backend.
    fn enumerate(source: &dyn ClientSource) -> BoxFuture<'_, Result<Vec<Self>, ClientError>>;
}

/// Overwrite `dst` with `src` if they differ. Returns whether it changed.
pub(crate) fn merge_field<V: PartialEq + Clone>(dst: &mut V, src: &V) -> bool {
    if dst == src {
        false
    } else {
        dst.clone_from(src);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_field_reports_change_once() {
        let mut name = String::from("Foo");
        assert!(merge_field(&mut name, &"Bar".to_owned()));
        assert_eq!(name, "Bar");
        assert!(!merge_field(&mut name, &"Bar".to_owned()));
    }

    #[test]
    fn entity_kind_display() {
        assert_eq!(EntityKind::Provider.to_string(), "provider");
        assert_eq!(EntityKind::Media.to_string(), "media");
    }
}
