// ── Registry change notification ──

use serde::Serialize;

use crate::entity::EntityKind;

/// Something in a registry changed. Carries no payload beyond the kind;
/// subscribers re-read the registry (or its snapshot stream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryEvent {
    pub kind: EntityKind,
}

impl RegistryEvent {
    pub fn new(kind: EntityKind) -> Self {
        Self { kind }
    }
}
