//! pvreg-core: provider and media tag registries reconciled across PVR
//! client backends and a local persistent store.
//!
//! Each [`Registry`] keeps one entity kind deduplicated by
//! `(client, backend uid)`, hands out stable surrogate ids, and converges
//! on what the enabled backends report through periodic refresh cycles.
//! [`RegistryHost`] wires both registries together with a background task.

pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod host;
pub mod media;
pub mod model;
pub mod persist;
pub mod providers;
pub mod registry;
pub mod source;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::RegistryConfig;
pub use entity::{EntityKind, RegistryEntity};
pub use error::{ClientError, CoreError, StoreError};
pub use event::RegistryEvent;
pub use host::RegistryHost;
pub use media::MediaLibrary;
pub use persist::{JsonFileStore, MemoryStore, PersistentStore};
pub use providers::Providers;
pub use registry::Registry;
pub use source::{ClientSource, ClientSources};
pub use store::{ClientOutcome, CycleReport, RefreshOutcome, RegistryContainer, Upsert};
pub use stream::{EntityStream, MediaFilter, ProviderFilter};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ADDON_PROVIDER_UID, BackendUid, ClientCapabilities, ClientId, ClientIdentity, EntityKey,
    MediaClass, MediaTag, MediaTagFlags, MediaType, Provider, ProviderType, ResumePoint,
    SurrogateId,
};
