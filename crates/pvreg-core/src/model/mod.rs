// ── Domain model ──
//
// Identity types plus the two entity kinds held by the registries.

pub mod capabilities;
pub mod identity;
pub mod media_tag;
pub mod provider;

// ── Re-exports ──────────────────────────────────────────────────────

pub use capabilities::{ClientCapabilities, ClientIdentity};
pub use identity::{BackendUid, ClientId, EntityKey, SurrogateId};
pub use media_tag::{MediaClass, MediaTag, MediaTagFlags, MediaType, ResumePoint};
pub use provider::{ADDON_PROVIDER_UID, Provider, ProviderType, TOKEN_SEPARATOR};
