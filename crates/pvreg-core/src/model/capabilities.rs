// ── Client capability flags ──

use serde::{Deserialize, Serialize};

/// Features a client backend supports.
///
/// The play count and resume point flags decide whether those values are
/// authoritative on the backend or kept locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ClientCapabilities {
    pub supports_providers: bool,
    pub supports_media: bool,
    pub supports_media_deleted: bool,
    pub supports_media_play_count: bool,
    pub supports_media_last_played_position: bool,
}

impl ClientCapabilities {
    /// Everything on. Convenient for tests and fully featured backends.
    pub fn all() -> Self {
        Self {
            supports_providers: true,
            supports_media: true,
            supports_media_deleted: true,
            supports_media_play_count: true,
            supports_media_last_played_position: true,
        }
    }
}

/// Display identity of a client backend. Becomes the backend's default
/// provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub name: String,
    #[serde(default)]
    pub icon_path: String,
    #[serde(default)]
    pub thumb_path: String,
}
