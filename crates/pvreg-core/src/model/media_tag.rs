// ── Media tag domain types ──

use chrono::{DateTime, NaiveDate, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::capabilities::ClientCapabilities;
use super::identity::{BackendUid, ClientId, EntityKey, SurrogateId};
use crate::entity::{EntityKind, RegistryEntity, merge_field};
use crate::error::ClientError;
use crate::source::ClientSource;

/// Broad class of a media item.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum MediaClass {
    #[default]
    Unknown,
    Video,
    Audio,
}

/// Content type of a media item.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum MediaType {
    #[default]
    Unknown,
    TvShow,
    Movie,
    MusicVideo,
    Music,
    RadioShow,
    Podcast,
}

/// Episode flags set by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct MediaTagFlags {
    pub series: bool,
    pub new: bool,
    pub premiere: bool,
    pub finale: bool,
    pub live: bool,
}

/// Where playback stopped last time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResumePoint {
    pub position_secs: f64,
    pub total_secs: f64,
}

/// A media item reported by a client backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    surrogate_id: Option<SurrogateId>,
    client_id: ClientId,
    uid: String,

    pub title: String,
    #[serde(default)]
    pub plot: String,
    #[serde(default)]
    pub plot_outline: String,
    #[serde(default)]
    pub directory: String,
    #[serde(default)]
    pub icon_path: String,
    #[serde(default)]
    pub thumbnail_path: String,
    #[serde(default)]
    pub fanart_path: String,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub media_class: MediaClass,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub season: Option<i32>,
    #[serde(default)]
    pub episode: Option<i32>,
    #[serde(default)]
    pub first_aired: Option<NaiveDate>,
    #[serde(default)]
    pub media_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_secs: u32,
    #[serde(default)]
    pub size_bytes: Option<i64>,
    #[serde(default)]
    pub flags: MediaTagFlags,
    /// Backend uid of the provider this item came from, if known.
    #[serde(default)]
    pub client_provider_uid: Option<i64>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_radio: bool,
    #[serde(default)]
    pub play_count: u32,
    #[serde(default)]
    pub resume_point: Option<ResumePoint>,
}

impl MediaTag {
    pub fn new(client_id: impl Into<ClientId>, uid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            surrogate_id: None,
            client_id: client_id.into(),
            uid: uid.into(),
            title: title.into(),
            plot: String::new(),
            plot_outline: String::new(),
            directory: String::new(),
            icon_path: String::new(),
            thumbnail_path: String::new(),
            fanart_path: String::new(),
            genre: Vec::new(),
            media_class: MediaClass::Unknown,
            media_type: MediaType::Unknown,
            season: None,
            episode: None,
            first_aired: None,
            media_time: None,
            duration_secs: 0,
            size_bytes: None,
            flags: MediaTagFlags::default(),
            client_provider_uid: None,
            is_deleted: false,
            is_radio: false,
            play_count: 0,
            resume_point: None,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Stable `pvr://` path of this item. Changes when the item moves
    /// between the active and deleted bins.
    pub fn path(&self) -> String {
        format!(
            "pvr://media/{}/{}/{}/{}",
            if self.is_radio { "radio" } else { "tv" },
            if self.is_deleted { "deleted" } else { "active" },
            self.client_id,
            self.uid,
        )
    }

    pub fn is_watched(&self) -> bool {
        self.play_count > 0
    }

    pub fn has_year(&self) -> bool {
        self.first_aired.is_some()
    }
}

impl PartialEq for MediaTag {
    fn eq(&self, other: &Self) -> bool {
        self.client_id == other.client_id && self.uid == other.uid
    }
}

impl Eq for MediaTag {}

impl RegistryEntity for MediaTag {
    const KIND: EntityKind = EntityKind::Media;

    fn key(&self) -> EntityKey {
        EntityKey::new(self.client_id, BackendUid::Str(self.uid.clone()))
    }

    fn client_id(&self) -> ClientId {
        self.client_id
    }

    fn surrogate_id(&self) -> Option<SurrogateId> {
        self.surrogate_id
    }

    fn set_surrogate_id(&mut self, id: SurrogateId) {
        self.surrogate_id = Some(id);
    }

    fn merge_from_store(&mut self, other: &Self) {
        let surrogate_id = other.surrogate_id.or(self.surrogate_id);
        *self = other.clone();
        self.surrogate_id = surrogate_id;
    }

    fn merge_from_client(&mut self, other: &Self, caps: &ClientCapabilities) -> bool {
        let mut changed = false;
        changed |= merge_field(&mut self.title, &other.title);
        changed |= merge_field(&mut self.plot, &other.plot);
        changed |= merge_field(&mut self.plot_outline, &other.plot_outline);
        changed |= merge_field(&mut self.directory, &other.directory);
        changed |= merge_field(&mut self.icon_path, &other.icon_path);
        changed |= merge_field(&mut self.thumbnail_path, &other.thumbnail_path);
        changed |= merge_field(&mut self.fanart_path, &other.fanart_path);
        changed |= merge_field(&mut self.genre, &other.genre);
        changed |= merge_field(&mut self.media_class, &other.media_class);
        changed |= merge_field(&mut self.media_type, &other.media_type);
        changed |= merge_field(&mut self.season, &other.season);
        changed |= merge_field(&mut self.episode, &other.episode);
        changed |= merge_field(&mut self.first_aired, &other.first_aired);
        changed |= merge_field(&mut self.media_time, &other.media_time);
        changed |= merge_field(&mut self.duration_secs, &other.duration_secs);
        changed |= merge_field(&mut self.size_bytes, &other.size_bytes);
        changed |= merge_field(&mut self.flags, &other.flags);
        changed |= merge_field(&mut self.client_provider_uid, &other.client_provider_uid);
        changed |= merge_field(&mut self.is_deleted, &other.is_deleted);
        changed |= merge_field(&mut self.is_radio, &other.is_radio);

        // Local values win unless the backend owns them.
        if caps.supports_media_play_count {
            changed |= merge_field(&mut self.play_count, &other.play_count);
        }
        if caps.supports_media_last_played_position {
            changed |= merge_field(&mut self.resume_point, &other.resume_point);
        }
        changed
    }

    fn enumerate(source: &dyn ClientSource) -> BoxFuture<'_, Result<Vec<Self>, ClientError>> {
        Box::pin(async move {
            let caps = source.capabilities();
            if !caps.supports_media {
                return Ok(Vec::new());
            }
            let mut media = source.media(false).await?;
            if caps.supports_media_deleted {
                media.extend(source.media(true).await?);
            }
            Ok(media)
        })
    }
}
