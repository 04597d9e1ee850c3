// ── Provider domain type ──

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::capabilities::{ClientCapabilities, ClientIdentity};
use super::identity::{BackendUid, ClientId, EntityKey, SurrogateId};
use crate::entity::{EntityKind, RegistryEntity, merge_field};
use crate::error::ClientError;
use crate::source::ClientSource;

/// Backend uid reserved for a client's default provider.
pub const ADDON_PROVIDER_UID: i64 = -1;

/// Separator used when countries/languages are flattened for storage.
pub const TOKEN_SEPARATOR: char = ',';

/// Kind of service a provider delivers.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderType {
    #[default]
    Unknown,
    Addon,
    Satellite,
    Cable,
    Aerial,
    Iptv,
    Other,
}

/// A content provider reported by a client backend, or the backend's own
/// default provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    surrogate_id: Option<SurrogateId>,
    client_id: ClientId,
    uid: i64,
    #[serde(default)]
    is_client_provider: bool,

    pub name: String,
    #[serde(default)]
    pub provider_type: ProviderType,
    #[serde(default)]
    pub icon_path: String,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    /// Only set on default providers.
    #[serde(default)]
    pub thumb_path: String,
}

impl Provider {
    /// A provider as reported by a backend.
    pub fn new(client_id: impl Into<ClientId>, uid: i64, name: impl Into<String>) -> Self {
        Self {
            surrogate_id: None,
            client_id: client_id.into(),
            uid,
            is_client_provider: false,
            name: name.into(),
            provider_type: ProviderType::Unknown,
            icon_path: String::new(),
            countries: Vec::new(),
            languages: Vec::new(),
            thumb_path: String::new(),
        }
    }

    /// The default provider standing for a backend.
    pub fn for_client(client_id: impl Into<ClientId>, identity: &ClientIdentity) -> Self {
        Self {
            surrogate_id: None,
            client_id: client_id.into(),
            uid: ADDON_PROVIDER_UID,
            is_client_provider: true,
            name: identity.name.clone(),
            provider_type: ProviderType::Addon,
            icon_path: identity.icon_path.clone(),
            countries: Vec::new(),
            languages: Vec::new(),
            thumb_path: identity.thumb_path.clone(),
        }
    }

    pub fn with_type(mut self, provider_type: ProviderType) -> Self {
        self.provider_type = provider_type;
        self
    }

    pub fn with_icon(mut self, icon_path: impl Into<String>) -> Self {
        self.icon_path = icon_path.into();
        self
    }

    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = countries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn uid(&self) -> i64 {
        self.uid
    }

    pub fn is_client_provider(&self) -> bool {
        self.is_client_provider
    }

    pub fn has_provider_type(&self) -> bool {
        self.provider_type != ProviderType::Unknown
    }

    pub fn has_thumb_path(&self) -> bool {
        !self.thumb_path.is_empty()
    }

    pub fn countries_db_string(&self) -> String {
        join_tokens(&self.countries)
    }

    pub fn languages_db_string(&self) -> String {
        join_tokens(&self.languages)
    }

    pub fn set_countries_from_db_string(&mut self, raw: &str) -> bool {
        merge_field(&mut self.countries, &split_tokens(raw))
    }

    pub fn set_languages_from_db_string(&mut self, raw: &str) -> bool {
        merge_field(&mut self.languages, &split_tokens(raw))
    }
}

fn join_tokens(tokens: &[String]) -> String {
    tokens.join(&TOKEN_SEPARATOR.to_string())
}

fn split_tokens(raw: &str) -> Vec<String> {
    raw.split(TOKEN_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

impl PartialEq for Provider {
    fn eq(&self, other: &Self) -> bool {
        self.client_id == other.client_id && self.uid == other.uid
    }
}

impl Eq for Provider {}

impl RegistryEntity for Provider {
    const KIND: EntityKind = EntityKind::Provider;

    fn key(&self) -> EntityKey {
        EntityKey::new(self.client_id, BackendUid::Int(self.uid))
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

    fn is_client_sourced(&self) -> bool {
        self.is_client_provider
    }

    fn merge_from_store(&mut self, other: &Self) {
        if other.surrogate_id.is_some() {
            self.surrogate_id = other.surrogate_id;
        }
        self.name.clone_from(&other.name);
        self.provider_type = other.provider_type;
        self.icon_path.clone_from(&other.icon_path);
        if other.is_client_provider {
            self.thumb_path.clone_from(&other.thumb_path);
        }
        self.countries.clone_from(&other.countries);
        self.languages.clone_from(&other.languages);
    }

    fn merge_from_client(&mut self, other: &Self, _caps: &ClientCapabilities) -> bool {
        let mut changed = false;
        changed |= merge_field(&mut self.name, &other.name);
        changed |= merge_field(&mut self.provider_type, &other.provider_type);
        changed |= merge_field(&mut self.icon_path, &other.icon_path);
        if other.is_client_provider {
            changed |= merge_field(&mut self.thumb_path, &other.thumb_path);
        }
        changed |= merge_field(&mut self.countries, &other.countries);
        changed |= merge_field(&mut self.languages, &other.languages);
        changed
    }

    fn from_client_identity(client_id: ClientId, identity: &ClientIdentity) -> Option<Self> {
        Some(Self::for_client(client_id, identity))
    }

    fn enumerate(source: &dyn ClientSource) -> BoxFuture<'_, Result<Vec<Self>, ClientError>> {
        Box::pin(async move {
            if !source.capabilities().supports_providers {
                return Ok(Vec::new());
            }
            source.providers().await
        })
    }
}
