// ── Filter predicates for entity snapshots ──
//
// Used by consumers to narrow a snapshot without querying the registry.

use crate::entity::RegistryEntity;
use crate::model::{ClientId, MediaTag, Provider, ProviderType};

/// Filter predicate for provider snapshots.
pub enum ProviderFilter {
    All,
    ByClient(ClientId),
    ByType(ProviderType),
    /// Only each backend's default provider.
    ClientProviders,
    Custom(Box<dyn Fn(&Provider) -> bool + Send + Sync>),
}

impl ProviderFilter {
    pub fn matches(&self, provider: &Provider) -> bool {
        match self {
            Self::All => true,
            Self::ByClient(id) => provider.client_id() == *id,
            Self::ByType(pt) => provider.provider_type == *pt,
            Self::ClientProviders => provider.is_client_provider(),
            Self::Custom(f) => f(provider),
        }
    }
}

/// Filter predicate for media tag snapshots.
pub enum MediaFilter {
    All,
    ByClient(ClientId),
    Tv,
    Radio,
    Active,
    Deleted,
    Unwatched,
    /// Items whose title contains the needle, ignoring case.
    TitleContains(String),
    Custom(Box<dyn Fn(&MediaTag) -> bool + Send + Sync>),
}

impl MediaFilter {
    pub fn matches(&self, tag: &MediaTag) -> bool {
        match self {
            Self::All => true,
            Self::ByClient(id) => tag.client_id() == *id,
            Self::Tv => !tag.is_radio,
            Self::Radio => tag.is_radio,
            Self::Active => !tag.is_deleted,
            Self::Deleted => tag.is_deleted,
            Self::Unwatched => !tag.is_watched(),
            Self::TitleContains(needle) => tag
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Self::Custom(f) => f(tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_filters() {
        let default = Provider::for_client(
            3,
            &crate::model::ClientIdentity {
                name: "Backend".into(),
                ..Default::default()
            },
        );
        let sat = Provider::new(3, 1, "Sat").with_type(ProviderType::Satellite);

        assert!(ProviderFilter::ClientProviders.matches(&default));
        assert!(!ProviderFilter::ClientProviders.matches(&sat));
        assert!(ProviderFilter::ByType(ProviderType::Satellite).matches(&sat));
        assert!(ProviderFilter::ByClient(ClientId(3)).matches(&sat));
        assert!(!ProviderFilter::ByClient(ClientId(4)).matches(&sat));
    }

    #[test]
    fn media_filters() {
        let mut tag = MediaTag::new(1, "a", "Evening News");
        tag.is_radio = true;
        tag.play_count = 2;

        assert!(MediaFilter::Radio.matches(&tag));
        assert!(!MediaFilter::Tv.matches(&tag));
        assert!(MediaFilter::Active.matches(&tag));
        assert!(!MediaFilter::Unwatched.matches(&tag));
        assert!(MediaFilter::TitleContains("news".into()).matches(&tag));
        assert!(MediaFilter::Custom(Box::new(|t| t.play_count > 1)).matches(&tag));
    }
}
