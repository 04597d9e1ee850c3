// ── Media library facade ──
//
// Counters and playback state on top of `Registry<MediaTag>`. Play count
// and resume point live locally unless the owning backend declares them
// as its own; then every change is forwarded to it as well.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::entity::RegistryEntity;
use crate::error::CoreError;
use crate::model::{ClientId, EntityKey, MediaTag, ResumePoint, SurrogateId};
use crate::registry::Registry;
use crate::store::RefreshOutcome;
use crate::stream::{EntityStream, MediaFilter};

#[derive(Clone)]
pub struct MediaLibrary {
    registry: Arc<Registry<MediaTag>>,
}

impl MediaLibrary {
    pub fn new(registry: Arc<Registry<MediaTag>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry<MediaTag>> {
        &self.registry
    }

    pub async fn load(&self) -> RefreshOutcome {
        self.registry.load().await
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        self.registry.refresh().await
    }

    // ── Counters ────────────────────────────────────────────────────

    /// Active (non-deleted) TV items.
    pub fn tv_count(&self) -> usize {
        self.count_where(|t| !t.is_radio && !t.is_deleted)
    }

    /// Active (non-deleted) radio items.
    pub fn radio_count(&self) -> usize {
        self.count_where(|t| t.is_radio && !t.is_deleted)
    }

    pub fn has_deleted_tv(&self) -> bool {
        self.any(|t| !t.is_radio && t.is_deleted)
    }

    pub fn has_deleted_radio(&self) -> bool {
        self.any(|t| t.is_radio && t.is_deleted)
    }

    fn count_where(&self, pred: impl Fn(&MediaTag) -> bool) -> usize {
        self.registry.list().iter().filter(|t| pred(t)).count()
    }

    fn any(&self, pred: impl Fn(&MediaTag) -> bool) -> bool {
        self.registry.list().iter().any(|t| pred(t))
    }

    // ── Lookups ─────────────────────────────────────────────────────

    pub fn by_surrogate_id(&self, id: SurrogateId) -> Option<Arc<MediaTag>> {
        self.registry.by_surrogate_id(id)
    }

    pub fn by_client(&self, client_id: ClientId, uid: &str) -> Option<Arc<MediaTag>> {
        self.registry.get(&EntityKey::new(client_id, uid))
    }

    /// Look up by `pvr://media/...` path.
    pub fn by_path(&self, path: &str) -> Option<Arc<MediaTag>> {
        self.registry.list().into_iter().find(|t| t.path() == path)
    }

    pub fn list(&self) -> Vec<Arc<MediaTag>> {
        self.registry.list()
    }

    pub fn filtered(&self, filter: &MediaFilter) -> Vec<Arc<MediaTag>> {
        self.list().into_iter().filter(|t| filter.matches(t)).collect()
    }

    pub fn stream(&self) -> EntityStream<MediaTag> {
        self.registry.entities()
    }

    // ── Playback state ──────────────────────────────────────────────
    //
    // Each operation updates the local tag first. A forwarding failure is
    // returned, but the local value stays updated.

    pub async fn set_play_count(
        &self,
        key: &EntityKey,
        count: u32,
    ) -> Result<Arc<MediaTag>, CoreError> {
        let updated = self
            .registry
            .apply_local_change(key, |t| apply_play_count(t, count))
            .await?;
        self.forward_play_state(&updated).await?;
        Ok(updated)
    }

    pub async fn increment_play_count(&self, key: &EntityKey) -> Result<Arc<MediaTag>, CoreError> {
        let updated = self
            .registry
            .apply_local_change(key, |t| {
                let next = t.play_count.saturating_add(1);
                apply_play_count(t, next);
            })
            .await?;
        self.forward_play_state(&updated).await?;
        Ok(updated)
    }

    /// `true` counts one more play, `false` resets the count to zero.
    pub async fn mark_watched(
        &self,
        key: &EntityKey,
        watched: bool,
    ) -> Result<Arc<MediaTag>, CoreError> {
        if watched {
            self.increment_play_count(key).await
        } else {
            self.set_play_count(key, 0).await
        }
    }

    pub async fn set_resume_point(
        &self,
        key: &EntityKey,
        point: ResumePoint,
    ) -> Result<Arc<MediaTag>, CoreError> {
        let updated = self
            .registry
            .apply_local_change(key, |t| t.resume_point = Some(point))
            .await?;
        self.forward_resume_point(&updated).await?;
        Ok(updated)
    }

    pub async fn reset_resume_point(&self, key: &EntityKey) -> Result<Arc<MediaTag>, CoreError> {
        let updated = self
            .registry
            .apply_local_change(key, |t| t.resume_point = None)
            .await?;
        self.forward_resume_point(&updated).await?;
        Ok(updated)
    }

    /// Forward the play count, plus the cleared resume point once the item
    /// counts as played. A backend owning resume points would otherwise
    /// hand the old one back on the next refresh.
    async fn forward_play_state(&self, tag: &MediaTag) -> Result<(), CoreError> {
        self.forward_play_count(tag).await?;
        if tag.play_count > 0 {
            self.forward_resume_point(tag).await?;
        }
        Ok(())
    }

    async fn forward_play_count(&self, tag: &MediaTag) -> Result<(), CoreError> {
        let client_id = tag.client_id();
        let clients = self.registry.clients();
        if !clients.capabilities(client_id).supports_media_play_count {
            return Ok(());
        }
        let Some(source) = clients.get(client_id) else {
            return Ok(());
        };
        debug!(%client_id, uid = tag.uid(), count = tag.play_count, "forwarding play count");
        source
            .set_play_count(tag, tag.play_count)
            .await
            .map_err(|e| {
                warn!(%client_id, uid = tag.uid(), error = %e, "failed to forward play count");
                CoreError::from(e)
            })
    }

    async fn forward_resume_point(&self, tag: &MediaTag) -> Result<(), CoreError> {
        let client_id = tag.client_id();
        let clients = self.registry.clients();
        if !clients
            .capabilities(client_id)
            .supports_media_last_played_position
        {
            return Ok(());
        }
        let Some(source) = clients.get(client_id) else {
            return Ok(());
        };
        debug!(%client_id, uid = tag.uid(), "forwarding resume point");
        source
            .set_resume_point(tag, tag.resume_point)
            .await
            .map_err(|e| {
                warn!(%client_id, uid = tag.uid(), error = %e, "failed to forward resume point");
                CoreError::from(e)
            })
    }
}

/// A positive play count means the item was finished; drop the resume
/// point along with it.
fn apply_play_count(tag: &mut MediaTag, count: u32) {
    tag.play_count = count;
    if count > 0 {
        tag.resume_point = None;
    }
}
