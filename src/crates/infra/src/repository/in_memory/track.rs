use super::InMemoryBackend;
use async_trait::async_trait;
use chrono::Utc;
use domain::recycle_bin::RecycledKind;
use domain::track::{Track, TrackError, TrackRepository};
use domain::value::{Scope, TrackId, UserId, WorkId};

pub struct InMemoryTrackRepository {
    backend: InMemoryBackend,
}

impl InMemoryTrackRepository {
    pub fn new(backend: InMemoryBackend) -> Self {
        Self { backend }
    }

    fn enter(&self, op: &'static str) -> Result<(), TrackError> {
        self.backend.enter(op).map_err(TrackError::DbErr)
    }
}

#[async_trait]
impl TrackRepository for InMemoryTrackRepository {
    async fn find_by_id(&self, id: &TrackId) -> Result<Option<Track>, TrackError> {
        self.enter("tracks.find_by_id")?;
        let track = self.backend.tables.tracks.get(id).map(|t| t.clone());
        Ok(track.map(|t| self.backend.visible_track(t)))
    }

    async fn find_by_scope(&self, scope: &Scope) -> Result<Vec<Track>, TrackError> {
        self.enter("tracks.find_by_scope")?;
        let mut tracks: Vec<Track> = self
            .backend
            .tables
            .tracks
            .iter()
            .filter(|t| !t.is_deleted() && scope.contains(t.band_id.as_ref(), &t.created_by))
            .map(|t| t.clone())
            .collect();
        tracks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tracks
            .into_iter()
            .map(|t| self.backend.visible_track(t))
            .collect())
    }

    async fn find_by_work(&self, work_id: &WorkId) -> Result<Vec<Track>, TrackError> {
        self.enter("tracks.find_by_work")?;
        Ok(self
            .backend
            .tables
            .tracks
            .iter()
            .filter(|t| !t.is_deleted() && t.is_in_work(work_id))
            .map(|t| t.clone())
            .collect())
    }

    async fn update_version_type(
        &self,
        id: &TrackId,
        version_type: Option<String>,
    ) -> Result<(), TrackError> {
        self.enter("tracks.update_version_type")?;
        let mut track = self
            .backend
            .tables
            .tracks
            .get_mut(id)
            .ok_or_else(|| TrackError::NotFound(id.clone()))?;
        track.version_type = version_type;
        Ok(())
    }

    async fn update_version_group(
        &self,
        id: &TrackId,
        work_id: Option<WorkId>,
    ) -> Result<(), TrackError> {
        self.enter("tracks.update_version_group")?;
        let mut track = self
            .backend
            .tables
            .tracks
            .get_mut(id)
            .ok_or_else(|| TrackError::NotFound(id.clone()))?;
        track.version_group_id = work_id;
        Ok(())
    }

    async fn soft_delete(&self, id: &TrackId, deleted_by: &UserId) -> Result<(), TrackError> {
        self.enter("tracks.soft_delete")?;
        let now = Utc::now().naive_utc();
        {
            let mut track = self
                .backend
                .tables
                .tracks
                .get_mut(id)
                .ok_or_else(|| TrackError::NotFound(id.clone()))?;
            track.deleted_at = Some(now);
        }
        self.backend
            .record_deletion(RecycledKind::Track, id.as_i64(), deleted_by);
        Ok(())
    }
}
