use super::InMemoryBackend;
use async_trait::async_trait;
use chrono::Utc;
use domain::recycle_bin::RecycledKind;
use domain::value::{Scope, UserId, WorkId};
use domain::work::{Work, WorkError, WorkRepository};

pub struct InMemoryWorkRepository {
    backend: InMemoryBackend,
}

impl InMemoryWorkRepository {
    pub fn new(backend: InMemoryBackend) -> Self {
        Self { backend }
    }

    fn enter(&self, op: &'static str) -> Result<(), WorkError> {
        self.backend.enter(op).map_err(WorkError::DbErr)
    }
}

#[async_trait]
impl WorkRepository for InMemoryWorkRepository {
    async fn find_by_id(&self, id: &WorkId) -> Result<Option<Work>, WorkError> {
        self.enter("works.find_by_id")?;
        Ok(self.backend.tables.works.get(id).map(|w| w.clone()))
    }

    async fn find_by_scope(&self, scope: &Scope) -> Result<Vec<Work>, WorkError> {
        self.enter("works.find_by_scope")?;
        let mut works: Vec<Work> = self
            .backend
            .tables
            .works
            .iter()
            .filter(|w| !w.is_deleted() && scope.contains(w.band_id.as_ref(), &w.created_by))
            .map(|w| w.clone())
            .collect();
        works.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(works)
    }

    async fn insert(&self, work: &Work) -> Result<(), WorkError> {
        self.enter("works.insert")?;
        if self.backend.tables.works.contains_key(&work.id) {
            return Err(WorkError::DbErr(format!("duplicate work id {}", work.id)));
        }
        self.backend.tables.works.insert(work.id.clone(), work.clone());
        Ok(())
    }

    async fn update(&self, work: &Work) -> Result<(), WorkError> {
        self.enter("works.update")?;
        let mut existing = self
            .backend
            .tables
            .works
            .get_mut(&work.id)
            .ok_or_else(|| WorkError::NotFound(work.id.clone()))?;
        existing.name = work.name.clone();
        existing.description = work.description.clone();
        existing.hero_track_id = work.hero_track_id.clone();
        existing.updated_at = work.updated_at;
        Ok(())
    }

    async fn soft_delete(&self, id: &WorkId, deleted_by: &UserId) -> Result<(), WorkError> {
        self.enter("works.soft_delete")?;
        let now = Utc::now().naive_utc();
        {
            let mut work = self
                .backend
                .tables
                .works
                .get_mut(id)
                .ok_or_else(|| WorkError::NotFound(id.clone()))?;
            work.deleted_at = Some(now);
        }
        self.backend
            .record_deletion(RecycledKind::Work, id.as_i64(), deleted_by);
        Ok(())
    }
}
