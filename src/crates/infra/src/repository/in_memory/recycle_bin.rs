use super::InMemoryBackend;
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use domain::recycle_bin::{RecycleBinError, RecycleBinItem, RecycleBinRepository, RecycledKind};
use domain::value::{BandId, SetListId, TrackId, UserId, WorkId};

pub struct InMemoryRecycleBinRepository {
    backend: InMemoryBackend,
}

impl InMemoryRecycleBinRepository {
    pub fn new(backend: InMemoryBackend) -> Self {
        Self { backend }
    }

    fn enter(&self, op: &'static str) -> Result<(), RecycleBinError> {
        self.backend.enter(op).map_err(RecycleBinError::DbErr)
    }

    fn item(
        &self,
        kind: RecycledKind,
        id: i64,
        name: &str,
        band_id: Option<BandId>,
        deleted_at: NaiveDateTime,
        created_by: &UserId,
    ) -> RecycleBinItem {
        let deletion = self.backend.tables.deletions.get(&(kind, id)).map(|d| d.clone());
        let deleted_by = deletion
            .as_ref()
            .map(|d| d.deleted_by.clone())
            .unwrap_or_else(|| created_by.clone());
        let mut item = RecycleBinItem::new(kind, id, name, band_id, deleted_at, deleted_by);
        item.deleted_by_name = self
            .backend
            .tables
            .user_names
            .get(&item.deleted_by)
            .map(|n| n.clone());
        item
    }

    /// 回收站中的全部条目（含已过期）
    fn deleted_items(&self, band_id: &BandId) -> Vec<RecycleBinItem> {
        let tables = &self.backend.tables;
        let tracks: Vec<_> = tables
            .tracks
            .iter()
            .filter(|t| t.band_id.as_ref() == Some(band_id))
            .filter_map(|t| t.deleted_at.map(|at| (t.id.as_i64(), t.title.clone(), at, t.created_by.clone())))
            .collect();
        let works: Vec<_> = tables
            .works
            .iter()
            .filter(|w| w.band_id.as_ref() == Some(band_id))
            .filter_map(|w| w.deleted_at.map(|at| (w.id.as_i64(), w.name.clone(), at, w.created_by.clone())))
            .collect();
        let set_lists: Vec<_> = tables
            .set_lists
            .iter()
            .filter(|l| l.band_id.as_ref() == Some(band_id))
            .filter_map(|l| l.deleted_at.map(|at| (l.id.as_i64(), l.title.clone(), at, l.created_by.clone())))
            .collect();

        let mut items = Vec::new();
        for (kind, rows) in [
            (RecycledKind::Track, tracks),
            (RecycledKind::Work, works),
            (RecycledKind::SetList, set_lists),
        ] {
            for (id, name, at, created_by) in rows {
                items.push(self.item(kind, id, &name, Some(band_id.clone()), at, &created_by));
            }
        }
        items.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        items
    }

    fn purge_row(&self, kind: RecycledKind, id: i64) -> Result<(), RecycleBinError> {
        let tables = &self.backend.tables;
        let removed = match kind {
            RecycledKind::Track => {
                let track_id = TrackId::from(id);
                let removed = tables.tracks.remove(&track_id).is_some();
                tables.entries.retain(|_, e| e.track_id != track_id);
                tables.ratings.retain(|(t, _), _| t != &track_id);
                tables.comments.retain(|_, c| c.track_id != track_id);
                removed
            }
            RecycledKind::Work => {
                let work_id = WorkId::from(id);
                let removed = tables.works.remove(&work_id).is_some();
                for mut track in tables.tracks.iter_mut() {
                    if track.is_in_work(&work_id) {
                        track.version_group_id = None;
                    }
                }
                removed
            }
            RecycledKind::SetList => {
                let set_list_id = SetListId::from(id);
                let removed = tables.set_lists.remove(&set_list_id).is_some();
                tables.entries.retain(|_, e| e.set_list_id != set_list_id);
                removed
            }
        };
        tables.deletions.remove(&(kind, id));
        if removed {
            Ok(())
        } else {
            Err(RecycleBinError::NotFound(kind, id))
        }
    }
}

#[async_trait]
impl RecycleBinRepository for InMemoryRecycleBinRepository {
    async fn list(&self, band_id: &BandId) -> Result<Vec<RecycleBinItem>, RecycleBinError> {
        self.enter("recycle_bin.list")?;
        let now = Utc::now().naive_utc();
        Ok(self
            .deleted_items(band_id)
            .into_iter()
            .filter(|item| !item.is_expired(now))
            .collect())
    }

    async fn restore(&self, kind: RecycledKind, id: i64) -> Result<(), RecycleBinError> {
        self.enter("recycle_bin.restore")?;
        let tables = &self.backend.tables;
        let restored = match kind {
            RecycledKind::Track => tables
                .tracks
                .get_mut(&TrackId::from(id))
                .and_then(|mut t| t.deleted_at.take()),
            RecycledKind::Work => tables
                .works
                .get_mut(&WorkId::from(id))
                .and_then(|mut w| w.deleted_at.take()),
            RecycledKind::SetList => tables
                .set_lists
                .get_mut(&SetListId::from(id))
                .and_then(|mut l| l.deleted_at.take()),
        };
        match restored {
            Some(_) => {
                tables.deletions.remove(&(kind, id));
                Ok(())
            }
            None => Err(RecycleBinError::NotFound(kind, id)),
        }
    }

    async fn purge(&self, kind: RecycledKind, id: i64) -> Result<(), RecycleBinError> {
        self.enter("recycle_bin.purge")?;
        self.purge_row(kind, id)
    }

    async fn empty(&self, band_id: &BandId) -> Result<usize, RecycleBinError> {
        self.enter("recycle_bin.empty")?;
        let items = self.deleted_items(band_id);
        for item in &items {
            self.purge_row(item.kind, item.id)?;
        }
        Ok(items.len())
    }
}
