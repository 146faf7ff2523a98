use super::InMemoryBackend;
use async_trait::async_trait;
use chrono::Utc;
use domain::recycle_bin::RecycledKind;
use domain::set_list::{SetList, SetListEntry, SetListError, SetListRepository};
use domain::value::{Scope, SetListEntryId, SetListId, UserId};
use rand::distributions::Alphanumeric;
use rand::Rng;

const SHARE_CODE_LEN: usize = 10;

fn share_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_CODE_LEN)
        .map(char::from)
        .collect()
}

pub struct InMemorySetListRepository {
    backend: InMemoryBackend,
}

impl InMemorySetListRepository {
    pub fn new(backend: InMemoryBackend) -> Self {
        Self { backend }
    }

    fn enter(&self, op: &'static str) -> Result<(), SetListError> {
        self.backend.enter(op).map_err(SetListError::DbErr)
    }
}

#[async_trait]
impl SetListRepository for InMemorySetListRepository {
    async fn find_by_id(&self, id: &SetListId) -> Result<Option<SetList>, SetListError> {
        self.enter("set_lists.find_by_id")?;
        Ok(self.backend.set_list(id))
    }

    async fn find_by_scope(&self, scope: &Scope) -> Result<Vec<SetList>, SetListError> {
        self.enter("set_lists.find_by_scope")?;
        Ok(self
            .backend
            .tables
            .set_lists
            .iter()
            .filter(|l| {
                l.deleted_at.is_none() && scope.contains(l.band_id.as_ref(), &l.created_by)
            })
            .map(|l| l.clone())
            .collect())
    }

    async fn find_entries(&self, id: &SetListId) -> Result<Vec<SetListEntry>, SetListError> {
        self.enter("set_lists.find_entries")?;
        Ok(self.backend.entries_of(id))
    }

    /// 新歌单自动生成分享码
    async fn insert(&self, set_list: &SetList) -> Result<(), SetListError> {
        self.enter("set_lists.insert")?;
        let mut stored = set_list.clone();
        if stored.share_code.is_none() {
            stored.share_code = Some(share_code());
        }
        self.backend.insert_set_list(stored);
        Ok(())
    }

    async fn update(&self, set_list: &SetList) -> Result<(), SetListError> {
        self.enter("set_lists.update")?;
        let mut existing = self
            .backend
            .tables
            .set_lists
            .get_mut(&set_list.id)
            .ok_or_else(|| SetListError::NotFound(set_list.id.clone()))?;
        existing.title = set_list.title.clone();
        existing.description = set_list.description.clone();
        existing.updated_at = set_list.updated_at;
        Ok(())
    }

    /// 同一歌单内 (set_list_id, track_id) 唯一
    async fn add_entry(&self, entry: &SetListEntry) -> Result<(), SetListError> {
        self.enter("set_lists.add_entry")?;
        let duplicate = self
            .backend
            .tables
            .entries
            .iter()
            .any(|e| e.set_list_id == entry.set_list_id && e.track_id == entry.track_id);
        if duplicate {
            return Err(SetListError::DbErr(format!(
                "track {} already in set list {}",
                entry.track_id, entry.set_list_id
            )));
        }
        self.backend.insert_entry(entry.clone());
        Ok(())
    }

    async fn remove_entry(&self, entry_id: &SetListEntryId) -> Result<(), SetListError> {
        self.enter("set_lists.remove_entry")?;
        self.backend
            .tables
            .entries
            .remove(entry_id)
            .map(|_| ())
            .ok_or_else(|| SetListError::EntryNotFound(entry_id.clone()))
    }

    async fn update_entry_position(
        &self,
        entry_id: &SetListEntryId,
        position: i32,
    ) -> Result<(), SetListError> {
        self.enter("set_lists.update_entry_position")?;
        let mut entry = self
            .backend
            .tables
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| SetListError::EntryNotFound(entry_id.clone()))?;
        entry.position = position;
        Ok(())
    }

    async fn soft_delete(&self, id: &SetListId, deleted_by: &UserId) -> Result<(), SetListError> {
        self.enter("set_lists.soft_delete")?;
        let now = Utc::now().naive_utc();
        {
            let mut set_list = self
                .backend
                .tables
                .set_lists
                .get_mut(id)
                .ok_or_else(|| SetListError::NotFound(id.clone()))?;
            set_list.deleted_at = Some(now);
        }
        self.backend
            .record_deletion(RecycledKind::SetList, id.as_i64(), deleted_by);
        Ok(())
    }
}
