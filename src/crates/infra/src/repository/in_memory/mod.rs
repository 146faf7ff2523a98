mod comment;
mod rating;
mod recycle_bin;
mod set_list;
mod track;
mod version_type;
mod work;

#[cfg(test)]
mod tests;

pub use comment::InMemoryCommentRepository;
pub use rating::InMemoryRatingRepository;
pub use recycle_bin::InMemoryRecycleBinRepository;
pub use set_list::InMemorySetListRepository;
pub use track::InMemoryTrackRepository;
pub use version_type::InMemoryVersionTypeRepository;
pub use work::InMemoryWorkRepository;

use application::shared::Repositories;
use dashmap::DashMap;
use domain::comment::Comment;
use domain::rating::Rating;
use domain::recycle_bin::RecycledKind;
use domain::set_list::{SetList, SetListEntry};
use domain::track::Track;
use domain::value::{
    CommentId, SetListEntryId, SetListId, TrackId, UserId, VersionTypeId, WorkId,
};
use domain::version_type::VersionType;
use domain::work::Work;
use std::sync::Arc;

/// 软删除记录：删除人（删除时间在实体自身的 `deleted_at` 上）
#[derive(Debug, Clone)]
pub(crate) struct Deletion {
    pub deleted_by: UserId,
}

#[derive(Default)]
pub(crate) struct Tables {
    pub tracks: DashMap<TrackId, Track>,
    pub set_lists: DashMap<SetListId, SetList>,
    pub entries: DashMap<SetListEntryId, SetListEntry>,
    pub works: DashMap<WorkId, Work>,
    pub ratings: DashMap<(TrackId, UserId), Rating>,
    pub comments: DashMap<CommentId, Comment>,
    pub version_types: DashMap<VersionTypeId, VersionType>,
    pub deletions: DashMap<(RecycledKind, i64), Deletion>,
    pub user_names: DashMap<UserId, String>,
    /// 操作名 -> 剩余的注入失败次数
    faults: DashMap<&'static str, usize>,
    /// 操作名 -> 调用次数
    calls: DashMap<&'static str, usize>,
}

/// 内存中的远端存储，所有仓储共享同一份数据
///
/// 支持按操作名注入失败，用来模拟网络错误。
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    pub(crate) tables: Arc<Tables>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            tracks: Arc::new(InMemoryTrackRepository::new(self.clone())),
            set_lists: Arc::new(InMemorySetListRepository::new(self.clone())),
            works: Arc::new(InMemoryWorkRepository::new(self.clone())),
            ratings: Arc::new(InMemoryRatingRepository::new(self.clone())),
            comments: Arc::new(InMemoryCommentRepository::new(self.clone())),
            version_types: Arc::new(InMemoryVersionTypeRepository::new(self.clone())),
            recycle_bin: Arc::new(InMemoryRecycleBinRepository::new(self.clone())),
        }
    }

    /// 让名为 `op` 的操作接下来失败 `times` 次，如 `"tracks.update_version_type"`
    pub fn fail_next(&self, op: &'static str, times: usize) {
        self.tables.faults.insert(op, times);
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.tables.calls.get(op).map(|c| *c).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.tables.calls.iter().map(|c| *c.value()).sum()
    }

    /// 记录一次调用，命中注入的失败时返回错误信息
    pub(crate) fn enter(&self, op: &'static str) -> Result<(), String> {
        *self.tables.calls.entry(op).or_insert(0) += 1;
        if let Some(mut remaining) = self.tables.faults.get_mut(op) {
            if *remaining > 0 {
                *remaining -= 1;
                log::debug!("[InMemory] injected failure for {}", op);
                return Err(format!("injected failure: {}", op));
            }
        }
        Ok(())
    }

    pub(crate) fn record_deletion(&self, kind: RecycledKind, id: i64, deleted_by: &UserId) {
        self.tables.deletions.insert(
            (kind, id),
            Deletion {
                deleted_by: deleted_by.clone(),
            },
        );
    }

    /// Work 已删除时，其成员对外表现为未分组
    pub(crate) fn visible_track(&self, mut track: Track) -> Track {
        let recycled = track
            .version_group_id
            .as_ref()
            .is_some_and(|w| self.tables.works.get(w).map_or(true, |w| w.is_deleted()));
        if recycled {
            track.version_group_id = None;
        }
        track
    }

    // ---------------------------------------------------------------
    // 写入种子数据
    // ---------------------------------------------------------------

    pub fn insert_track(&self, track: Track) {
        self.tables.tracks.insert(track.id.clone(), track);
    }

    pub fn insert_work(&self, work: Work) {
        self.tables.works.insert(work.id.clone(), work);
    }

    pub fn insert_set_list(&self, set_list: SetList) {
        self.tables.set_lists.insert(set_list.id.clone(), set_list);
    }

    pub fn insert_entry(&self, entry: SetListEntry) {
        self.tables.entries.insert(entry.id.clone(), entry);
    }

    pub fn insert_rating(&self, rating: Rating) {
        self.tables
            .ratings
            .insert((rating.track_id.clone(), rating.user_id.clone()), rating);
    }

    pub fn insert_comment(&self, comment: Comment) {
        self.tables.comments.insert(comment.id.clone(), comment);
    }

    pub fn insert_version_type(&self, version_type: VersionType) {
        self.tables
            .version_types
            .insert(version_type.id.clone(), version_type);
    }

    pub fn set_user_name(&self, user_id: UserId, name: &str) {
        self.tables.user_names.insert(user_id, name.to_string());
    }

    // ---------------------------------------------------------------
    // 直接读取（绕过故障注入）
    // ---------------------------------------------------------------

    pub fn track(&self, id: &TrackId) -> Option<Track> {
        self.tables.tracks.get(id).map(|t| t.clone())
    }

    pub fn work(&self, id: &WorkId) -> Option<Work> {
        self.tables.works.get(id).map(|w| w.clone())
    }

    pub fn set_list(&self, id: &SetListId) -> Option<SetList> {
        self.tables.set_lists.get(id).map(|l| l.clone())
    }

    /// 歌单条目，按位置排序
    pub fn entries_of(&self, set_list_id: &SetListId) -> Vec<SetListEntry> {
        let mut entries: Vec<SetListEntry> = self
            .tables
            .entries
            .iter()
            .filter(|e| &e.set_list_id == set_list_id)
            .map(|e| e.clone())
            .collect();
        domain::set_list::sort_by_position(&mut entries);
        entries
    }

    pub fn ratings_of(&self, track_id: &TrackId) -> Vec<Rating> {
        self.tables
            .ratings
            .iter()
            .filter(|r| &r.track_id == track_id)
            .map(|r| r.clone())
            .collect()
    }
}
