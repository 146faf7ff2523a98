use crate::value::{BandId, Scope, SetListEntryId, SetListId, TrackId, UserId};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use thiserror::Error;

/// 歌单领域错误
#[derive(Error, Debug)]
pub enum SetListError {
    #[error("Database error: {0}")]
    DbErr(String),
    #[error("Validation error: {0}")]
    ValidationErr(String),
    #[error("Set list not found: {0}")]
    NotFound(SetListId),
    #[error("Entry not found: {0}")]
    EntryNotFound(SetListEntryId),
    #[error("{0}")]
    OtherErr(String),
}

/// 校验歌单标题，返回去掉首尾空白后的标题
pub fn validate_title(title: &str) -> Result<String, SetListError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(SetListError::ValidationErr(
            "Set list title cannot be empty".to_string(),
        ));
    }
    Ok(title.to_string())
}

/// 歌单条目：歌单对音轨的引用，带显式位置
#[derive(Debug, Clone, PartialEq)]
pub struct SetListEntry {
    pub id: SetListEntryId,
    pub set_list_id: SetListId,
    pub track_id: TrackId,
    /// 从 1 开始
    pub position: i32,
    pub added_by: UserId,
    pub added_at: NaiveDateTime,
}

impl SetListEntry {
    pub fn new(
        id: SetListEntryId,
        set_list_id: SetListId,
        track_id: TrackId,
        position: i32,
        added_by: UserId,
    ) -> Self {
        Self {
            id,
            set_list_id,
            track_id,
            position,
            added_by,
            added_at: Utc::now().naive_utc(),
        }
    }
}

/// 歌单（Set List）聚合根，`band_id` 为空表示个人歌单
#[derive(Debug, Clone, PartialEq)]
pub struct SetList {
    pub id: SetListId,
    pub title: String,
    pub description: Option<String>,
    pub band_id: Option<BandId>,
    pub created_by: UserId,
    pub share_code: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl SetList {
    pub fn new(
        id: SetListId,
        title: &str,
        description: Option<&str>,
        band_id: Option<BandId>,
        created_by: UserId,
    ) -> Result<Self, SetListError> {
        let title = validate_title(title)?;
        let now = Utc::now().naive_utc();
        Ok(Self {
            id,
            title,
            description: normalize_description(description),
            band_id,
            created_by,
            share_code: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    pub fn scope(&self) -> Scope {
        Scope::of(self.band_id.as_ref(), &self.created_by)
    }

    pub fn rename(&mut self, title: &str) -> Result<(), SetListError> {
        self.title = validate_title(title)?;
        self.touch();
        Ok(())
    }

    pub fn update_description(&mut self, description: Option<&str>) {
        self.description = normalize_description(description);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().naive_utc();
    }
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// 追加到末尾时使用的位置
pub fn next_position(entries: &[SetListEntry]) -> i32 {
    entries.iter().map(|e| e.position).max().unwrap_or(0) + 1
}

/// 按当前顺序重新编号为 1..N
pub fn renumber(entries: &mut [SetListEntry]) {
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.position = index as i32 + 1;
    }
}

/// 位置是否恰好为 1..N 且互不重复
pub fn is_dense(entries: &[SetListEntry]) -> bool {
    let mut positions: Vec<i32> = entries.iter().map(|e| e.position).collect();
    positions.sort_unstable();
    positions
        .iter()
        .enumerate()
        .all(|(index, position)| *position == index as i32 + 1)
}

/// 按位置排序，位置相同时按加入时间
pub fn sort_by_position(entries: &mut [SetListEntry]) {
    entries.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| a.added_at.cmp(&b.added_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// 歌单仓储接口
#[async_trait]
pub trait SetListRepository: Send + Sync {
    async fn find_by_id(&self, id: &SetListId) -> Result<Option<SetList>, SetListError>;

    async fn find_by_scope(&self, scope: &Scope) -> Result<Vec<SetList>, SetListError>;

    /// 查询歌单条目，按位置升序
    async fn find_entries(&self, id: &SetListId) -> Result<Vec<SetListEntry>, SetListError>;

    async fn insert(&self, set_list: &SetList) -> Result<(), SetListError>;

    /// 更新标题与描述
    async fn update(&self, set_list: &SetList) -> Result<(), SetListError>;

    async fn add_entry(&self, entry: &SetListEntry) -> Result<(), SetListError>;

    async fn remove_entry(&self, entry_id: &SetListEntryId) -> Result<(), SetListError>;

    async fn update_entry_position(
        &self,
        entry_id: &SetListEntryId,
        position: i32,
    ) -> Result<(), SetListError>;

    async fn soft_delete(&self, id: &SetListId, deleted_by: &UserId) -> Result<(), SetListError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, position: i32) -> SetListEntry {
        SetListEntry::new(
            SetListEntryId::from(id),
            SetListId::from(1),
            TrackId::from(id * 10),
            position,
            UserId::from(1),
        )
    }

    #[test]
    fn test_blank_title_rejected() {
        let result = SetList::new(SetListId::from(1), "   ", None, None, UserId::from(1));
        assert!(matches!(result, Err(SetListError::ValidationErr(_))));
    }

    #[test]
    fn test_title_and_description_trimmed() {
        let list = SetList::new(
            SetListId::from(1),
            "  Friday gig ",
            Some("  "),
            None,
            UserId::from(1),
        )
        .unwrap();
        assert_eq!(list.title, "Friday gig");
        assert_eq!(list.description, None);
        assert_eq!(list.scope(), Scope::Personal(UserId::from(1)));
    }

    #[test]
    fn test_renumber_makes_positions_dense() {
        let mut entries = vec![entry(1, 4), entry(2, 9), entry(3, 9)];
        assert!(!is_dense(&entries));
        renumber(&mut entries);
        let positions: Vec<i32> = entries.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert!(is_dense(&entries));
    }

    #[test]
    fn test_next_position() {
        assert_eq!(next_position(&[]), 1);
        assert_eq!(next_position(&[entry(1, 1), entry(2, 5)]), 6);
    }

    #[test]
    fn test_sort_by_position() {
        let mut entries = vec![entry(1, 3), entry(2, 1), entry(3, 2)];
        sort_by_position(&mut entries);
        let ids: Vec<i64> = entries.iter().map(|e| e.id.as_i64()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
