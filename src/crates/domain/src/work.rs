use crate::track::Track;
use crate::value::{BandId, Scope, TrackId, UserId, WorkId};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Work（版本组）领域错误
#[derive(Error, Debug)]
pub enum WorkError {
    #[error("Database error: {0}")]
    DbErr(String),
    #[error("Validation error: {0}")]
    ValidationErr(String),
    #[error("Work not found: {0}")]
    NotFound(WorkId),
    #[error("Track {track_id} is not a version of work {work_id}")]
    HeroNotMember { work_id: WorkId, track_id: TrackId },
    #[error("Unknown sort key: {0}")]
    UnknownSortKey(String),
    #[error("{0}")]
    OtherErr(String),
}

/// Work：把同一首歌的多个版本（demo、现场、母带）归到一起
#[derive(Debug, Clone, PartialEq)]
pub struct Work {
    pub id: WorkId,
    pub name: String,
    pub description: Option<String>,
    /// 主打版本，必须是成员之一
    pub hero_track_id: Option<TrackId>,
    pub band_id: Option<BandId>,
    pub created_by: UserId,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

fn validate_name(name: &str) -> Result<String, WorkError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WorkError::ValidationErr(
            "Work name cannot be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

impl Work {
    /// 创建空 Work（无成员、无主打版本）
    pub fn new(
        id: WorkId,
        name: &str,
        band_id: Option<BandId>,
        created_by: UserId,
    ) -> Result<Self, WorkError> {
        let name = validate_name(name)?;
        let now = Utc::now().naive_utc();
        Ok(Self {
            id,
            name,
            description: None,
            hero_track_id: None,
            band_id,
            created_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    pub fn scope(&self) -> Scope {
        Scope::of(self.band_id.as_ref(), &self.created_by)
    }

    pub fn rename(&mut self, name: &str) -> Result<(), WorkError> {
        self.name = validate_name(name)?;
        self.touch();
        Ok(())
    }

    pub fn update_description(&mut self, description: Option<&str>) {
        self.description = description
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        self.touch();
    }

    /// 设置主打版本，`members` 为当前成员
    pub fn set_hero(&mut self, track_id: &TrackId, members: &[Track]) -> Result<(), WorkError> {
        let is_member = members
            .iter()
            .any(|t| &t.id == track_id && t.is_in_work(&self.id));
        if !is_member {
            return Err(WorkError::HeroNotMember {
                work_id: self.id.clone(),
                track_id: track_id.clone(),
            });
        }
        self.hero_track_id = Some(track_id.clone());
        self.touch();
        Ok(())
    }

    /// 某音轨离开时，若它是主打版本则清除；返回是否发生变化
    pub fn release_hero(&mut self, track_id: &TrackId) -> bool {
        if self.hero_track_id.as_ref() == Some(track_id) {
            self.hero_track_id = None;
            self.touch();
            return true;
        }
        false
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().naive_utc();
    }
}

/// 版本排序：主打版本永远在最前，其余按创建时间倒序
pub fn order_versions(hero: Option<&TrackId>, versions: &mut [Track]) {
    versions.sort_by(|a, b| {
        let a_hero = hero == Some(&a.id);
        let b_hero = hero == Some(&b.id);
        b_hero
            .cmp(&a_hero)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// 按版本类型过滤（忽略大小写）
pub fn filter_by_version_type<'a>(versions: &'a [Track], version_type: &str) -> Vec<&'a Track> {
    versions
        .iter()
        .filter(|t| {
            t.version_type
                .as_deref()
                .is_some_and(|v| v.eq_ignore_ascii_case(version_type))
        })
        .collect()
}

/// 版本中出现过的版本类型，去重并排序
pub fn available_version_types(versions: &[Track]) -> Vec<String> {
    versions
        .iter()
        .filter_map(|t| t.version_type.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkSortKey {
    CreatedAt,
    Name,
    UpdatedAt,
    VersionCount,
}

impl WorkSortKey {
    pub fn name(&self) -> &'static str {
        match self {
            WorkSortKey::CreatedAt => "created_at",
            WorkSortKey::Name => "name",
            WorkSortKey::UpdatedAt => "updated_at",
            WorkSortKey::VersionCount => "version_count",
        }
    }

    /// 切换到新字段时的默认方向：名称升序，日期与数量降序
    pub fn default_direction(&self) -> SortDirection {
        match self {
            WorkSortKey::Name => SortDirection::Ascending,
            _ => SortDirection::Descending,
        }
    }
}

impl FromStr for WorkSortKey {
    type Err = WorkError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(WorkSortKey::CreatedAt),
            "name" => Ok(WorkSortKey::Name),
            "updated_at" => Ok(WorkSortKey::UpdatedAt),
            "version_count" => Ok(WorkSortKey::VersionCount),
            _ => Err(WorkError::UnknownSortKey(s.to_string())),
        }
    }
}

impl fmt::Display for WorkSortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Work 列表的排序状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkSort {
    pub key: WorkSortKey,
    pub direction: SortDirection,
}

impl Default for WorkSort {
    fn default() -> Self {
        Self {
            key: WorkSortKey::CreatedAt,
            direction: WorkSortKey::CreatedAt.default_direction(),
        }
    }
}

impl WorkSort {
    /// 再次选择同一字段翻转方向，选择新字段则重置为该字段的默认方向
    pub fn toggle(&mut self, key: WorkSortKey) {
        if self.key == key {
            self.direction = self.direction.flip();
        } else {
            self.key = key;
            self.direction = key.default_direction();
        }
    }

    pub fn compare(&self, a: &Work, a_count: usize, b: &Work, b_count: usize) -> Ordering {
        let ordering = match self.key {
            WorkSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            WorkSortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            WorkSortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            WorkSortKey::VersionCount => a_count.cmp(&b_count),
        };
        self.direction
            .apply(ordering)
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Work 仓储接口
#[async_trait]
pub trait WorkRepository: Send + Sync {
    async fn find_by_id(&self, id: &WorkId) -> Result<Option<Work>, WorkError>;

    /// 查询范围内未删除的 Work
    async fn find_by_scope(&self, scope: &Scope) -> Result<Vec<Work>, WorkError>;

    async fn insert(&self, work: &Work) -> Result<(), WorkError>;

    /// 更新名称、描述与主打版本
    async fn update(&self, work: &Work) -> Result<(), WorkError>;

    async fn soft_delete(&self, id: &WorkId, deleted_by: &UserId) -> Result<(), WorkError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn version(id: i64, work: i64, minutes_ago: i64) -> Track {
        let mut t = Track::new(TrackId::from(id), &format!("v{}", id), "x", None, UserId::from(1));
        t.version_group_id = Some(WorkId::from(work));
        t.created_at = Utc::now().naive_utc() - Duration::minutes(minutes_ago);
        t
    }

    #[test]
    fn test_hero_first_then_newest() {
        // T1 最早且为主打，T3 比 T2 新
        let mut versions = vec![version(2, 1, 20), version(1, 1, 30), version(3, 1, 10)];
        order_versions(Some(&TrackId::from(1)), &mut versions);
        let ids: Vec<i64> = versions.iter().map(|t| t.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_order_without_hero_is_newest_first() {
        let mut versions = vec![version(1, 1, 30), version(2, 1, 5)];
        order_versions(None, &mut versions);
        assert_eq!(versions[0].id, TrackId::from(2));
    }

    #[test]
    fn test_set_hero_requires_membership() {
        let mut work = Work::new(WorkId::from(1), "Song", None, UserId::from(1)).unwrap();
        let members = vec![version(1, 1, 0), version(2, 2, 0)];
        assert!(work.set_hero(&TrackId::from(1), &members).is_ok());
        assert_eq!(work.hero_track_id, Some(TrackId::from(1)));

        let err = work.set_hero(&TrackId::from(2), &members).unwrap_err();
        assert!(matches!(err, WorkError::HeroNotMember { .. }));
        assert_eq!(work.hero_track_id, Some(TrackId::from(1)));
    }

    #[test]
    fn test_release_hero() {
        let mut work = Work::new(WorkId::from(1), "Song", None, UserId::from(1)).unwrap();
        work.hero_track_id = Some(TrackId::from(4));
        assert!(!work.release_hero(&TrackId::from(5)));
        assert!(work.release_hero(&TrackId::from(4)));
        assert_eq!(work.hero_track_id, None);
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(matches!(
            Work::new(WorkId::from(1), " ", None, UserId::from(1)),
            Err(WorkError::ValidationErr(_))
        ));
    }

    #[test]
    fn test_sort_toggle() {
        let mut sort = WorkSort::default();
        assert_eq!(sort.direction, SortDirection::Descending);

        sort.toggle(WorkSortKey::CreatedAt);
        assert_eq!(sort.direction, SortDirection::Ascending);

        sort.toggle(WorkSortKey::Name);
        assert_eq!(sort.key, WorkSortKey::Name);
        assert_eq!(sort.direction, SortDirection::Ascending);

        sort.toggle(WorkSortKey::Name);
        assert_eq!(sort.direction, SortDirection::Descending);

        sort.toggle(WorkSortKey::VersionCount);
        assert_eq!(sort.direction, SortDirection::Descending);
    }

    #[test]
    fn test_compare_by_version_count() {
        let a = Work::new(WorkId::from(1), "a", None, UserId::from(1)).unwrap();
        let b = Work::new(WorkId::from(2), "b", None, UserId::from(1)).unwrap();
        let sort = WorkSort {
            key: WorkSortKey::VersionCount,
            direction: SortDirection::Descending,
        };
        assert_eq!(sort.compare(&a, 3, &b, 1), Ordering::Less);
    }

    #[test]
    fn test_filter_by_version_type() {
        let mut a = version(1, 1, 0);
        a.version_type = Some("Demo".to_string());
        let mut b = version(2, 1, 0);
        b.version_type = Some("Final".to_string());
        let versions = vec![a, b, version(3, 1, 0)];
        let demos = filter_by_version_type(&versions, "demo");
        assert_eq!(demos.len(), 1);
        assert_eq!(
            available_version_types(&versions),
            vec!["Demo".to_string(), "Final".to_string()]
        );
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("name".parse::<WorkSortKey>().unwrap(), WorkSortKey::Name);
        assert!("size".parse::<WorkSortKey>().is_err());
    }
}
