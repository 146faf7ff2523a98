use crate::value::{BandId, UserId};
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// 回收站保留天数
pub const RETENTION_DAYS: i64 = 30;
/// 剩余天数不超过该值时提示即将过期
pub const EXPIRING_SOON_DAYS: i64 = 7;

#[derive(Error, Debug)]
pub enum RecycleBinError {
    #[error("Database error: {0}")]
    DbErr(String),
    #[error("Item not found: {0} {1}")]
    NotFound(RecycledKind, i64),
    #[error("Unknown item kind: {0}")]
    UnknownKind(String),
    #[error("{0}")]
    OtherErr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecycledKind {
    Track,
    Work,
    SetList,
}

impl RecycledKind {
    pub fn name(&self) -> &'static str {
        match self {
            RecycledKind::Track => "track",
            RecycledKind::Work => "work",
            RecycledKind::SetList => "set_list",
        }
    }
}

impl FromStr for RecycledKind {
    type Err = RecycleBinError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "track" => Ok(RecycledKind::Track),
            "work" => Ok(RecycledKind::Work),
            "set_list" => Ok(RecycledKind::SetList),
            _ => Err(RecycleBinError::UnknownKind(s.to_string())),
        }
    }
}

impl fmt::Display for RecycledKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 过期时间 = 删除时间 + 保留天数
pub fn expires_at(deleted_at: NaiveDateTime) -> NaiveDateTime {
    deleted_at + Duration::days(RETENTION_DAYS)
}

/// 回收站条目
#[derive(Debug, Clone, PartialEq)]
pub struct RecycleBinItem {
    pub kind: RecycledKind,
    pub id: i64,
    pub name: String,
    pub band_id: Option<BandId>,
    pub deleted_at: NaiveDateTime,
    pub deleted_by: UserId,
    pub deleted_by_name: Option<String>,
    pub expires_at: NaiveDateTime,
}

impl RecycleBinItem {
    pub fn new(
        kind: RecycledKind,
        id: i64,
        name: &str,
        band_id: Option<BandId>,
        deleted_at: NaiveDateTime,
        deleted_by: UserId,
    ) -> Self {
        Self {
            kind,
            id,
            name: name.to_string(),
            band_id,
            deleted_at,
            deleted_by,
            deleted_by_name: None,
            expires_at: expires_at(deleted_at),
        }
    }

    /// 剩余天数，不足一天按一天计
    pub fn days_remaining(&self, now: NaiveDateTime) -> i64 {
        let left = self.expires_at - now;
        let day = Duration::days(1).num_seconds();
        let secs = left.num_seconds();
        if secs <= 0 {
            return 0;
        }
        (secs + day - 1) / day
    }

    pub fn is_expiring_soon(&self, now: NaiveDateTime) -> bool {
        self.days_remaining(now) <= EXPIRING_SOON_DAYS
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        now >= self.expires_at
    }
}

#[async_trait]
pub trait RecycleBinRepository: Send + Sync {
    /// 列出乐队回收站中未过期的条目，最近删除的在前
    async fn list(&self, band_id: &BandId) -> Result<Vec<RecycleBinItem>, RecycleBinError>;

    async fn restore(&self, kind: RecycledKind, id: i64) -> Result<(), RecycleBinError>;

    /// 永久删除
    async fn purge(&self, kind: RecycledKind, id: i64) -> Result<(), RecycleBinError>;

    /// 清空乐队回收站，返回删除条目数
    async fn empty(&self, band_id: &BandId) -> Result<usize, RecycleBinError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(deleted_days_ago: i64) -> (RecycleBinItem, NaiveDateTime) {
        let now = Utc::now().naive_utc();
        let deleted_at = now - Duration::days(deleted_days_ago);
        (
            RecycleBinItem::new(
                RecycledKind::Track,
                1,
                "Intro",
                Some(BandId::from(1)),
                deleted_at,
                UserId::from(1),
            ),
            now,
        )
    }

    #[test]
    fn test_expires_after_thirty_days() {
        let (item, _) = item(0);
        assert_eq!(item.expires_at - item.deleted_at, Duration::days(30));
    }

    #[test]
    fn test_days_remaining_rounds_up() {
        let (item, now) = item(0);
        assert_eq!(item.days_remaining(now), 30);
        assert_eq!(item.days_remaining(now + Duration::hours(1)), 30);
        assert_eq!(item.days_remaining(now + Duration::days(29) + Duration::hours(23)), 1);
    }

    #[test]
    fn test_expiring_soon_and_expired() {
        let (fresh, now) = item(1);
        assert!(!fresh.is_expiring_soon(now));
        let (old, now) = item(24);
        assert!(old.is_expiring_soon(now));
        assert!(!old.is_expired(now));
        let (gone, now) = item(31);
        assert!(gone.is_expired(now));
        assert_eq!(gone.days_remaining(now), 0);
    }

    #[test]
    fn test_kind_round_trip_names() {
        assert_eq!("set_list".parse::<RecycledKind>().unwrap(), RecycledKind::SetList);
        assert!("album".parse::<RecycledKind>().is_err());
    }
}
