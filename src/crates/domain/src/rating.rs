use crate::value::{TrackId, UserId};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RatingError {
    #[error("Database error: {0}")]
    DbErr(String),
    #[error("Unknown rating: {0}")]
    UnknownRating(String),
    #[error("{0}")]
    OtherErr(String),
}

/// 评分取值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingValue {
    Listened,
    Liked,
    Loved,
}

impl RatingValue {
    pub fn name(&self) -> &'static str {
        match self {
            RatingValue::Listened => "listened",
            RatingValue::Liked => "liked",
            RatingValue::Loved => "loved",
        }
    }
}

impl FromStr for RatingValue {
    type Err = RatingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // 旧数据里存的是 like / love
        match s {
            "listened" => Ok(RatingValue::Listened),
            "liked" | "like" => Ok(RatingValue::Liked),
            "loved" | "love" => Ok(RatingValue::Loved),
            _ => Err(RatingError::UnknownRating(s.to_string())),
        }
    }
}

impl fmt::Display for RatingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 一条评分记录，(track_id, user_id) 唯一
#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    pub track_id: TrackId,
    pub user_id: UserId,
    pub value: RatingValue,
    pub updated_at: NaiveDateTime,
}

impl Rating {
    pub fn new(track_id: TrackId, user_id: UserId, value: RatingValue) -> Self {
        Self {
            track_id,
            user_id,
            value,
            updated_at: Utc::now().naive_utc(),
        }
    }
}

/// 各评分取值的计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingTally {
    pub listened: usize,
    pub liked: usize,
    pub loved: usize,
}

impl RatingTally {
    fn add(&mut self, value: RatingValue) {
        match value {
            RatingValue::Listened => self.listened += 1,
            RatingValue::Liked => self.liked += 1,
            RatingValue::Loved => self.loved += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.listened + self.liked + self.loved
    }
}

/// 单条音轨的评分汇总
///
/// `total` 统计所有人，`collaborators` 只统计除查看者以外的成员，
/// `personal` 为查看者自己的评分。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingSummary {
    pub personal: Option<RatingValue>,
    pub total: RatingTally,
    pub collaborators: RatingTally,
}

/// 从某条音轨的全部评分行重新统计
pub fn aggregate(rows: &[Rating], viewer: &UserId) -> RatingSummary {
    let mut summary = RatingSummary::default();
    for row in rows {
        summary.total.add(row.value);
        if &row.user_id == viewer {
            summary.personal = Some(row.value);
        } else {
            summary.collaborators.add(row.value);
        }
    }
    summary
}

/// 提交评分后需要执行的写操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingChange {
    /// 与已有评分相同：取消评分
    Remove,
    /// 新评分或替换已有评分
    Upsert(RatingValue),
}

impl RatingChange {
    pub fn decide(current: Option<RatingValue>, submitted: RatingValue) -> Self {
        if current == Some(submitted) {
            RatingChange::Remove
        } else {
            RatingChange::Upsert(submitted)
        }
    }

    /// 把变化应用到某条音轨的评分行上
    pub fn apply(&self, rows: &mut Vec<Rating>, track_id: &TrackId, user_id: &UserId) {
        rows.retain(|r| !(&r.track_id == track_id && &r.user_id == user_id));
        if let RatingChange::Upsert(value) = self {
            rows.push(Rating::new(track_id.clone(), user_id.clone(), *value));
        }
    }
}

/// 评分仓储接口
#[async_trait]
pub trait RatingRepository: Send + Sync {
    async fn find_by_track(&self, track_id: &TrackId) -> Result<Vec<Rating>, RatingError>;

    /// 按 (track_id, user_id) 唯一键插入或更新
    async fn upsert(&self, rating: &Rating) -> Result<(), RatingError>;

    async fn delete(&self, track_id: &TrackId, user_id: &UserId) -> Result<(), RatingError>;
}
