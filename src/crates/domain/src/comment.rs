use crate::value::{CommentId, TrackId, UserId};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommentError {
    #[error("Database error: {0}")]
    DbErr(String),
    #[error("Validation error: {0}")]
    ValidationErr(String),
    #[error("Comment not found: {0}")]
    NotFound(CommentId),
    #[error("{0}")]
    OtherErr(String),
}

/// 音轨评论，`timestamp_seconds` 把评论挂到音频的某个时间点
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub track_id: TrackId,
    pub user_id: UserId,
    pub content: String,
    pub timestamp_seconds: Option<f64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

fn validate_content(content: &str) -> Result<String, CommentError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(CommentError::ValidationErr(
            "Comment cannot be empty".to_string(),
        ));
    }
    Ok(content.to_string())
}

impl Comment {
    pub fn new(
        id: CommentId,
        track_id: TrackId,
        user_id: UserId,
        content: &str,
        timestamp_seconds: Option<f64>,
    ) -> Result<Self, CommentError> {
        let content = validate_content(content)?;
        if timestamp_seconds.is_some_and(|t| !t.is_finite() || t < 0.0) {
            return Err(CommentError::ValidationErr(
                "Comment timestamp must be a non-negative number of seconds".to_string(),
            ));
        }
        let now = Utc::now().naive_utc();
        Ok(Self {
            id,
            track_id,
            user_id,
            content,
            timestamp_seconds,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn edit(&mut self, content: &str) -> Result<(), CommentError> {
        self.content = validate_content(content)?;
        self.updated_at = Utc::now().naive_utc();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentSort {
    /// 按音频时间点升序，没有时间点的排在最后
    #[default]
    Timestamp,
    Newest,
    Oldest,
}

pub fn sort_comments(comments: &mut [Comment], sort: CommentSort) {
    match sort {
        CommentSort::Timestamp => comments.sort_by(|a, b| {
            match (a.timestamp_seconds, b.timestamp_seconds) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
            .then_with(|| a.created_at.cmp(&b.created_at))
        }),
        CommentSort::Newest => comments.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        CommentSort::Oldest => comments.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn find_by_track(&self, track_id: &TrackId) -> Result<Vec<Comment>, CommentError>;

    async fn insert(&self, comment: &Comment) -> Result<(), CommentError>;

    async fn update(&self, comment: &Comment) -> Result<(), CommentError>;

    async fn delete(&self, id: &CommentId) -> Result<(), CommentError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn comment(id: i64, ts: Option<f64>, minutes_ago: i64) -> Comment {
        let mut c = Comment::new(
            CommentId::from(id),
            TrackId::from(1),
            UserId::from(1),
            "nice fill",
            ts,
        )
        .unwrap();
        c.created_at = Utc::now().naive_utc() - Duration::minutes(minutes_ago);
        c
    }

    #[test]
    fn test_blank_comment_rejected() {
        let result = Comment::new(CommentId::from(1), TrackId::from(1), UserId::from(1), " ", None);
        assert!(matches!(result, Err(CommentError::ValidationErr(_))));
    }

    #[test]
    fn test_negative_timestamp_rejected() {
        let result = Comment::new(
            CommentId::from(1),
            TrackId::from(1),
            UserId::from(1),
            "hi",
            Some(-1.0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_sort_by_timestamp_puts_untimed_last() {
        let mut comments = vec![
            comment(1, None, 1),
            comment(2, Some(42.0), 5),
            comment(3, Some(3.5), 2),
        ];
        sort_comments(&mut comments, CommentSort::Timestamp);
        let ids: Vec<i64> = comments.iter().map(|c| c.id.as_i64()).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_sort_newest_and_oldest() {
        let mut comments = vec![comment(1, None, 10), comment(2, None, 1)];
        sort_comments(&mut comments, CommentSort::Newest);
        assert_eq!(comments[0].id, CommentId::from(2));
        sort_comments(&mut comments, CommentSort::Oldest);
        assert_eq!(comments[0].id, CommentId::from(1));
    }
}
