use chrono::{Duration, NaiveDateTime, Utc};

/// 成功提示默认显示时长
pub const DEFAULT_SUCCESS_TTL_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub posted_at: NaiveDateTime,
    /// 错误提示不会自动消失
    pub expires_at: Option<NaiveDateTime>,
}

/// 顶部提示条：成功提示到期自动消失，错误提示需手动关闭
#[derive(Debug)]
pub struct NoticeBoard {
    notices: Vec<Notice>,
    next_id: u64,
    success_ttl: Duration,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_SUCCESS_TTL_MS)
    }
}

impl NoticeBoard {
    pub fn new(success_ttl_ms: u64) -> Self {
        Self {
            notices: Vec::new(),
            next_id: 1,
            success_ttl: Duration::milliseconds(i64::try_from(success_ttl_ms).unwrap_or(i64::MAX)),
        }
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.success_at(message, Utc::now().naive_utc())
    }

    pub fn success_at(&mut self, message: impl Into<String>, now: NaiveDateTime) -> u64 {
        let expires_at = now.checked_add_signed(self.success_ttl);
        self.post(NoticeLevel::Success, message.into(), now, expires_at)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.error_at(message, Utc::now().naive_utc())
    }

    pub fn error_at(&mut self, message: impl Into<String>, now: NaiveDateTime) -> u64 {
        self.post(NoticeLevel::Error, message.into(), now, None)
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    /// 当前仍在显示的提示，最新的在后
    pub fn visible(&mut self, now: NaiveDateTime) -> &[Notice] {
        self.notices
            .retain(|n| n.expires_at.map_or(true, |expires_at| now < expires_at));
        &self.notices
    }

    pub fn latest(&mut self, now: NaiveDateTime) -> Option<&Notice> {
        self.visible(now).last()
    }

    fn post(
        &mut self,
        level: NoticeLevel,
        message: String,
        now: NaiveDateTime,
        expires_at: Option<NaiveDateTime>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.notices.push(Notice {
            id,
            level,
            message,
            posted_at: now,
            expires_at,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_expires_after_ttl() {
        let mut board = NoticeBoard::default();
        let now = Utc::now().naive_utc();
        board.success_at("Saved", now);
        assert_eq!(board.visible(now + Duration::milliseconds(2999)).len(), 1);
        assert!(board.visible(now + Duration::milliseconds(3000)).is_empty());
    }

    #[test]
    fn test_error_persists_until_dismissed() {
        let mut board = NoticeBoard::new(100);
        let now = Utc::now().naive_utc();
        let id = board.error_at("Network down", now);
        assert_eq!(board.visible(now + Duration::days(1)).len(), 1);
        assert!(board.dismiss(id));
        assert!(board.visible(now).is_empty());
        assert!(!board.dismiss(id));
    }

    #[test]
    fn test_latest_is_most_recent() {
        let mut board = NoticeBoard::default();
        let now = Utc::now().naive_utc();
        board.error_at("first", now);
        board.success_at("second", now);
        let latest = board.latest(now).unwrap();
        assert_eq!(latest.message, "second");
        assert_eq!(latest.level, NoticeLevel::Success);
    }
}
