use chrono::NaiveDateTime;

/// 转为 Unix 时间戳（秒），前端统一使用
pub fn unix_seconds(at: NaiveDateTime) -> i64 {
    at.and_utc().timestamp()
}
