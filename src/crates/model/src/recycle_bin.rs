use crate::shared::unix_seconds;
use chrono::NaiveDateTime;
use domain::recycle_bin::RecycleBinItem;
use serde::{Deserialize, Serialize};

/// 回收站列表行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecycleBinRow {
    pub kind: String,
    pub id: i64,
    pub name: String,
    pub deleted_at: i64,
    pub deleted_by: i64,
    pub deleted_by_name: Option<String>,
    pub expires_at: i64,
    pub days_remaining: i64,
    pub expiring_soon: bool,
}

impl RecycleBinRow {
    pub fn new(item: &RecycleBinItem, now: NaiveDateTime) -> Self {
        Self {
            kind: item.kind.name().to_string(),
            id: item.id,
            name: item.name.clone(),
            deleted_at: unix_seconds(item.deleted_at),
            deleted_by: item.deleted_by.as_i64(),
            deleted_by_name: item.deleted_by_name.clone(),
            expires_at: unix_seconds(item.expires_at),
            days_remaining: item.days_remaining(now),
            expiring_soon: item.is_expiring_soon(now),
        }
    }
}
