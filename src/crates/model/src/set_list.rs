use crate::shared::unix_seconds;
use crate::track::TrackView;
use domain::set_list::SetList;
use serde::{Deserialize, Serialize};

/// 歌单基本信息（不含条目）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetListSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub band_id: Option<i64>,
    pub share_code: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&SetList> for SetListSummary {
    fn from(set_list: &SetList) -> Self {
        Self {
            id: set_list.id.as_i64(),
            title: set_list.title.clone(),
            description: set_list.description.clone(),
            band_id: set_list.band_id.as_ref().map(|b| b.as_i64()),
            share_code: set_list.share_code.clone(),
            created_at: unix_seconds(set_list.created_at),
            updated_at: unix_seconds(set_list.updated_at),
        }
    }
}

/// 歌单中的一行；音轨已被删除或不在缓存中时 `track` 为空
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetListRow {
    pub entry_id: i64,
    pub position: i32,
    pub track_id: i64,
    pub track: Option<TrackView>,
}

/// 歌单完整信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetListView {
    pub summary: SetListSummary,
    pub rows: Vec<SetListRow>,
    pub track_count: usize,
    pub total_duration_seconds: f64,
}

impl SetListView {
    pub fn new(summary: SetListSummary, rows: Vec<SetListRow>) -> Self {
        let total_duration_seconds = rows
            .iter()
            .filter_map(|r| r.track.as_ref().and_then(|t| t.duration_seconds))
            .sum();
        Self {
            summary,
            track_count: rows.len(),
            rows,
            total_duration_seconds,
        }
    }
}
