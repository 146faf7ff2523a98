use crate::shared::unix_seconds;
use crate::track::TrackView;
use domain::work::Work;
use serde::{Deserialize, Serialize};

/// Work 列表项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub hero_track_id: Option<i64>,
    pub hero_title: Option<String>,
    pub version_count: usize,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WorkSummary {
    pub fn new(work: &Work, version_count: usize, hero_title: Option<String>) -> Self {
        Self {
            id: work.id.as_i64(),
            name: work.name.clone(),
            description: work.description.clone(),
            hero_track_id: work.hero_track_id.as_ref().map(|t| t.as_i64()),
            hero_title,
            version_count,
            created_at: unix_seconds(work.created_at),
            updated_at: unix_seconds(work.updated_at),
        }
    }
}

/// Work 详情：主打版本在前，其余按时间倒序
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkDetail {
    pub summary: WorkSummary,
    pub versions: Vec<TrackView>,
    pub version_types: Vec<String>,
}
