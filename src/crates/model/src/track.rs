use crate::rating::RatingSummaryView;
use crate::shared::unix_seconds;
use domain::rating::RatingSummary;
use domain::track::Track;
use domain::value::TrackId;
use serde::{Deserialize, Serialize};

/// 音轨列表行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackView {
    pub id: i64,
    pub title: String,
    pub duration_seconds: Option<f64>,
    pub file_url: String,
    pub folder_path: Option<String>,
    pub version_type: Option<String>,
    pub work_id: Option<i64>,
    pub band_id: Option<i64>,
    pub created_by: i64,
    pub created_at: i64,
    pub is_hero: bool,
    pub rating: Option<RatingSummaryView>,
}

impl TrackView {
    pub fn from_track(track: &Track, hero: Option<&TrackId>) -> Self {
        Self {
            id: track.id.as_i64(),
            title: track.title.clone(),
            duration_seconds: track.duration_seconds,
            file_url: track.file_url.clone(),
            folder_path: track.folder_path.clone(),
            version_type: track.version_type.clone(),
            work_id: track.version_group_id.as_ref().map(|w| w.as_i64()),
            band_id: track.band_id.as_ref().map(|b| b.as_i64()),
            created_by: track.created_by.as_i64(),
            created_at: unix_seconds(track.created_at),
            is_hero: hero == Some(&track.id),
            rating: None,
        }
    }

    pub fn with_rating(mut self, summary: Option<&RatingSummary>) -> Self {
        self.rating = summary.map(RatingSummaryView::from);
        self
    }
}
