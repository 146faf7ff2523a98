use crate::error::AppError;
use crate::store::entity_store::EntityStore;
use crate::store::slice::{CommandFailure, CommandResult, StaleSlice};
use domain::rating::{aggregate, Rating, RatingSummary};
use domain::value::{TrackId, UserId};
use futures::future::join_all;
use std::collections::HashMap;

/// 评分汇总
///
/// 汇总永远从某条音轨的全部评分行重新计算，不做增量加减。
pub struct RatingAggregator;

impl RatingAggregator {
    pub fn summarize(rows: &[Rating], viewer: &UserId) -> RatingSummary {
        aggregate(rows, viewer)
    }

    /// 批量刷新多条音轨的评分，并发拉取
    pub async fn refresh(
        store: &mut EntityStore,
        track_ids: &[TrackId],
    ) -> CommandResult<HashMap<TrackId, RatingSummary>> {
        let repo = store.repos.ratings.clone();
        let results = join_all(track_ids.iter().map(|id| repo.find_by_track(id))).await;

        let mut summaries = HashMap::new();
        let mut stale = Vec::new();
        for (id, result) in track_ids.iter().zip(results) {
            match result {
                Ok(rows) => {
                    summaries.insert(id.clone(), Self::summarize(&rows, &store.viewer));
                    store.ratings.insert(id.clone(), rows);
                }
                Err(e) => {
                    log::warn!("[Rating] failed to load ratings for track {}: {}", id, e);
                    stale.push(StaleSlice::Ratings(id.clone()));
                }
            }
        }
        if !stale.is_empty() {
            return Err(CommandFailure::new(
                AppError::PartialFailure {
                    failed: stale.len(),
                    total: track_ids.len(),
                },
                stale,
            ));
        }
        log::debug!("[Rating] refreshed ratings for {} tracks", summaries.len());
        Ok(summaries)
    }
}
