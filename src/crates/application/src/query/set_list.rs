use crate::error::AppError;
use crate::store::entity_store::{not_found, EntityStore};
use domain::value::{Scope, SetListId};
use model::set_list::{SetListRow, SetListSummary, SetListView};
use model::track::TrackView;

pub fn set_list_summaries(store: &EntityStore, scope: &Scope) -> Vec<SetListSummary> {
    store.set_lists(scope).iter().map(SetListSummary::from).collect()
}

/// 歌单详情，条目按位置排序；音轨已删除或未缓存时 `track` 为空
pub fn set_list_view(store: &EntityStore, id: &SetListId) -> Result<SetListView, AppError> {
    let set_list = store.set_list(id).ok_or_else(|| not_found("SetList", id))?;
    let rows = store
        .entries(id)
        .iter()
        .map(|entry| SetListRow {
            entry_id: entry.id.as_i64(),
            position: entry.position,
            track_id: entry.track_id.as_i64(),
            track: store.track(&entry.track_id).map(|t| {
                TrackView::from_track(t, None).with_rating(store.rating_summary(&t.id).as_ref())
            }),
        })
        .collect();
    Ok(SetListView::new(SetListSummary::from(set_list), rows))
}
