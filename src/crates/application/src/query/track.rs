use crate::store::entity_store::EntityStore;
use domain::value::Scope;
use model::track::TrackView;

/// 范围内的音轨列表，已拉取评分的附带评分汇总
pub fn track_rows(store: &EntityStore, scope: &Scope) -> Vec<TrackView> {
    store
        .tracks(scope)
        .iter()
        .map(|track| {
            let hero = track
                .version_group_id
                .as_ref()
                .and_then(|w| store.work(w))
                .and_then(|w| w.hero_track_id.as_ref());
            TrackView::from_track(track, hero)
                .with_rating(store.rating_summary(&track.id).as_ref())
        })
        .collect()
}
