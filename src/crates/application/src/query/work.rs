use crate::error::AppError;
use crate::store::entity_store::{not_found, EntityStore};
use domain::track::Track;
use domain::value::{Scope, WorkId};
use domain::work::{available_version_types, filter_by_version_type, WorkSort};
use model::track::TrackView;
use model::work::{WorkDetail, WorkSummary};

/// Work 列表，按当前排序状态排序
pub fn work_summaries(store: &EntityStore, scope: &Scope, sort: WorkSort) -> Vec<WorkSummary> {
    let counts = store.version_counts(scope);
    let mut works: Vec<_> = store.works(scope).iter().collect();
    works.sort_by(|a, b| {
        let a_count = counts.get(&a.id).copied().unwrap_or(0);
        let b_count = counts.get(&b.id).copied().unwrap_or(0);
        sort.compare(a, a_count, b, b_count)
    });
    works
        .into_iter()
        .map(|work| {
            let hero_title = work
                .hero_track_id
                .as_ref()
                .and_then(|id| store.track(id))
                .map(|t| t.title.clone());
            WorkSummary::new(work, counts.get(&work.id).copied().unwrap_or(0), hero_title)
        })
        .collect()
}

/// Work 详情：主打版本在前，可按版本类型过滤
pub fn work_detail(
    store: &EntityStore,
    work_id: &WorkId,
    version_type: Option<&str>,
) -> Result<WorkDetail, AppError> {
    let work = store.work(work_id).ok_or_else(|| not_found("Work", work_id))?;
    let all = store.work_versions(work_id);
    let hero = work.hero_track_id.as_ref();
    let shown: Vec<&Track> = match version_type {
        Some(filter) => filter_by_version_type(all, filter),
        None => all.iter().collect(),
    };
    let hero_title = hero
        .and_then(|id| all.iter().find(|t| &t.id == id))
        .map(|t| t.title.clone());
    Ok(WorkDetail {
        summary: WorkSummary::new(work, all.len(), hero_title),
        versions: shown
            .into_iter()
            .map(|t| {
                TrackView::from_track(t, hero).with_rating(store.rating_summary(&t.id).as_ref())
            })
            .collect(),
        version_types: available_version_types(all),
    })
}
