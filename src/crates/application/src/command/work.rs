use crate::error::AppError;
use crate::store::entity_store::{push_unique, EntityStore};
use crate::store::slice::{CommandFailure, CommandResult, CommandResultExt, StaleSlice};
use domain::track::Track;
use domain::value::{Scope, TrackId, WorkId};
use domain::work::{Work, WorkSort, WorkSortKey};
use futures::future::join_all;

/// 已属于其他 Work 的音轨
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictingTrack {
    pub track_id: TrackId,
    pub title: String,
    pub current_work_id: WorkId,
    pub current_work_name: Option<String>,
}

/// 等待用户确认的移动
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMove {
    pub target_work_id: WorkId,
    pub track_ids: Vec<TrackId>,
    pub conflicting_tracks: Vec<ConflictingTrack>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AddTracksOutcome {
    /// 已移入的音轨
    Added(Vec<TrackId>),
    /// 有音轨属于其他 Work，尚未做任何修改
    NeedsConfirmation(PendingMove),
}

/// Work（版本组）的编排：建组、移入移出、主打版本和列表排序
#[derive(Debug, Default)]
pub struct VersionGroupCoordinator {
    pending: Option<PendingMove>,
    sort: WorkSort,
}

impl VersionGroupCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    pub fn sort(&self) -> WorkSort {
        self.sort
    }

    pub fn toggle_sort(&mut self, key: WorkSortKey) -> WorkSort {
        self.sort.toggle(key);
        self.sort
    }

    pub async fn create_empty(
        &mut self,
        store: &mut EntityStore,
        scope: &Scope,
        name: &str,
    ) -> CommandResult<Work> {
        let id = store.next_id().await.local()?;
        let work = Work::new(
            WorkId::from(id),
            name,
            scope.band_id().cloned(),
            store.viewer.clone(),
        )
        .local()?;
        store.put_work(work.clone());
        store.work_versions.insert(work.id.clone(), Vec::new());

        store
            .repos
            .works
            .insert(&work)
            .await
            .stale(|| vec![StaleSlice::Works(scope.clone())])?;
        log::info!("[Work] created work {} ({})", work.id, work.name);
        Ok(work)
    }

    /// 把音轨加入 Work；若其中有音轨已属于其他 Work，则只记录待确认的移动
    pub async fn add_tracks(
        &mut self,
        store: &mut EntityStore,
        work_id: &WorkId,
        track_ids: &[TrackId],
    ) -> CommandResult<AddTracksOutcome> {
        let mut conflicting = Vec::new();
        for id in track_ids {
            let track = store.load_track(id).await.local()?;
            if let Some(current) = track.version_group_id.as_ref().filter(|w| *w != work_id) {
                conflicting.push(ConflictingTrack {
                    track_id: track.id.clone(),
                    title: track.title.clone(),
                    current_work_id: current.clone(),
                    current_work_name: store.work(current).map(|w| w.name.clone()),
                });
            }
        }
        if !conflicting.is_empty() {
            log::debug!(
                "[Work] {} tracks already belong to other works, waiting for confirmation",
                conflicting.len()
            );
            let pending = PendingMove {
                target_work_id: work_id.clone(),
                track_ids: track_ids.to_vec(),
                conflicting_tracks: conflicting,
            };
            self.pending = Some(pending.clone());
            return Ok(AddTracksOutcome::NeedsConfirmation(pending));
        }
        let moved = execute_move(store, work_id, track_ids).await?;
        Ok(AddTracksOutcome::Added(moved))
    }

    pub async fn confirm_pending(&mut self, store: &mut EntityStore) -> CommandResult<Vec<TrackId>> {
        let pending = self.pending.take().ok_or_else(|| {
            CommandFailure::local(AppError::InvalidState(
                "No pending move to confirm".to_string(),
            ))
        })?;
        execute_move(store, &pending.target_work_id, &pending.track_ids).await
    }

    pub fn cancel_pending(&mut self) -> Option<PendingMove> {
        self.pending.take()
    }

    /// 设置主打版本，音轨必须是该 Work 的成员
    pub async fn set_hero(
        &mut self,
        store: &mut EntityStore,
        work_id: &WorkId,
        track_id: &TrackId,
    ) -> CommandResult<Work> {
        let mut work = store.load_work(work_id).await.local()?;
        if !store.work_versions.contains_key(work_id) {
            store.fetch_work_versions(work_id).await.local()?;
        }
        work.set_hero(track_id, store.work_versions(work_id)).local()?;
        store.put_work(work.clone());

        let scope = work.scope();
        store.repos.works.update(&work).await.stale(|| {
            vec![
                StaleSlice::Works(scope.clone()),
                StaleSlice::WorkVersions(work_id.clone()),
            ]
        })?;
        log::info!("[Work] hero of work {} set to track {}", work_id, track_id);
        Ok(work)
    }

    pub async fn rename(
        &mut self,
        store: &mut EntityStore,
        work_id: &WorkId,
        name: &str,
    ) -> CommandResult<Work> {
        let mut work = store.load_work(work_id).await.local()?;
        work.rename(name).local()?;
        save_work(store, work).await
    }

    pub async fn update_description(
        &mut self,
        store: &mut EntityStore,
        work_id: &WorkId,
        description: Option<&str>,
    ) -> CommandResult<Work> {
        let mut work = store.load_work(work_id).await.local()?;
        work.update_description(description);
        save_work(store, work).await
    }

    /// 软删除 Work；成员音轨保留，但在本地不再显示分组
    pub async fn delete(&mut self, store: &mut EntityStore, work_id: &WorkId) -> CommandResult<()> {
        let work = store.load_work(work_id).await.local()?;
        let scope = work.scope();
        store.recycle_work(work_id);
        if let Some(band_id) = &work.band_id {
            store.recycle_bin.remove(band_id);
        }

        let viewer = store.viewer.clone();
        store
            .repos
            .works
            .soft_delete(work_id, &viewer)
            .await
            .stale(|| {
                let mut stale = vec![
                    StaleSlice::Works(scope.clone()),
                    StaleSlice::Tracks(scope.clone()),
                ];
                if let Some(band_id) = &work.band_id {
                    stale.push(StaleSlice::RecycleBin(band_id.clone()));
                }
                stale
            })?;
        if self
            .pending
            .as_ref()
            .is_some_and(|p| &p.target_work_id == work_id)
        {
            self.pending = None;
        }
        log::info!("[Work] work {} moved to recycle bin", work_id);
        Ok(())
    }

    /// 把音轨移出 Work；若它是主打版本则同时清除
    pub async fn remove_track(
        &mut self,
        store: &mut EntityStore,
        work_id: &WorkId,
        track_id: &TrackId,
    ) -> CommandResult<()> {
        let track = store.load_track(track_id).await.local()?;
        if !track.is_in_work(work_id) {
            return Err(CommandFailure::local(AppError::InvalidInput(format!(
                "Track {} is not a version of work {}",
                track_id, work_id
            ))));
        }
        let mut work = store.load_work(work_id).await.local()?;
        let hero_released = work.release_hero(track_id);
        store.move_track(&track, None);
        if hero_released {
            store.put_work(work.clone());
        }

        let stale = || {
            vec![
                StaleSlice::Tracks(track.scope()),
                StaleSlice::Works(work.scope()),
                StaleSlice::WorkVersions(work_id.clone()),
            ]
        };
        store
            .repos
            .tracks
            .update_version_group(track_id, None)
            .await
            .stale(stale)?;
        if hero_released {
            store.repos.works.update(&work).await.stale(stale)?;
        }
        log::info!("[Work] track {} removed from work {}", track_id, work_id);
        Ok(())
    }
}

async fn save_work(store: &mut EntityStore, work: Work) -> CommandResult<Work> {
    store.put_work(work.clone());
    store
        .repos
        .works
        .update(&work)
        .await
        .stale(|| vec![StaleSlice::Works(work.scope())])?;
    log::info!("[Work] work {} updated", work.id);
    Ok(work)
}

/// 执行移动：原 Work 若以被移走的音轨为主打版本，一并清除
async fn execute_move(
    store: &mut EntityStore,
    work_id: &WorkId,
    track_ids: &[TrackId],
) -> CommandResult<Vec<TrackId>> {
    let target = store.load_work(work_id).await.local()?;
    let mut moving: Vec<Track> = Vec::new();
    for id in track_ids {
        let track = store.load_track(id).await.local()?;
        if !track.is_in_work(work_id) {
            moving.push(track);
        }
    }
    if moving.is_empty() {
        return Ok(Vec::new());
    }

    let mut stale = vec![
        StaleSlice::Tracks(target.scope()),
        StaleSlice::Works(target.scope()),
        StaleSlice::WorkVersions(work_id.clone()),
    ];
    // 先读出所有原 Work（缓存未命中时查远端），再改本地状态
    let mut released: Vec<Work> = Vec::new();
    for track in &moving {
        push_unique(&mut stale, StaleSlice::Tracks(track.scope()));
        let Some(previous) = &track.version_group_id else {
            continue;
        };
        push_unique(&mut stale, StaleSlice::WorkVersions(previous.clone()));
        if released.iter().any(|w| &w.id == previous) {
            continue;
        }
        let mut work = store.load_work(previous).await.local()?;
        push_unique(&mut stale, StaleSlice::Works(work.scope()));
        if work.release_hero(&track.id) {
            released.push(work);
        }
    }
    for track in &moving {
        store.move_track(track, Some(work_id));
    }
    for work in &released {
        if store.work(&work.id).is_some() {
            store.put_work(work.clone());
        }
    }

    let track_repo = store.repos.tracks.clone();
    let work_repo = store.repos.works.clone();
    let track_results = join_all(
        moving
            .iter()
            .map(|t| track_repo.update_version_group(&t.id, Some(work_id.clone()))),
    )
    .await;
    let work_results = join_all(released.iter().map(|w| work_repo.update(w))).await;

    let mut failed = 0;
    for (track, result) in moving.iter().zip(&track_results) {
        if let Err(e) = result {
            log::error!("[Work] failed to move track {} to {}: {}", track.id, work_id, e);
            failed += 1;
        }
    }
    for (work, result) in released.iter().zip(&work_results) {
        if let Err(e) = result {
            log::error!("[Work] failed to clear hero of work {}: {}", work.id, e);
            failed += 1;
        }
    }
    if failed > 0 {
        return Err(CommandFailure::new(
            AppError::PartialFailure {
                failed,
                total: moving.len() + released.len(),
            },
            stale,
        ));
    }

    let moved: Vec<TrackId> = moving.into_iter().map(|t| t.id).collect();
    log::info!("[Work] moved {} tracks into work {}", moved.len(), work_id);
    Ok(moved)
}
