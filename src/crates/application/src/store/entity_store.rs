use super::slice::{CommandFailure, CommandResult, CommandResultExt, StaleSlice};
use crate::command::shared::IdGenerator;
use crate::error::AppError;
use crate::shared::Repositories;
use domain::comment::Comment;
use domain::rating::{aggregate, Rating, RatingChange, RatingSummary, RatingValue};
use domain::recycle_bin::{RecycleBinItem, RecycledKind};
use domain::set_list::{next_position, sort_by_position, SetList, SetListEntry};
use domain::track::Track;
use domain::value::{
    BandId, Scope, SetListEntryId, SetListId, TrackId, UserId, WorkId,
};
use domain::version_type::{merge_for_band, VersionType};
use domain::work::{order_versions, Work};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;

pub(crate) fn not_found(kind: &str, id: impl Display) -> AppError {
    AppError::AggregateNotFound(kind.to_string(), id.to_string())
}

pub(crate) fn push_unique(slices: &mut Vec<StaleSlice>, slice: StaleSlice) {
    if !slices.contains(&slice) {
        slices.push(slice);
    }
}

/// 已进回收站的 Work，其成员在本地视为未分组
fn mask_recycled(recycled: &HashSet<WorkId>, track: &mut Track) {
    if track
        .version_group_id
        .as_ref()
        .is_some_and(|w| recycled.contains(w))
    {
        track.version_group_id = None;
    }
}

/// 仪表盘的实体缓存
///
/// 每类数据按查询键分块缓存，`fetch_*` 整块替换。所有写操作先改本地
/// 缓存再调用远端；远端失败时返回 [`CommandFailure`]，其中列出需要
/// 通过 [`EntityStore::resync`] 重新拉取的数据块。
pub struct EntityStore {
    pub(crate) repos: Repositories,
    pub(crate) id_generator: Arc<dyn IdGenerator>,
    pub(crate) viewer: UserId,
    pub(crate) tracks: HashMap<Scope, Vec<Track>>,
    pub(crate) set_lists: HashMap<Scope, Vec<SetList>>,
    pub(crate) entries: HashMap<SetListId, Vec<SetListEntry>>,
    pub(crate) works: HashMap<Scope, Vec<Work>>,
    pub(crate) work_versions: HashMap<WorkId, Vec<Track>>,
    pub(crate) ratings: HashMap<TrackId, Vec<Rating>>,
    pub(crate) comments: HashMap<TrackId, Vec<Comment>>,
    pub(crate) version_types: HashMap<Option<BandId>, Vec<VersionType>>,
    pub(crate) recycle_bin: HashMap<BandId, Vec<RecycleBinItem>>,
    pub(crate) recycled_works: HashSet<WorkId>,
}

impl EntityStore {
    pub fn new(repos: Repositories, id_generator: Arc<dyn IdGenerator>, viewer: UserId) -> Self {
        Self {
            repos,
            id_generator,
            viewer,
            tracks: HashMap::new(),
            set_lists: HashMap::new(),
            entries: HashMap::new(),
            works: HashMap::new(),
            work_versions: HashMap::new(),
            ratings: HashMap::new(),
            comments: HashMap::new(),
            version_types: HashMap::new(),
            recycle_bin: HashMap::new(),
            recycled_works: HashSet::new(),
        }
    }

    pub fn viewer(&self) -> &UserId {
        &self.viewer
    }

    pub(crate) async fn next_id(&self) -> Result<i64, AppError> {
        self.id_generator.next_id().await
    }

    // ---------------------------------------------------------------
    // 拉取
    // ---------------------------------------------------------------

    pub async fn fetch_tracks(&mut self, scope: &Scope) -> Result<&[Track], AppError> {
        let mut tracks = self.repos.tracks.find_by_scope(scope).await?;
        tracks.retain(|t| !t.is_deleted());
        for track in tracks.iter_mut() {
            mask_recycled(&self.recycled_works, track);
        }
        log::debug!("[Store] fetched {} tracks for {}", tracks.len(), scope);
        let slot = self.tracks.entry(scope.clone()).or_default();
        *slot = tracks;
        Ok(slot.as_slice())
    }

    pub async fn fetch_set_lists(&mut self, scope: &Scope) -> Result<&[SetList], AppError> {
        let mut lists = self.repos.set_lists.find_by_scope(scope).await?;
        lists.retain(|l| l.deleted_at.is_none());
        lists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        log::debug!("[Store] fetched {} set lists for {}", lists.len(), scope);
        let slot = self.set_lists.entry(scope.clone()).or_default();
        *slot = lists;
        Ok(slot.as_slice())
    }

    pub async fn fetch_playlist_entries(
        &mut self,
        set_list_id: &SetListId,
    ) -> Result<&[SetListEntry], AppError> {
        let mut entries = self.repos.set_lists.find_entries(set_list_id).await?;
        sort_by_position(&mut entries);
        log::debug!(
            "[Store] fetched {} entries for set list {}",
            entries.len(),
            set_list_id
        );
        let slot = self.entries.entry(set_list_id.clone()).or_default();
        *slot = entries;
        Ok(slot.as_slice())
    }

    pub async fn fetch_works(&mut self, scope: &Scope) -> Result<&[Work], AppError> {
        let mut works = self.repos.works.find_by_scope(scope).await?;
        works.retain(|w| !w.is_deleted());
        for work in &works {
            self.recycled_works.remove(&work.id);
        }
        log::debug!("[Store] fetched {} works for {}", works.len(), scope);
        let slot = self.works.entry(scope.clone()).or_default();
        *slot = works;
        Ok(slot.as_slice())
    }

    /// 拉取 Work 本身及其成员，成员按主打优先排序
    pub async fn fetch_work_versions(&mut self, work_id: &WorkId) -> Result<&[Track], AppError> {
        let work = self
            .repos
            .works
            .find_by_id(work_id)
            .await?
            .filter(|w| !w.is_deleted())
            .ok_or_else(|| not_found("Work", work_id))?;
        let mut versions = self.repos.tracks.find_by_work(work_id).await?;
        versions.retain(|t| !t.is_deleted());
        order_versions(work.hero_track_id.as_ref(), &mut versions);
        log::debug!(
            "[Store] fetched {} versions for work {}",
            versions.len(),
            work_id
        );
        self.recycled_works.remove(work_id);
        self.put_work(work);
        let slot = self.work_versions.entry(work_id.clone()).or_default();
        *slot = versions;
        Ok(slot.as_slice())
    }

    pub async fn fetch_ratings(&mut self, track_id: &TrackId) -> Result<RatingSummary, AppError> {
        let rows = self.repos.ratings.find_by_track(track_id).await?;
        let summary = aggregate(&rows, &self.viewer);
        self.ratings.insert(track_id.clone(), rows);
        Ok(summary)
    }

    pub async fn fetch_comments(&mut self, track_id: &TrackId) -> Result<&[Comment], AppError> {
        let comments = self.repos.comments.find_by_track(track_id).await?;
        let slot = self.comments.entry(track_id.clone()).or_default();
        *slot = comments;
        Ok(slot.as_slice())
    }

    pub async fn fetch_version_types(
        &mut self,
        band_id: Option<&BandId>,
    ) -> Result<&[VersionType], AppError> {
        let types = merge_for_band(self.repos.version_types.find_for_band(band_id).await?);
        let slot = self.version_types.entry(band_id.cloned()).or_default();
        *slot = types;
        Ok(slot.as_slice())
    }

    pub async fn fetch_recycle_bin(
        &mut self,
        band_id: &BandId,
    ) -> Result<&[RecycleBinItem], AppError> {
        let items = self.repos.recycle_bin.list(band_id).await?;
        for item in items.iter().filter(|i| i.kind == RecycledKind::Work) {
            self.recycled_works.insert(WorkId::from(item.id));
        }
        log::debug!(
            "[Store] fetched {} recycle bin items for band {}",
            items.len(),
            band_id
        );
        let slot = self.recycle_bin.entry(band_id.clone()).or_default();
        *slot = items;
        Ok(slot.as_slice())
    }

    /// 按顺序重新拉取失效的数据块，单块失败不影响其余块
    pub async fn resync(&mut self, slices: &[StaleSlice]) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        let mut first_error = None;
        for slice in slices {
            if !seen.insert(slice) {
                continue;
            }
            let result = match slice {
                StaleSlice::Tracks(scope) => self.fetch_tracks(scope).await.map(|_| ()),
                StaleSlice::SetLists(scope) => self.fetch_set_lists(scope).await.map(|_| ()),
                StaleSlice::PlaylistEntries(id) => {
                    self.fetch_playlist_entries(id).await.map(|_| ())
                }
                StaleSlice::Works(scope) => self.fetch_works(scope).await.map(|_| ()),
                StaleSlice::WorkVersions(id) => self.fetch_work_versions(id).await.map(|_| ()),
                StaleSlice::Ratings(id) => self.fetch_ratings(id).await.map(|_| ()),
                StaleSlice::Comments(id) => self.fetch_comments(id).await.map(|_| ()),
                StaleSlice::VersionTypes(band) => {
                    self.fetch_version_types(band.as_ref()).await.map(|_| ())
                }
                StaleSlice::RecycleBin(band) => self.fetch_recycle_bin(band).await.map(|_| ()),
            };
            match result {
                Ok(()) => log::debug!("[Store] resynced {}", slice),
                Err(e) => {
                    log::warn!("[Store] failed to resync {}: {}", slice, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ---------------------------------------------------------------
    // 读取缓存
    // ---------------------------------------------------------------

    pub fn tracks(&self, scope: &Scope) -> &[Track] {
        self.tracks.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_lists(&self, scope: &Scope) -> &[SetList] {
        self.set_lists.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entries(&self, set_list_id: &SetListId) -> &[SetListEntry] {
        self.entries
            .get(set_list_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn works(&self, scope: &Scope) -> &[Work] {
        self.works.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn work_versions(&self, work_id: &WorkId) -> &[Track] {
        self.work_versions
            .get(work_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn ratings(&self, track_id: &TrackId) -> &[Rating] {
        self.ratings.get(track_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 缓存中该音轨的评分汇总；尚未拉取时返回 None
    pub fn rating_summary(&self, track_id: &TrackId) -> Option<RatingSummary> {
        self.ratings
            .get(track_id)
            .map(|rows| aggregate(rows, &self.viewer))
    }

    pub fn comments(&self, track_id: &TrackId) -> &[Comment] {
        self.comments
            .get(track_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn version_types(&self, band_id: Option<&BandId>) -> &[VersionType] {
        self.version_types
            .get(&band_id.cloned())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn recycle_bin(&self, band_id: &BandId) -> &[RecycleBinItem] {
        self.recycle_bin
            .get(band_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn track(&self, id: &TrackId) -> Option<&Track> {
        self.tracks
            .values()
            .chain(self.work_versions.values())
            .flat_map(|list| list.iter())
            .find(|t| &t.id == id)
    }

    pub fn work(&self, id: &WorkId) -> Option<&Work> {
        self.works
            .values()
            .flat_map(|list| list.iter())
            .find(|w| &w.id == id)
    }

    pub fn set_list(&self, id: &SetListId) -> Option<&SetList> {
        self.set_lists
            .values()
            .flat_map(|list| list.iter())
            .find(|l| &l.id == id)
    }

    pub fn is_work_recycled(&self, id: &WorkId) -> bool {
        self.recycled_works.contains(id)
    }

    /// 范围内每个 Work 的成员数
    pub fn version_counts(&self, scope: &Scope) -> HashMap<WorkId, usize> {
        let mut counts = HashMap::new();
        for track in self.tracks(scope) {
            if let Some(work_id) = &track.version_group_id {
                *counts.entry(work_id.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// 优先读缓存，未命中时向远端查询
    pub(crate) async fn load_track(&self, id: &TrackId) -> Result<Track, AppError> {
        if let Some(track) = self.track(id) {
            return Ok(track.clone());
        }
        let mut track = self
            .repos
            .tracks
            .find_by_id(id)
            .await?
            .filter(|t| !t.is_deleted())
            .ok_or_else(|| not_found("Track", id))?;
        mask_recycled(&self.recycled_works, &mut track);
        Ok(track)
    }

    pub(crate) async fn load_work(&self, id: &WorkId) -> Result<Work, AppError> {
        if let Some(work) = self.work(id) {
            return Ok(work.clone());
        }
        self.repos
            .works
            .find_by_id(id)
            .await?
            .filter(|w| !w.is_deleted())
            .ok_or_else(|| not_found("Work", id))
    }

    pub(crate) async fn load_set_list(&self, id: &SetListId) -> Result<SetList, AppError> {
        if let Some(list) = self.set_list(id) {
            return Ok(list.clone());
        }
        self.repos
            .set_lists
            .find_by_id(id)
            .await?
            .filter(|l| l.deleted_at.is_none())
            .ok_or_else(|| not_found("SetList", id))
    }

    // ---------------------------------------------------------------
    // 本地缓存修改（乐观更新）
    // ---------------------------------------------------------------

    /// 修改缓存中该音轨的所有副本
    pub(crate) fn update_track<F>(&mut self, id: &TrackId, f: F)
    where
        F: Fn(&mut Track),
    {
        for list in self.tracks.values_mut().chain(self.work_versions.values_mut()) {
            for track in list.iter_mut().filter(|t| &t.id == id) {
                f(track);
            }
        }
    }

    pub(crate) fn remove_track(&mut self, id: &TrackId) {
        for list in self.tracks.values_mut().chain(self.work_versions.values_mut()) {
            list.retain(|t| &t.id != id);
        }
    }

    /// 把音轨移入 `target`（None 表示移出分组），同步两边的成员列表
    pub(crate) fn move_track(&mut self, track: &Track, target: Option<&WorkId>) {
        let id = &track.id;
        self.update_track(id, |t| t.version_group_id = target.cloned());
        for (work_id, versions) in self.work_versions.iter_mut() {
            if Some(work_id) != target {
                versions.retain(|t| &t.id != id);
            }
        }
        if let Some(target) = target {
            let hero = self.work(target).and_then(|w| w.hero_track_id.clone());
            if let Some(versions) = self.work_versions.get_mut(target) {
                if !versions.iter().any(|t| &t.id == id) {
                    let mut moved = track.clone();
                    moved.version_group_id = Some(target.clone());
                    versions.push(moved);
                }
                order_versions(hero.as_ref(), versions);
            }
        }
    }

    /// 替换或加入 Work，并按其主打版本重排成员
    pub(crate) fn put_work(&mut self, work: Work) {
        if let Some(versions) = self.work_versions.get_mut(&work.id) {
            order_versions(work.hero_track_id.as_ref(), versions);
        }
        let list = self.works.entry(work.scope()).or_default();
        match list.iter_mut().find(|w| w.id == work.id) {
            Some(existing) => *existing = work,
            None => list.push(work),
        }
    }

    /// Work 进入回收站：移出列表，成员在本地解除分组
    pub(crate) fn recycle_work(&mut self, id: &WorkId) {
        for list in self.works.values_mut() {
            list.retain(|w| &w.id != id);
        }
        self.work_versions.remove(id);
        self.recycled_works.insert(id.clone());
        let recycled = &self.recycled_works;
        for list in self.tracks.values_mut() {
            for track in list.iter_mut() {
                mask_recycled(recycled, track);
            }
        }
    }

    pub(crate) fn restore_work(&mut self, id: &WorkId) {
        self.recycled_works.remove(id);
    }

    pub(crate) fn put_set_list(&mut self, set_list: SetList) {
        let list = self.set_lists.entry(set_list.scope()).or_default();
        match list.iter_mut().find(|l| l.id == set_list.id) {
            Some(existing) => *existing = set_list,
            None => list.insert(0, set_list),
        }
    }

    pub(crate) fn remove_set_list(&mut self, id: &SetListId) {
        for list in self.set_lists.values_mut() {
            list.retain(|l| &l.id != id);
        }
        self.entries.remove(id);
    }

    // ---------------------------------------------------------------
    // 写操作
    // ---------------------------------------------------------------

    /// 修改音轨版本类型，空白视为清除
    pub async fn set_version_type(
        &mut self,
        track_id: &TrackId,
        version_type: Option<&str>,
    ) -> CommandResult<Option<String>> {
        let track = self
            .track(track_id)
            .cloned()
            .ok_or_else(|| not_found("Track", track_id))
            .local()?;
        let mut updated = track.clone();
        updated.set_version_type(version_type);
        let value = updated.version_type;
        self.update_track(track_id, |t| t.version_type = value.clone());

        let mut stale = vec![StaleSlice::Tracks(track.scope())];
        if let Some(work_id) = &track.version_group_id {
            stale.push(StaleSlice::WorkVersions(work_id.clone()));
        }
        self.repos
            .tracks
            .update_version_type(track_id, value.clone())
            .await
            .stale(|| stale)?;
        log::info!(
            "[Store] track {} version type set to {:?}",
            track_id,
            value
        );
        Ok(value)
    }

    /// 追加到歌单末尾（位置 = 当前最大位置 + 1），同一音轨不能重复加入
    pub async fn add_entry(
        &mut self,
        set_list_id: &SetListId,
        track_id: &TrackId,
    ) -> CommandResult<SetListEntry> {
        if !self.entries.contains_key(set_list_id) {
            self.fetch_playlist_entries(set_list_id).await.local()?;
        }
        let entries = self.entries(set_list_id);
        if entries.iter().any(|e| &e.track_id == track_id) {
            return Err(CommandFailure::local(AppError::InvalidInput(format!(
                "Track {} is already in set list {}",
                track_id, set_list_id
            ))));
        }
        let position = next_position(entries);
        let id = self.next_id().await.local()?;
        let entry = SetListEntry::new(
            SetListEntryId::from(id),
            set_list_id.clone(),
            track_id.clone(),
            position,
            self.viewer.clone(),
        );
        self.entries
            .entry(set_list_id.clone())
            .or_default()
            .push(entry.clone());

        self.repos
            .set_lists
            .add_entry(&entry)
            .await
            .stale(|| vec![StaleSlice::PlaylistEntries(set_list_id.clone())])?;
        log::info!(
            "[Store] track {} added to set list {} at {}",
            track_id,
            set_list_id,
            position
        );
        Ok(entry)
    }

    /// 移除条目，其余条目的位置保持不变
    pub async fn remove_entry(
        &mut self,
        set_list_id: &SetListId,
        entry_id: &SetListEntryId,
    ) -> CommandResult<()> {
        if let Some(entries) = self.entries.get_mut(set_list_id) {
            let before = entries.len();
            entries.retain(|e| &e.id != entry_id);
            if entries.len() == before {
                return Err(CommandFailure::local(not_found("SetListEntry", entry_id)));
            }
        }
        self.repos
            .set_lists
            .remove_entry(entry_id)
            .await
            .stale(|| vec![StaleSlice::PlaylistEntries(set_list_id.clone())])?;
        log::info!(
            "[Store] entry {} removed from set list {}",
            entry_id,
            set_list_id
        );
        Ok(())
    }

    /// 提交评分；与已有评分相同则取消。写入后重新统计该音轨的全部评分
    pub async fn rate(
        &mut self,
        track_id: &TrackId,
        value: RatingValue,
    ) -> CommandResult<RatingSummary> {
        if !self.ratings.contains_key(track_id) {
            self.fetch_ratings(track_id).await.local()?;
        }
        let viewer = self.viewer.clone();
        let rows = self.ratings.entry(track_id.clone()).or_default();
        let change = RatingChange::decide(aggregate(rows.as_slice(), &viewer).personal, value);
        change.apply(rows, track_id, &viewer);

        let stale = || vec![StaleSlice::Ratings(track_id.clone())];
        match change {
            RatingChange::Remove => {
                self.repos
                    .ratings
                    .delete(track_id, &viewer)
                    .await
                    .stale(stale)?;
                log::info!("[Store] rating on track {} removed", track_id);
            }
            RatingChange::Upsert(value) => {
                let rating = Rating::new(track_id.clone(), viewer.clone(), value);
                self.repos.ratings.upsert(&rating).await.stale(stale)?;
                log::info!("[Store] track {} rated {}", track_id, value);
            }
        }
        self.fetch_ratings(track_id).await.stale(stale)
    }

    /// 批量软删除音轨，逐条并发提交；部分失败时返回 `PartialFailure`
    pub async fn delete_tracks(&mut self, track_ids: &[TrackId]) -> CommandResult<usize> {
        if track_ids.is_empty() {
            return Ok(0);
        }
        let mut stale = Vec::new();
        for id in track_ids {
            if let Some(track) = self.track(id) {
                push_unique(&mut stale, StaleSlice::Tracks(track.scope()));
                if let Some(work_id) = &track.version_group_id {
                    push_unique(&mut stale, StaleSlice::WorkVersions(work_id.clone()));
                }
                if let Some(band_id) = &track.band_id {
                    push_unique(&mut stale, StaleSlice::RecycleBin(band_id.clone()));
                }
            }
        }
        for id in track_ids {
            self.remove_track(id);
        }
        for slice in &stale {
            if let StaleSlice::RecycleBin(band_id) = slice {
                self.recycle_bin.remove(band_id);
            }
        }

        let repo = self.repos.tracks.clone();
        let viewer = self.viewer.clone();
        let results = join_all(track_ids.iter().map(|id| repo.soft_delete(id, &viewer))).await;
        let mut failed = 0;
        for (id, result) in track_ids.iter().zip(&results) {
            if let Err(e) = result {
                log::error!("[Store] failed to delete track {}: {}", id, e);
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(CommandFailure::new(
                AppError::PartialFailure {
                    failed,
                    total: track_ids.len(),
                },
                stale,
            ));
        }
        log::info!("[Store] {} tracks moved to recycle bin", track_ids.len());
        Ok(track_ids.len())
    }
}
