use crate::command::rating::RatingAggregator;
use crate::command::set_list::SetListDialog;
use crate::command::shared::IdGenerator;
use crate::command::work::{AddTracksOutcome, VersionGroupCoordinator};
use crate::config::DashboardConfig;
use crate::context::AppContext;
use crate::deep_link::{DeepLinkTarget, DeepLinks};
use crate::error::AppError;
use crate::event::event_bus::{EventBus, EventEnvelope};
use crate::event::events::DashboardEvent;
use crate::notice::NoticeBoard;
use crate::playback::{AudioEvent, AudioOutput, PlaybackController, QueueItem};
use crate::query;
use crate::shared::Repositories;
use crate::store::entity_store::EntityStore;
use crate::store::reorder::ReorderController;
use crate::store::selection::{ClickModifier, SelectionController};
use crate::store::slice::{CommandFailure, CommandResult, StaleSlice};
use chrono::Utc;
use domain::comment::{Comment, CommentSort};
use domain::rating::{RatingSummary, RatingValue};
use domain::recycle_bin::RecycledKind;
use domain::set_list::{SetList, SetListEntry};
use domain::value::{
    BandId, CommentId, Scope, SetListEntryId, SetListId, TrackId, UserId, WorkId,
};
use domain::version_type::VersionType;
use domain::work::{Work, WorkSort, WorkSortKey};
use model::recycle_bin::RecycleBinRow;
use model::set_list::{SetListSummary, SetListView};
use model::track::TrackView;
use model::work::{WorkDetail, WorkSummary};
use std::collections::HashMap;
use std::sync::Arc;

/// 乐队仪表盘
///
/// 把实体缓存和各个控制器组合在一起。每个命令执行完都经过同一个
/// 收尾步骤：成功时发提示、发布事件；失败时记录日志、发错误提示，
/// 并重新拉取被乐观更新弄脏的数据块。
pub struct Dashboard<B: EventBus> {
    store: EntityStore,
    selection: SelectionController<TrackId>,
    reorder: ReorderController,
    works: VersionGroupCoordinator,
    set_list_dialog: SetListDialog,
    notices: NoticeBoard,
    playback: PlaybackController,
    deep_links: DeepLinks,
    event_bus: Arc<B>,
    ctx: AppContext,
}

impl<B: EventBus> Dashboard<B> {
    pub fn new(
        repos: Repositories,
        id_generator: Arc<dyn IdGenerator>,
        event_bus: Arc<B>,
        output: Arc<dyn AudioOutput>,
        config: &dyn DashboardConfig,
    ) -> Self {
        let viewer = UserId::from(config.viewer_id());
        Self {
            store: EntityStore::new(repos, id_generator, viewer.clone()),
            selection: SelectionController::new(),
            reorder: ReorderController::new(),
            works: VersionGroupCoordinator::new(),
            set_list_dialog: SetListDialog::new(),
            notices: NoticeBoard::new(config.success_notice_ttl_ms()),
            playback: PlaybackController::new(output, config.auto_advance()),
            deep_links: DeepLinks::new(&config.deep_link_scheme(), &config.web_host()),
            event_bus,
            ctx: AppContext::new(viewer),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionController<TrackId> {
        &self.selection
    }

    pub fn reorder(&self) -> &ReorderController {
        &self.reorder
    }

    pub fn works(&self) -> &VersionGroupCoordinator {
        &self.works
    }

    pub fn notices(&mut self) -> &mut NoticeBoard {
        &mut self.notices
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn deep_links(&self) -> &DeepLinks {
        &self.deep_links
    }

    pub fn set_list_dialog(&mut self) -> &mut SetListDialog {
        &mut self.set_list_dialog
    }

    // ---------------------------------------------------------------
    // 收尾
    // ---------------------------------------------------------------

    async fn settle<T>(
        &mut self,
        action: &str,
        result: CommandResult<T>,
        success: Option<String>,
    ) -> Result<T, AppError> {
        match result {
            Ok(value) => {
                if let Some(message) = success {
                    self.notices.success(message);
                }
                Ok(value)
            }
            Err(CommandFailure { error, stale }) => {
                if error.is_validation() {
                    log::debug!("[Dashboard] {} rejected: {}", action, error);
                } else {
                    log::error!("[Dashboard] {} failed: {}", action, error);
                    self.notices.error(format!("Failed to {}: {}", action, error));
                }
                if !stale.is_empty() {
                    self.resync(stale).await;
                }
                Err(error)
            }
        }
    }

    async fn resync(&mut self, stale: Vec<StaleSlice>) {
        match self.store.resync(&stale).await {
            Ok(()) => {
                log::info!("[Dashboard] resynced {} slices", stale.len());
                self.publish(DashboardEvent::SlicesResynced { slices: stale })
                    .await;
            }
            Err(e) => log::warn!("[Dashboard] resync incomplete: {}", e),
        }
    }

    async fn publish(&self, event: DashboardEvent) {
        let envelope = EventEnvelope::from_context(event.aggregate_id(), event, &self.ctx.inherit());
        if let Err(e) = self.event_bus.publish(envelope).await {
            log::warn!("[Dashboard] failed to publish event: {}", e);
        }
    }

    async fn load<T>(&mut self, action: &str, result: Result<T, AppError>) -> Result<T, AppError> {
        self.settle(action, result.map_err(CommandFailure::local), None)
            .await
    }

    // ---------------------------------------------------------------
    // 加载
    // ---------------------------------------------------------------

    /// 切换到某个范围时加载音轨、歌单和 Work
    pub async fn load_scope(&mut self, scope: &Scope) -> Result<(), AppError> {
        let result = self.store.fetch_tracks(scope).await.map(|_| ());
        self.load("load tracks", result).await?;
        let result = self.store.fetch_set_lists(scope).await.map(|_| ());
        self.load("load set lists", result).await?;
        let result = self.store.fetch_works(scope).await.map(|_| ());
        self.load("load works", result).await?;
        let queue: Vec<QueueItem> = self.store.tracks(scope).iter().map(QueueItem::from).collect();
        self.playback.set_queue(queue);
        Ok(())
    }

    pub async fn open_set_list(&mut self, id: &SetListId) -> Result<SetListView, AppError> {
        let result = self.store.fetch_playlist_entries(id).await.map(|_| ());
        self.load("load set list", result).await?;
        query::set_list::set_list_view(&self.store, id)
    }

    pub async fn open_work(
        &mut self,
        id: &WorkId,
        version_type: Option<&str>,
    ) -> Result<WorkDetail, AppError> {
        let result = self.store.fetch_work_versions(id).await.map(|_| ());
        self.load("load work", result).await?;
        query::work::work_detail(&self.store, id, version_type)
    }

    pub async fn load_ratings(
        &mut self,
        track_ids: &[TrackId],
    ) -> Result<HashMap<TrackId, RatingSummary>, AppError> {
        let result = RatingAggregator::refresh(&mut self.store, track_ids).await;
        self.settle("load ratings", result, None).await
    }

    pub async fn load_comments(
        &mut self,
        track_id: &TrackId,
        sort: CommentSort,
    ) -> Result<Vec<Comment>, AppError> {
        let result = self.store.fetch_comments(track_id).await.map(|_| ());
        self.load("load comments", result).await?;
        Ok(query::comment::sorted_comments(&self.store, track_id, sort))
    }

    pub async fn load_version_types(
        &mut self,
        band_id: Option<&BandId>,
    ) -> Result<Vec<VersionType>, AppError> {
        let result = self
            .store
            .fetch_version_types(band_id)
            .await
            .map(|types| types.to_vec());
        self.load("load version types", result).await
    }

    pub async fn load_recycle_bin(&mut self, band_id: &BandId) -> Result<Vec<RecycleBinRow>, AppError> {
        let result = self.store.fetch_recycle_bin(band_id).await.map(|_| ());
        self.load("load recycle bin", result).await?;
        Ok(query::recycle_bin::recycle_bin_rows(
            &self.store,
            band_id,
            Utc::now().naive_utc(),
        ))
    }

    // ---------------------------------------------------------------
    // 读取
    // ---------------------------------------------------------------

    pub fn track_rows(&self, scope: &Scope) -> Vec<TrackView> {
        query::track::track_rows(&self.store, scope)
    }

    pub fn set_list_summaries(&self, scope: &Scope) -> Vec<SetListSummary> {
        query::set_list::set_list_summaries(&self.store, scope)
    }

    pub fn work_summaries(&self, scope: &Scope) -> Vec<WorkSummary> {
        query::work::work_summaries(&self.store, scope, self.works.sort())
    }

    pub fn toggle_work_sort(&mut self, key: WorkSortKey) -> WorkSort {
        self.works.toggle_sort(key)
    }

    // ---------------------------------------------------------------
    // 选择
    // ---------------------------------------------------------------

    pub fn click_track(&mut self, id: &TrackId, modifier: ClickModifier, visible: &[TrackId]) {
        self.selection.click(id, modifier, visible);
    }

    pub fn select_all(&mut self, visible: &[TrackId]) {
        self.selection.select_all(visible);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ---------------------------------------------------------------
    // 音轨
    // ---------------------------------------------------------------

    pub async fn set_version_type(
        &mut self,
        track_id: &TrackId,
        version_type: Option<&str>,
    ) -> Result<Option<String>, AppError> {
        let result = self.store.set_version_type(track_id, version_type).await;
        let value = self
            .settle("update version type", result, Some("Version type updated".to_string()))
            .await?;
        self.publish(DashboardEvent::VersionTypeChanged {
            track_id: track_id.clone(),
            version_type: value.clone(),
        })
        .await;
        Ok(value)
    }

    pub async fn rate(
        &mut self,
        track_id: &TrackId,
        value: RatingValue,
    ) -> Result<RatingSummary, AppError> {
        let result = self.store.rate(track_id, value).await;
        let summary = self.settle("rate track", result, None).await?;
        self.publish(DashboardEvent::TrackRated {
            track_id: track_id.clone(),
            summary,
        })
        .await;
        Ok(summary)
    }

    /// 删除选中的音轨（按可见顺序），完成后清空选择
    pub async fn delete_selected(&mut self, visible: &[TrackId]) -> Result<usize, AppError> {
        let ids = self.selection.selected_in_order(visible);
        if ids.is_empty() {
            return Ok(0);
        }
        let result = self.store.delete_tracks(&ids).await;
        self.selection.clear();
        let count = self
            .settle(
                "delete tracks",
                result,
                Some(format!("{} tracks moved to recycle bin", ids.len())),
            )
            .await?;
        self.publish(DashboardEvent::TracksDeleted { track_ids: ids })
            .await;
        Ok(count)
    }

    // ---------------------------------------------------------------
    // 歌单
    // ---------------------------------------------------------------

    /// 把选中的音轨按可见顺序加入歌单；已在歌单中的跳过
    pub async fn add_selected_to_set_list(
        &mut self,
        set_list_id: &SetListId,
        visible: &[TrackId],
    ) -> Result<Vec<SetListEntry>, AppError> {
        let ids = self.selection.selected_in_order(visible);
        let mut added = Vec::new();
        for track_id in &ids {
            if self
                .store
                .entries(set_list_id)
                .iter()
                .any(|e| &e.track_id == track_id)
            {
                continue;
            }
            added.push(self.add_to_set_list(set_list_id, track_id).await?);
        }
        Ok(added)
    }

    pub async fn add_to_set_list(
        &mut self,
        set_list_id: &SetListId,
        track_id: &TrackId,
    ) -> Result<SetListEntry, AppError> {
        let result = self.store.add_entry(set_list_id, track_id).await;
        let entry = self
            .settle("add to set list", result, Some("Added to set list".to_string()))
            .await?;
        self.publish(DashboardEvent::EntryAdded {
            set_list_id: set_list_id.clone(),
            entry_id: entry.id.clone(),
            track_id: track_id.clone(),
        })
        .await;
        Ok(entry)
    }

    pub async fn remove_from_set_list(
        &mut self,
        set_list_id: &SetListId,
        entry_id: &SetListEntryId,
    ) -> Result<(), AppError> {
        let result = self.store.remove_entry(set_list_id, entry_id).await;
        self.settle("remove from set list", result, None).await?;
        self.publish(DashboardEvent::EntryRemoved {
            set_list_id: set_list_id.clone(),
            entry_id: entry_id.clone(),
        })
        .await;
        Ok(())
    }

    pub fn begin_reorder(&mut self, set_list_id: &SetListId) -> Result<(), AppError> {
        self.reorder.enter(&self.store, set_list_id)
    }

    pub fn drag_over(&mut self, from: usize, to: usize) -> Result<(), AppError> {
        self.reorder.drag_over(from, to)
    }

    pub fn cancel_reorder(&mut self) {
        self.reorder.cancel();
    }

    pub async fn save_reorder(&mut self) -> Result<Vec<SetListEntry>, AppError> {
        let set_list_id = self.reorder.set_list_id().cloned();
        let result = self.reorder.save(&mut self.store).await;
        let entries = self
            .settle("save order", result, Some("Order saved".to_string()))
            .await?;
        if let Some(set_list_id) = set_list_id {
            self.publish(DashboardEvent::PositionsCommitted {
                set_list_id,
                count: entries.len(),
            })
            .await;
        }
        Ok(entries)
    }

    pub fn open_set_list_dialog(&mut self) {
        self.set_list_dialog.open();
    }

    /// 提交新建歌单对话框；校验未通过时返回 `Ok(None)`，错误显示在对话框内
    pub async fn submit_set_list_dialog(&mut self, scope: &Scope) -> Result<Option<SetList>, AppError> {
        let result = self.set_list_dialog.submit(&mut self.store, scope).await;
        let created = self
            .settle("create set list", result, None)
            .await?;
        if let Some(set_list) = &created {
            self.notices.success(format!("Set list \"{}\" created", set_list.title));
            self.publish(DashboardEvent::SetListCreated {
                set_list_id: set_list.id.clone(),
            })
            .await;
        }
        Ok(created)
    }

    pub async fn rename_set_list(&mut self, id: &SetListId, title: &str) -> Result<SetList, AppError> {
        let result = self.store.rename_set_list(id, title).await;
        let set_list = self.settle("rename set list", result, None).await?;
        self.publish(DashboardEvent::SetListUpdated {
            set_list_id: id.clone(),
        })
        .await;
        Ok(set_list)
    }

    pub async fn update_set_list_description(
        &mut self,
        id: &SetListId,
        description: Option<&str>,
    ) -> Result<SetList, AppError> {
        let result = self.store.update_set_list_description(id, description).await;
        let set_list = self.settle("update set list", result, None).await?;
        self.publish(DashboardEvent::SetListUpdated {
            set_list_id: id.clone(),
        })
        .await;
        Ok(set_list)
    }

    pub async fn delete_set_list(&mut self, id: &SetListId) -> Result<(), AppError> {
        if self.reorder.set_list_id() == Some(id) {
            self.reorder.cancel();
        }
        let result = self.store.delete_set_list(id).await;
        self.settle(
            "delete set list",
            result,
            Some("Set list moved to recycle bin".to_string()),
        )
        .await?;
        self.publish(DashboardEvent::SetListDeleted {
            set_list_id: id.clone(),
        })
        .await;
        Ok(())
    }

    /// 歌单的网页分享链接；歌单还没有分享码时返回 None
    pub fn share_link(&self, id: &SetListId) -> Option<String> {
        self.store
            .set_list(id)
            .and_then(|l| l.share_code.as_deref())
            .map(|code| self.deep_links.playlist_link(code))
    }

    // ---------------------------------------------------------------
    // Work
    // ---------------------------------------------------------------

    pub async fn create_work(&mut self, scope: &Scope, name: &str) -> Result<Work, AppError> {
        let result = self.works.create_empty(&mut self.store, scope, name).await;
        let work = self
            .settle("create work", result, Some(format!("Work \"{}\" created", name.trim())))
            .await?;
        self.publish(DashboardEvent::WorkCreated {
            work_id: work.id.clone(),
        })
        .await;
        Ok(work)
    }

    pub async fn add_tracks_to_work(
        &mut self,
        work_id: &WorkId,
        track_ids: &[TrackId],
    ) -> Result<AddTracksOutcome, AppError> {
        let result = self.works.add_tracks(&mut self.store, work_id, track_ids).await;
        let outcome = self.settle("add versions", result, None).await?;
        if let AddTracksOutcome::Added(moved) = &outcome {
            self.after_move(work_id, moved.clone()).await;
        }
        Ok(outcome)
    }

    pub async fn confirm_move(&mut self) -> Result<Vec<TrackId>, AppError> {
        let work_id = self.works.pending().map(|p| p.target_work_id.clone());
        let result = self.works.confirm_pending(&mut self.store).await;
        let moved = self.settle("move versions", result, None).await?;
        if let Some(work_id) = work_id {
            self.after_move(&work_id, moved.clone()).await;
        }
        Ok(moved)
    }

    pub fn cancel_move(&mut self) {
        if self.works.cancel_pending().is_some() {
            log::debug!("[Dashboard] pending move cancelled");
        }
    }

    async fn after_move(&mut self, work_id: &WorkId, moved: Vec<TrackId>) {
        if moved.is_empty() {
            return;
        }
        self.notices
            .success(format!("{} versions added", moved.len()));
        self.publish(DashboardEvent::TracksMoved {
            work_id: work_id.clone(),
            track_ids: moved,
        })
        .await;
    }

    pub async fn set_hero(&mut self, work_id: &WorkId, track_id: &TrackId) -> Result<Work, AppError> {
        let result = self.works.set_hero(&mut self.store, work_id, track_id).await;
        let work = self
            .settle("set hero version", result, Some("Hero version updated".to_string()))
            .await?;
        self.publish(DashboardEvent::HeroChanged {
            work_id: work_id.clone(),
            track_id: track_id.clone(),
        })
        .await;
        Ok(work)
    }

    pub async fn rename_work(&mut self, work_id: &WorkId, name: &str) -> Result<Work, AppError> {
        let result = self.works.rename(&mut self.store, work_id, name).await;
        let work = self.settle("rename work", result, None).await?;
        self.publish(DashboardEvent::WorkUpdated {
            work_id: work_id.clone(),
        })
        .await;
        Ok(work)
    }

    pub async fn update_work_description(
        &mut self,
        work_id: &WorkId,
        description: Option<&str>,
    ) -> Result<Work, AppError> {
        let result = self
            .works
            .update_description(&mut self.store, work_id, description)
            .await;
        let work = self.settle("update work", result, None).await?;
        self.publish(DashboardEvent::WorkUpdated {
            work_id: work_id.clone(),
        })
        .await;
        Ok(work)
    }

    pub async fn delete_work(&mut self, work_id: &WorkId) -> Result<(), AppError> {
        let result = self.works.delete(&mut self.store, work_id).await;
        self.settle(
            "delete work",
            result,
            Some("Work moved to recycle bin".to_string()),
        )
        .await?;
        self.publish(DashboardEvent::WorkDeleted {
            work_id: work_id.clone(),
        })
        .await;
        Ok(())
    }

    pub async fn remove_track_from_work(
        &mut self,
        work_id: &WorkId,
        track_id: &TrackId,
    ) -> Result<(), AppError> {
        let result = self
            .works
            .remove_track(&mut self.store, work_id, track_id)
            .await;
        self.settle("remove version", result, None).await?;
        self.publish(DashboardEvent::TrackDetached {
            work_id: work_id.clone(),
            track_id: track_id.clone(),
        })
        .await;
        Ok(())
    }

    // ---------------------------------------------------------------
    // 评论与版本类型
    // ---------------------------------------------------------------

    pub async fn add_comment(
        &mut self,
        track_id: &TrackId,
        content: &str,
        timestamp_seconds: Option<f64>,
    ) -> Result<Comment, AppError> {
        let result = self
            .store
            .add_comment(track_id, content, timestamp_seconds)
            .await;
        let comment = self.settle("post comment", result, None).await?;
        self.publish(DashboardEvent::CommentPosted {
            track_id: track_id.clone(),
            comment_id: comment.id.clone(),
        })
        .await;
        Ok(comment)
    }

    pub async fn edit_comment(
        &mut self,
        track_id: &TrackId,
        comment_id: &CommentId,
        content: &str,
    ) -> Result<Comment, AppError> {
        let result = self.store.edit_comment(track_id, comment_id, content).await;
        let comment = self.settle("edit comment", result, None).await?;
        self.publish(DashboardEvent::CommentEdited {
            track_id: track_id.clone(),
            comment_id: comment_id.clone(),
        })
        .await;
        Ok(comment)
    }

    pub async fn delete_comment(
        &mut self,
        track_id: &TrackId,
        comment_id: &CommentId,
    ) -> Result<(), AppError> {
        let result = self.store.delete_comment(track_id, comment_id).await;
        self.settle("delete comment", result, None).await?;
        self.publish(DashboardEvent::CommentDeleted {
            track_id: track_id.clone(),
            comment_id: comment_id.clone(),
        })
        .await;
        Ok(())
    }

    pub async fn create_version_type(
        &mut self,
        band_id: &BandId,
        name: &str,
    ) -> Result<VersionType, AppError> {
        let result = self.store.create_version_type(band_id, name).await;
        let version_type = self
            .settle("create version type", result, None)
            .await?;
        self.publish(DashboardEvent::VersionTypeCreated {
            id: version_type.id.clone(),
        })
        .await;
        Ok(version_type)
    }

    // ---------------------------------------------------------------
    // 回收站
    // ---------------------------------------------------------------

    pub async fn restore_item(
        &mut self,
        band_id: &BandId,
        kind: RecycledKind,
        id: i64,
    ) -> Result<(), AppError> {
        let result = self.store.restore_item(band_id, kind, id).await;
        self.settle("restore item", result, Some(format!("{} restored", kind)))
            .await?;
        self.publish(DashboardEvent::ItemRestored { kind, id }).await;
        Ok(())
    }

    pub async fn purge_item(
        &mut self,
        band_id: &BandId,
        kind: RecycledKind,
        id: i64,
    ) -> Result<(), AppError> {
        let result = self.store.purge_item(band_id, kind, id).await;
        self.settle("delete permanently", result, None).await?;
        self.publish(DashboardEvent::ItemPurged { kind, id }).await;
        Ok(())
    }

    pub async fn empty_recycle_bin(&mut self, band_id: &BandId) -> Result<usize, AppError> {
        let result = self.store.empty_recycle_bin(band_id).await;
        let count = self
            .settle("empty recycle bin", result, Some("Recycle bin emptied".to_string()))
            .await?;
        self.publish(DashboardEvent::RecycleBinEmptied {
            band_id: band_id.clone(),
            count,
        })
        .await;
        Ok(count)
    }

    // ---------------------------------------------------------------
    // 播放与链接
    // ---------------------------------------------------------------

    pub async fn play(&mut self, track_id: &TrackId) -> Result<(), AppError> {
        let result = self.playback.toggle(track_id).await;
        self.load("play track", result).await?;
        if self.playback.current_track() == Some(track_id) {
            self.publish(DashboardEvent::PlaybackStarted {
                track_id: track_id.clone(),
            })
            .await;
        }
        Ok(())
    }

    pub async fn handle_audio_event(&mut self, event: AudioEvent) -> Result<(), AppError> {
        let before = self.playback.current_track().cloned();
        let result = self.playback.handle_event(event).await;
        self.load("play track", result).await?;
        let after = self.playback.current_track().cloned();
        if let Some(track_id) = after.filter(|id| before.as_ref() != Some(id)) {
            self.publish(DashboardEvent::PlaybackStarted { track_id }).await;
        }
        Ok(())
    }

    pub fn open_link(&self, link: &str) -> Result<DeepLinkTarget, AppError> {
        let target = self.deep_links.parse(link)?;
        log::info!("[Dashboard] opening link {:?}", target);
        Ok(target)
    }
}
