use super::entity_store::EntityStore;
use super::slice::{CommandFailure, CommandResult, StaleSlice};
use crate::error::AppError;
use domain::set_list::{sort_by_position, SetListEntry};
use domain::value::SetListId;
use futures::future::join_all;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderState {
    Idle,
    Reordering,
    Saving,
}

/// 歌单拖拽排序
///
/// 进入排序模式时复制一份条目到缓冲区，拖拽只改缓冲区；
/// 保存时把缓冲区下标 + 1 作为新位置逐条提交，然后重新拉取条目。
#[derive(Debug)]
pub struct ReorderController {
    state: ReorderState,
    set_list_id: Option<SetListId>,
    buffer: Vec<SetListEntry>,
}

impl Default for ReorderController {
    fn default() -> Self {
        Self::new()
    }
}

impl ReorderController {
    pub fn new() -> Self {
        Self {
            state: ReorderState::Idle,
            set_list_id: None,
            buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> ReorderState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != ReorderState::Idle
    }

    pub fn set_list_id(&self) -> Option<&SetListId> {
        self.set_list_id.as_ref()
    }

    pub fn buffer(&self) -> &[SetListEntry] {
        &self.buffer
    }

    /// 以缓存中的条目进入排序模式
    pub fn enter(&mut self, store: &EntityStore, set_list_id: &SetListId) -> Result<(), AppError> {
        self.enter_with(set_list_id, store.entries(set_list_id).to_vec())
    }

    pub fn enter_with(
        &mut self,
        set_list_id: &SetListId,
        mut entries: Vec<SetListEntry>,
    ) -> Result<(), AppError> {
        if self.state != ReorderState::Idle {
            return Err(AppError::InvalidState(format!(
                "Already reordering set list {:?}",
                self.set_list_id
            )));
        }
        sort_by_position(&mut entries);
        log::debug!(
            "[Reorder] entering reorder mode for set list {} ({} entries)",
            set_list_id,
            entries.len()
        );
        self.state = ReorderState::Reordering;
        self.set_list_id = Some(set_list_id.clone());
        self.buffer = entries;
        Ok(())
    }

    /// 把 `from` 处的条目移动到 `to`，`to` 越界时放到末尾
    pub fn drag_over(&mut self, from: usize, to: usize) -> Result<(), AppError> {
        if self.state != ReorderState::Reordering {
            return Err(AppError::InvalidState(
                "Not in reorder mode".to_string(),
            ));
        }
        if from >= self.buffer.len() {
            return Err(AppError::InvalidInput(format!(
                "Drag source {} out of range (len {})",
                from,
                self.buffer.len()
            )));
        }
        if from == to {
            return Ok(());
        }
        let entry = self.buffer.remove(from);
        let to = to.min(self.buffer.len());
        self.buffer.insert(to, entry);
        Ok(())
    }

    /// 放弃缓冲区，缓存不受影响
    pub fn cancel(&mut self) {
        if self.is_active() {
            log::debug!("[Reorder] reorder cancelled for {:?}", self.set_list_id);
        }
        self.reset();
    }

    /// 提交新顺序；无论成败都回到 Idle
    pub async fn save(&mut self, store: &mut EntityStore) -> CommandResult<Vec<SetListEntry>> {
        if self.state != ReorderState::Reordering {
            return Err(CommandFailure::local(AppError::InvalidState(
                "Not in reorder mode".to_string(),
            )));
        }
        let Some(set_list_id) = self.set_list_id.clone() else {
            self.reset();
            return Err(CommandFailure::local(AppError::InvalidState(
                "Reorder buffer has no set list".to_string(),
            )));
        };
        self.state = ReorderState::Saving;
        let result = commit_order(store, &set_list_id, std::mem::take(&mut self.buffer)).await;
        self.reset();
        result
    }

    fn reset(&mut self) {
        self.state = ReorderState::Idle;
        self.set_list_id = None;
        self.buffer.clear();
    }
}

async fn commit_order(
    store: &mut EntityStore,
    set_list_id: &SetListId,
    mut order: Vec<SetListEntry>,
) -> CommandResult<Vec<SetListEntry>> {
    for (index, entry) in order.iter_mut().enumerate() {
        entry.position = index as i32 + 1;
    }
    store.entries.insert(set_list_id.clone(), order.clone());

    let repo = store.repos.set_lists.clone();
    let results = join_all(
        order
            .iter()
            .map(|entry| repo.update_entry_position(&entry.id, entry.position)),
    )
    .await;
    let mut failed = 0;
    for (entry, result) in order.iter().zip(&results) {
        if let Err(e) = result {
            log::error!(
                "[Reorder] failed to move entry {} to {}: {}",
                entry.id,
                entry.position,
                e
            );
            failed += 1;
        }
    }

    // 无论成败都以服务端为准
    let refreshed = store
        .fetch_playlist_entries(set_list_id)
        .await
        .map(|entries| entries.to_vec());
    if failed > 0 {
        let stale = match refreshed {
            Ok(_) => Vec::new(),
            Err(_) => vec![StaleSlice::PlaylistEntries(set_list_id.clone())],
        };
        return Err(CommandFailure::new(
            AppError::PartialFailure {
                failed,
                total: order.len(),
            },
            stale,
        ));
    }
    match refreshed {
        Ok(entries) => {
            log::info!(
                "[Reorder] saved order of {} entries for set list {}",
                entries.len(),
                set_list_id
            );
            Ok(entries)
        }
        Err(e) => Err(CommandFailure::new(
            e,
            vec![StaleSlice::PlaylistEntries(set_list_id.clone())],
        )),
    }
}
