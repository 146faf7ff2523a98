use crate::store::entity_store::EntityStore;
use crate::store::slice::{CommandResult, CommandResultExt, StaleSlice};
use domain::set_list::{validate_title, SetList};
use domain::value::{Scope, SetListId};

impl EntityStore {
    pub async fn create_set_list(
        &mut self,
        scope: &Scope,
        title: &str,
        description: Option<&str>,
    ) -> CommandResult<SetList> {
        let id = self.next_id().await.local()?;
        let set_list = SetList::new(
            SetListId::from(id),
            title,
            description,
            scope.band_id().cloned(),
            self.viewer.clone(),
        )
        .local()?;
        self.put_set_list(set_list.clone());
        self.entries.insert(set_list.id.clone(), Vec::new());

        self.repos
            .set_lists
            .insert(&set_list)
            .await
            .stale(|| vec![StaleSlice::SetLists(scope.clone())])?;
        log::info!("[SetList] created set list {} ({})", set_list.id, set_list.title);
        Ok(set_list)
    }

    pub async fn rename_set_list(&mut self, id: &SetListId, title: &str) -> CommandResult<SetList> {
        let mut set_list = self.load_set_list(id).await.local()?;
        set_list.rename(title).local()?;
        self.save_set_list(set_list).await
    }

    pub async fn update_set_list_description(
        &mut self,
        id: &SetListId,
        description: Option<&str>,
    ) -> CommandResult<SetList> {
        let mut set_list = self.load_set_list(id).await.local()?;
        set_list.update_description(description);
        self.save_set_list(set_list).await
    }

    /// 软删除，进入回收站
    pub async fn delete_set_list(&mut self, id: &SetListId) -> CommandResult<()> {
        let set_list = self.load_set_list(id).await.local()?;
        self.remove_set_list(id);
        if let Some(band_id) = &set_list.band_id {
            self.recycle_bin.remove(band_id);
        }
        let viewer = self.viewer.clone();
        self.repos
            .set_lists
            .soft_delete(id, &viewer)
            .await
            .stale(|| vec![StaleSlice::SetLists(set_list.scope())])?;
        log::info!("[SetList] set list {} moved to recycle bin", id);
        Ok(())
    }

    async fn save_set_list(&mut self, set_list: SetList) -> CommandResult<SetList> {
        self.put_set_list(set_list.clone());
        self.repos
            .set_lists
            .update(&set_list)
            .await
            .stale(|| vec![StaleSlice::SetLists(set_list.scope())])?;
        log::info!("[SetList] set list {} updated", set_list.id);
        Ok(set_list)
    }
}

/// 新建歌单对话框
///
/// 标题为空时只显示内联错误，不发请求；请求失败时对话框保持打开。
#[derive(Debug, Default)]
pub struct SetListDialog {
    open: bool,
    title: String,
    description: String,
    error: Option<String>,
}

impl SetListDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        *self = Self {
            open: true,
            ..Self::default()
        };
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.error = None;
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 提交；校验未通过时返回 `Ok(None)`
    pub async fn submit(
        &mut self,
        store: &mut EntityStore,
        scope: &Scope,
    ) -> CommandResult<Option<SetList>> {
        if let Err(e) = validate_title(&self.title) {
            self.error = Some(e.to_string());
            return Ok(None);
        }
        let description = Some(self.description.as_str()).filter(|d| !d.trim().is_empty());
        match store.create_set_list(scope, &self.title, description).await {
            Ok(set_list) => {
                self.close();
                Ok(Some(set_list))
            }
            Err(failure) => {
                self.error = Some(failure.error.to_string());
                Err(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_resets_previous_input() {
        let mut dialog = SetListDialog::new();
        dialog.open();
        dialog.set_title("Friday gig");
        dialog.close();
        dialog.open();
        assert!(dialog.is_open());
        assert_eq!(dialog.title(), "");
        assert_eq!(dialog.error(), None);
    }

    #[test]
    fn test_typing_clears_error() {
        let mut dialog = SetListDialog::new();
        dialog.open();
        dialog.error = Some("Title cannot be empty".to_string());
        dialog.set_title("x");
        assert_eq!(dialog.error(), None);
    }
}
