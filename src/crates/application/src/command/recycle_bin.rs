use crate::store::entity_store::EntityStore;
use crate::store::slice::{CommandResult, CommandResultExt, StaleSlice};
use domain::recycle_bin::RecycledKind;
use domain::value::{BandId, Scope, WorkId};

impl EntityStore {
    /// 从回收站恢复；恢复 Work 时其成员重新显示分组
    pub async fn restore_item(
        &mut self,
        band_id: &BandId,
        kind: RecycledKind,
        id: i64,
    ) -> CommandResult<()> {
        if let Some(items) = self.recycle_bin.get_mut(band_id) {
            items.retain(|i| !(i.kind == kind && i.id == id));
        }
        let stale = restored_slices(band_id, kind);
        self.repos
            .recycle_bin
            .restore(kind, id)
            .await
            .stale(|| stale.clone())?;
        if kind == RecycledKind::Work {
            self.restore_work(&WorkId::from(id));
        }
        log::info!("[RecycleBin] restored {} {}", kind, id);
        // 恢复的实体需要从服务端重新拉取才会出现在列表里
        self.resync(&stale).await.local()?;
        Ok(())
    }

    /// 永久删除单个条目
    pub async fn purge_item(
        &mut self,
        band_id: &BandId,
        kind: RecycledKind,
        id: i64,
    ) -> CommandResult<()> {
        if let Some(items) = self.recycle_bin.get_mut(band_id) {
            items.retain(|i| !(i.kind == kind && i.id == id));
        }
        self.repos
            .recycle_bin
            .purge(kind, id)
            .await
            .stale(|| vec![StaleSlice::RecycleBin(band_id.clone())])?;
        if kind == RecycledKind::Work {
            self.recycled_works.remove(&WorkId::from(id));
        }
        log::info!("[RecycleBin] purged {} {}", kind, id);
        Ok(())
    }

    pub async fn empty_recycle_bin(&mut self, band_id: &BandId) -> CommandResult<usize> {
        let purged_works: Vec<WorkId> = self
            .recycle_bin(band_id)
            .iter()
            .filter(|i| i.kind == RecycledKind::Work)
            .map(|i| WorkId::from(i.id))
            .collect();
        self.recycle_bin.insert(band_id.clone(), Vec::new());
        let count = self
            .repos
            .recycle_bin
            .empty(band_id)
            .await
            .stale(|| vec![StaleSlice::RecycleBin(band_id.clone())])?;
        for id in &purged_works {
            self.recycled_works.remove(id);
        }
        log::info!("[RecycleBin] emptied recycle bin of band {} ({} items)", band_id, count);
        Ok(count)
    }
}

fn restored_slices(band_id: &BandId, kind: RecycledKind) -> Vec<StaleSlice> {
    let scope = Scope::Band(band_id.clone());
    let mut slices = vec![StaleSlice::RecycleBin(band_id.clone())];
    match kind {
        RecycledKind::Track => slices.push(StaleSlice::Tracks(scope)),
        RecycledKind::SetList => slices.push(StaleSlice::SetLists(scope)),
        RecycledKind::Work => {
            slices.push(StaleSlice::Works(scope.clone()));
            slices.push(StaleSlice::Tracks(scope));
        }
    }
    slices
}
