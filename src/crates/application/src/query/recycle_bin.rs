use crate::store::entity_store::EntityStore;
use chrono::NaiveDateTime;
use domain::value::BandId;
use model::recycle_bin::RecycleBinRow;

/// 回收站列表，已过期的条目不再显示
pub fn recycle_bin_rows(store: &EntityStore, band_id: &BandId, now: NaiveDateTime) -> Vec<RecycleBinRow> {
    store
        .recycle_bin(band_id)
        .iter()
        .filter(|item| !item.is_expired(now))
        .map(|item| RecycleBinRow::new(item, now))
        .collect()
}
