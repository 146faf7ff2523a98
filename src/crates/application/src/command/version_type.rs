use crate::store::entity_store::EntityStore;
use crate::store::slice::{CommandResult, CommandResultExt, StaleSlice};
use domain::value::{BandId, VersionTypeId};
use domain::version_type::{merge_for_band, VersionType};

impl EntityStore {
    /// 为乐队新增自定义版本类型，与已有类型（含全局类型）不能重名
    pub async fn create_version_type(
        &mut self,
        band_id: &BandId,
        name: &str,
    ) -> CommandResult<VersionType> {
        let key = Some(band_id.clone());
        if !self.version_types.contains_key(&key) {
            self.fetch_version_types(Some(band_id)).await.local()?;
        }
        let id = self.next_id().await.local()?;
        let version_type = VersionType::new_custom(
            VersionTypeId::from(id),
            name,
            band_id.clone(),
            self.version_types(Some(band_id)),
        )
        .local()?;

        let mut types = self.version_types.remove(&key).unwrap_or_default();
        types.push(version_type.clone());
        self.version_types.insert(key.clone(), merge_for_band(types));

        self.repos
            .version_types
            .insert(&version_type)
            .await
            .stale(|| vec![StaleSlice::VersionTypes(key.clone())])?;
        log::info!(
            "[VersionType] created version type {} for band {}",
            version_type.name,
            band_id
        );
        Ok(version_type)
    }
}
