use super::InMemoryBackend;
use async_trait::async_trait;
use domain::value::BandId;
use domain::version_type::{VersionType, VersionTypeError, VersionTypeRepository};

pub struct InMemoryVersionTypeRepository {
    backend: InMemoryBackend,
}

impl InMemoryVersionTypeRepository {
    pub fn new(backend: InMemoryBackend) -> Self {
        Self { backend }
    }

    fn enter(&self, op: &'static str) -> Result<(), VersionTypeError> {
        self.backend.enter(op).map_err(VersionTypeError::DbErr)
    }

    fn visible_to(&self, band_id: Option<&BandId>) -> Vec<VersionType> {
        self.backend
            .tables
            .version_types
            .iter()
            .filter(|t| t.band_id.is_none() || t.band_id.as_ref() == band_id)
            .map(|t| t.clone())
            .collect()
    }
}

#[async_trait]
impl VersionTypeRepository for InMemoryVersionTypeRepository {
    async fn find_for_band(
        &self,
        band_id: Option<&BandId>,
    ) -> Result<Vec<VersionType>, VersionTypeError> {
        self.enter("version_types.find_for_band")?;
        Ok(self.visible_to(band_id))
    }

    async fn insert(&self, version_type: &VersionType) -> Result<(), VersionTypeError> {
        self.enter("version_types.insert")?;
        let duplicate = self
            .visible_to(version_type.band_id.as_ref())
            .iter()
            .any(|t| t.name.eq_ignore_ascii_case(&version_type.name));
        if duplicate {
            return Err(VersionTypeError::Duplicate(version_type.name.clone()));
        }
        self.backend.insert_version_type(version_type.clone());
        Ok(())
    }
}
