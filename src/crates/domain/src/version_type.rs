use crate::value::{BandId, VersionTypeId};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VersionTypeError {
    #[error("Database error: {0}")]
    DbErr(String),
    #[error("Validation error: {0}")]
    ValidationErr(String),
    #[error("Version type already exists: {0}")]
    Duplicate(String),
    #[error("{0}")]
    OtherErr(String),
}

/// 版本类型标签，如 "Demo"、"Final"
///
/// `band_id` 为空的是全局默认类型。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionType {
    pub id: VersionTypeId,
    pub name: String,
    pub band_id: Option<BandId>,
    pub is_default: bool,
}

impl VersionType {
    /// 创建乐队自定义类型，名称不能为空且不能与已有类型重名（忽略大小写）
    pub fn new_custom(
        id: VersionTypeId,
        name: &str,
        band_id: BandId,
        existing: &[VersionType],
    ) -> Result<Self, VersionTypeError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VersionTypeError::ValidationErr(
                "Version type name cannot be empty".to_string(),
            ));
        }
        if existing.iter().any(|t| t.name.eq_ignore_ascii_case(name)) {
            return Err(VersionTypeError::Duplicate(name.to_string()));
        }
        Ok(Self {
            id,
            name: name.to_string(),
            band_id: Some(band_id),
            is_default: false,
        })
    }

    pub fn is_global(&self) -> bool {
        self.band_id.is_none()
    }
}

/// 默认类型在前，其后是乐队类型（按名称）
pub fn merge_for_band(mut types: Vec<VersionType>) -> Vec<VersionType> {
    types.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| b.is_global().cmp(&a.is_global()))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    types
}

#[async_trait]
pub trait VersionTypeRepository: Send + Sync {
    /// 全局类型加上该乐队的自定义类型
    async fn find_for_band(
        &self,
        band_id: Option<&BandId>,
    ) -> Result<Vec<VersionType>, VersionTypeError>;

    async fn insert(&self, version_type: &VersionType) -> Result<(), VersionTypeError>;
}
