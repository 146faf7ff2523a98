use crate::value::{BandId, Scope, TrackId, UserId, WorkId};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use thiserror::Error;

/// 音轨领域错误
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Database error: {0}")]
    DbErr(String),
    #[error("Track not found: {0}")]
    NotFound(TrackId),
    #[error("Validation error: {0}")]
    ValidationErr(String),
    #[error("{0}")]
    OtherErr(String),
}

/// 音轨实体
///
/// 上传时创建；删除时先进入回收站（`deleted_at` 有值），30 天内可恢复。
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub duration_seconds: Option<f64>,
    pub file_url: String,
    pub folder_path: Option<String>,
    pub version_type: Option<String>,
    pub version_group_id: Option<WorkId>,
    pub band_id: Option<BandId>,
    pub created_by: UserId,
    pub created_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Track {
    pub fn new(
        id: TrackId,
        title: &str,
        file_url: &str,
        band_id: Option<BandId>,
        created_by: UserId,
    ) -> Self {
        Self {
            id,
            title: title.to_string(),
            duration_seconds: None,
            file_url: file_url.to_string(),
            folder_path: None,
            version_type: None,
            version_group_id: None,
            band_id,
            created_by,
            created_at: Utc::now().naive_utc(),
            deleted_at: None,
        }
    }

    pub fn scope(&self) -> Scope {
        Scope::of(self.band_id.as_ref(), &self.created_by)
    }

    /// 设置版本类型，空白字符串视为清除
    pub fn set_version_type(&mut self, version_type: Option<&str>) {
        self.version_type = version_type
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
    }

    /// 移入某个 Work，返回之前所属的 Work
    pub fn assign_to_work(&mut self, work_id: WorkId) -> Option<WorkId> {
        self.version_group_id.replace(work_id)
    }

    /// 退出当前 Work，返回之前所属的 Work
    pub fn leave_work(&mut self) -> Option<WorkId> {
        self.version_group_id.take()
    }

    pub fn is_in_work(&self, work_id: &WorkId) -> bool {
        self.version_group_id.as_ref() == Some(work_id)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// 音轨仓储接口
#[async_trait]
pub trait TrackRepository: Send + Sync {
    async fn find_by_id(&self, id: &TrackId) -> Result<Option<Track>, TrackError>;

    /// 查询范围内未删除的音轨，按创建时间倒序
    async fn find_by_scope(&self, scope: &Scope) -> Result<Vec<Track>, TrackError>;

    /// 查询属于某个 Work 的未删除音轨
    async fn find_by_work(&self, work_id: &WorkId) -> Result<Vec<Track>, TrackError>;

    async fn update_version_type(
        &self,
        id: &TrackId,
        version_type: Option<String>,
    ) -> Result<(), TrackError>;

    async fn update_version_group(
        &self,
        id: &TrackId,
        work_id: Option<WorkId>,
    ) -> Result<(), TrackError>;

    /// 软删除（移入回收站）
    async fn soft_delete(&self, id: &TrackId, deleted_by: &UserId) -> Result<(), TrackError>;
}
