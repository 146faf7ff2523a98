use domain::comment::CommentError;
use domain::rating::RatingError;
use domain::recycle_bin::RecycleBinError;
use domain::set_list::SetListError;
use domain::track::TrackError;
use domain::version_type::VersionTypeError;
use domain::work::WorkError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Repository error: {0}: {1}")]
    RepositoryError(String, String),
    #[error("Aggregate not found: {0}: {1}")]
    AggregateNotFound(String, String),
    #[error("{failed} of {total} updates failed")]
    PartialFailure { failed: usize, total: usize },
    #[error("Track error: {0}")]
    TrackError(#[from] TrackError),
    #[error("Work error: {0}")]
    WorkError(#[from] WorkError),
    #[error("Rating error: {0}")]
    RatingError(#[from] RatingError),
    #[error("Comment error: {0}")]
    CommentError(#[from] CommentError),
    #[error("Version type error: {0}")]
    VersionTypeError(#[from] VersionTypeError),
    #[error("Recycle bin error: {0}")]
    RecycleBinError(#[from] RecycleBinError),
    #[error("Playback error: {0}")]
    PlaybackError(String),
    #[error("Invalid link: {0}")]
    InvalidLink(String),
    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl AppError {
    /// 本地校验失败（没有发出任何网络请求）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::InvalidInput(_)
                | AppError::WorkError(WorkError::ValidationErr(_))
                | AppError::WorkError(WorkError::HeroNotMember { .. })
                | AppError::CommentError(CommentError::ValidationErr(_))
                | AppError::VersionTypeError(VersionTypeError::ValidationErr(_))
                | AppError::VersionTypeError(VersionTypeError::Duplicate(_))
        )
    }
}

impl From<SetListError> for AppError {
    fn from(e: SetListError) -> Self {
        match e {
            SetListError::DbErr(msg) => AppError::RepositoryError("SetList".to_string(), msg),
            SetListError::ValidationErr(msg) => AppError::InvalidInput(msg),
            SetListError::NotFound(id) => {
                AppError::AggregateNotFound("SetList".to_string(), id.to_string())
            }
            SetListError::EntryNotFound(id) => {
                AppError::AggregateNotFound("SetListEntry".to_string(), id.to_string())
            }
            SetListError::OtherErr(msg) => AppError::UnknownError(msg),
        }
    }
}
