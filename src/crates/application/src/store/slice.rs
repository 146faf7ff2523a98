use crate::error::AppError;
use domain::value::{BandId, Scope, SetListId, TrackId, WorkId};
use std::fmt;

/// 实体缓存中可以单独重新拉取的一块数据
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StaleSlice {
    Tracks(Scope),
    SetLists(Scope),
    PlaylistEntries(SetListId),
    Works(Scope),
    WorkVersions(WorkId),
    Ratings(TrackId),
    Comments(TrackId),
    VersionTypes(Option<BandId>),
    RecycleBin(BandId),
}

impl fmt::Display for StaleSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleSlice::Tracks(scope) => write!(f, "tracks({})", scope),
            StaleSlice::SetLists(scope) => write!(f, "set_lists({})", scope),
            StaleSlice::PlaylistEntries(id) => write!(f, "playlist_entries({})", id),
            StaleSlice::Works(scope) => write!(f, "works({})", scope),
            StaleSlice::WorkVersions(id) => write!(f, "work_versions({})", id),
            StaleSlice::Ratings(id) => write!(f, "ratings({})", id),
            StaleSlice::Comments(id) => write!(f, "comments({})", id),
            StaleSlice::VersionTypes(Some(band)) => write!(f, "version_types({})", band),
            StaleSlice::VersionTypes(None) => write!(f, "version_types(global)"),
            StaleSlice::RecycleBin(band) => write!(f, "recycle_bin({})", band),
        }
    }
}

/// 命令失败：错误本身，加上乐观更新后已与服务端不一致的数据块
///
/// `stale` 为空表示失败发生在本地校验阶段，缓存没有被改动。
#[derive(Debug)]
pub struct CommandFailure {
    pub error: AppError,
    pub stale: Vec<StaleSlice>,
}

impl CommandFailure {
    pub fn new(error: impl Into<AppError>, stale: Vec<StaleSlice>) -> Self {
        Self {
            error: error.into(),
            stale,
        }
    }

    pub fn local(error: impl Into<AppError>) -> Self {
        Self::new(error, Vec::new())
    }
}

impl From<AppError> for CommandFailure {
    fn from(error: AppError) -> Self {
        Self::local(error)
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

pub type CommandResult<T> = Result<T, CommandFailure>;

/// 把仓储/领域错误转换成 `CommandFailure`
pub trait CommandResultExt<T> {
    /// 本地失败，缓存未改动
    fn local(self) -> CommandResult<T>;

    /// 乐观更新之后的失败，附带需要重新拉取的数据块
    fn stale<F>(self, slices: F) -> CommandResult<T>
    where
        F: FnOnce() -> Vec<StaleSlice>;
}

impl<T, E: Into<AppError>> CommandResultExt<T> for Result<T, E> {
    fn local(self) -> CommandResult<T> {
        self.map_err(CommandFailure::local)
    }

    fn stale<F>(self, slices: F) -> CommandResult<T>
    where
        F: FnOnce() -> Vec<StaleSlice>,
    {
        self.map_err(|e| CommandFailure::new(e, slices()))
    }
}
