use domain::comment::CommentRepository;
use domain::rating::RatingRepository;
use domain::recycle_bin::RecycleBinRepository;
use domain::set_list::SetListRepository;
use domain::track::TrackRepository;
use domain::version_type::VersionTypeRepository;
use domain::work::WorkRepository;
use std::sync::Arc;

/// 远端持久化客户端的全部入口
#[derive(Clone)]
pub struct Repositories {
    pub tracks: Arc<dyn TrackRepository>,
    pub set_lists: Arc<dyn SetListRepository>,
    pub works: Arc<dyn WorkRepository>,
    pub ratings: Arc<dyn RatingRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub version_types: Arc<dyn VersionTypeRepository>,
    pub recycle_bin: Arc<dyn RecycleBinRepository>,
}
