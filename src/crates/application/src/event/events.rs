use crate::store::slice::StaleSlice;
use domain::rating::RatingSummary;
use domain::recycle_bin::RecycledKind;
use domain::value::{
    BandId, CommentId, SetListEntryId, SetListId, TrackId, VersionTypeId, WorkId,
};

/// 仪表盘命令完成后发布的事件
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    VersionTypeChanged {
        track_id: TrackId,
        version_type: Option<String>,
    },
    EntryAdded {
        set_list_id: SetListId,
        entry_id: SetListEntryId,
        track_id: TrackId,
    },
    EntryRemoved {
        set_list_id: SetListId,
        entry_id: SetListEntryId,
    },
    PositionsCommitted {
        set_list_id: SetListId,
        count: usize,
    },
    TrackRated {
        track_id: TrackId,
        summary: RatingSummary,
    },
    TracksDeleted {
        track_ids: Vec<TrackId>,
    },
    SetListCreated {
        set_list_id: SetListId,
    },
    SetListUpdated {
        set_list_id: SetListId,
    },
    SetListDeleted {
        set_list_id: SetListId,
    },
    WorkCreated {
        work_id: WorkId,
    },
    TracksMoved {
        work_id: WorkId,
        track_ids: Vec<TrackId>,
    },
    TrackDetached {
        work_id: WorkId,
        track_id: TrackId,
    },
    HeroChanged {
        work_id: WorkId,
        track_id: TrackId,
    },
    WorkUpdated {
        work_id: WorkId,
    },
    WorkDeleted {
        work_id: WorkId,
    },
    CommentPosted {
        track_id: TrackId,
        comment_id: CommentId,
    },
    CommentEdited {
        track_id: TrackId,
        comment_id: CommentId,
    },
    CommentDeleted {
        track_id: TrackId,
        comment_id: CommentId,
    },
    VersionTypeCreated {
        id: VersionTypeId,
    },
    ItemRestored {
        kind: RecycledKind,
        id: i64,
    },
    ItemPurged {
        kind: RecycledKind,
        id: i64,
    },
    RecycleBinEmptied {
        band_id: BandId,
        count: usize,
    },
    PlaybackStarted {
        track_id: TrackId,
    },
    SlicesResynced {
        slices: Vec<StaleSlice>,
    },
}

impl DashboardEvent {
    pub fn aggregate_id(&self) -> i64 {
        match self {
            DashboardEvent::VersionTypeChanged { track_id, .. }
            | DashboardEvent::EntryAdded { track_id, .. }
            | DashboardEvent::TrackRated { track_id, .. }
            | DashboardEvent::CommentPosted { track_id, .. }
            | DashboardEvent::CommentEdited { track_id, .. }
            | DashboardEvent::CommentDeleted { track_id, .. }
            | DashboardEvent::PlaybackStarted { track_id } => track_id.as_i64(),
            DashboardEvent::EntryRemoved { set_list_id, .. }
            | DashboardEvent::PositionsCommitted { set_list_id, .. }
            | DashboardEvent::SetListCreated { set_list_id }
            | DashboardEvent::SetListUpdated { set_list_id }
            | DashboardEvent::SetListDeleted { set_list_id } => set_list_id.as_i64(),
            DashboardEvent::WorkCreated { work_id }
            | DashboardEvent::TracksMoved { work_id, .. }
            | DashboardEvent::TrackDetached { work_id, .. }
            | DashboardEvent::HeroChanged { work_id, .. }
            | DashboardEvent::WorkUpdated { work_id }
            | DashboardEvent::WorkDeleted { work_id } => work_id.as_i64(),
            DashboardEvent::VersionTypeCreated { id } => id.as_i64(),
            DashboardEvent::ItemRestored { id, .. } | DashboardEvent::ItemPurged { id, .. } => *id,
            DashboardEvent::RecycleBinEmptied { band_id, .. } => band_id.as_i64(),
            DashboardEvent::TracksDeleted { track_ids } => {
                track_ids.first().map(|id| id.as_i64()).unwrap_or_default()
            }
            DashboardEvent::SlicesResynced { .. } => 0,
        }
    }
}
