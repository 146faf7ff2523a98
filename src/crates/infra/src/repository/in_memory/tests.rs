use super::InMemoryBackend;
use crate::config::AppConfigImpl;
use crate::event_bus::in_memory::{DashboardEventLog, InMemoryEventBus};
use crate::fixture::Fixture;
use crate::id_generator::SnowflakeIdGenerator;
use application::dashboard::Dashboard;
use application::error::AppError;
use application::event::event_bus::EventBus;
use application::event::events::DashboardEvent;
use application::notice::NoticeLevel;
use application::playback::{AudioEvent, AudioOutput, PlaybackState};
use application::command::work::AddTracksOutcome;
use application::store::selection::ClickModifier;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use domain::rating::RatingValue;
use domain::recycle_bin::RecycledKind;
use domain::track::Track;
use domain::value::{BandId, Scope, SetListId, TrackId, UserId, WorkId};
use domain::work::{SortDirection, WorkError, WorkSortKey};
use std::sync::Arc;

const FIXTURE: &str = r#"{
    "users": [{ "id": 1, "name": "Sam" }, { "id": 2, "name": "Alex" }],
    "version_types": [
        { "id": 1, "name": "Demo", "is_default": true },
        { "id": 2, "name": "Live", "is_default": true }
    ],
    "tracks": [
        { "id": 101, "title": "Song A (demo)", "file_url": "a1.mp3", "band_id": 1, "created_by": 1,
          "work_id": 10, "version_type": "Demo", "created_at": "2024-05-01T10:00:00" },
        { "id": 102, "title": "Song A (live)", "file_url": "a2.mp3", "band_id": 1, "created_by": 2,
          "work_id": 10, "version_type": "Live", "created_at": "2024-05-03T10:00:00" },
        { "id": 103, "title": "Song A (master)", "file_url": "a3.mp3", "band_id": 1, "created_by": 1,
          "work_id": 10, "version_type": "Master", "created_at": "2024-05-02T10:00:00" },
        { "id": 104, "title": "Song B", "file_url": "b.mp3", "band_id": 1, "created_by": 1,
          "work_id": 11, "created_at": "2024-05-04T10:00:00" },
        { "id": 105, "title": "Song C", "file_url": "c.mp3", "band_id": 1, "created_by": 2,
          "created_at": "2024-05-05T10:00:00" }
    ],
    "works": [
        { "id": 10, "name": "Song A", "band_id": 1, "created_by": 1, "hero_track_id": 101 },
        { "id": 11, "name": "Song B", "band_id": 1, "created_by": 1, "hero_track_id": 104 }
    ],
    "set_lists": [
        { "id": 20, "title": "Friday gig", "band_id": 1, "created_by": 1,
          "share_code": "AbC123xYz0", "tracks": [105, 104, 101] }
    ],
    "ratings": [{ "track_id": 101, "user_id": 2, "value": "liked" }]
}"#;

struct SilentOutput;

#[async_trait]
impl AudioOutput for SilentOutput {
    async fn load(&self, _url: &str) -> Result<(), AppError> {
        Ok(())
    }
    async fn play(&self) -> Result<(), AppError> {
        Ok(())
    }
    async fn pause(&self) -> Result<(), AppError> {
        Ok(())
    }
    async fn seek(&self, _seconds: f64) -> Result<(), AppError> {
        Ok(())
    }
    async fn stop(&self) -> Result<(), AppError> {
        Ok(())
    }
}

struct Harness {
    backend: InMemoryBackend,
    dashboard: Dashboard<InMemoryEventBus>,
    events: Arc<DashboardEventLog>,
}

fn band() -> Scope {
    Scope::Band(BandId::from(1))
}

fn ids(raw: &[i64]) -> Vec<TrackId> {
    raw.iter().copied().map(TrackId::from).collect()
}

fn visible(dashboard: &Dashboard<InMemoryEventBus>) -> Vec<TrackId> {
    dashboard
        .track_rows(&band())
        .iter()
        .map(|row| TrackId::from(row.id))
        .collect()
}

/// 只建好 Dashboard，不预先加载任何数据
async fn cold_harness() -> Harness {
    let backend = InMemoryBackend::new();
    Fixture::from_json(FIXTURE).unwrap().seed(&backend).unwrap();

    let events = Arc::new(DashboardEventLog::new());
    let mut bus = InMemoryEventBus::new();
    bus.subscribe::<DashboardEvent>(events.clone()).await;

    let dashboard = Dashboard::new(
        backend.repositories(),
        Arc::new(SnowflakeIdGenerator::new(1).unwrap()),
        Arc::new(bus),
        Arc::new(SilentOutput),
        &AppConfigImpl::default(),
    );
    Harness {
        backend,
        dashboard,
        events,
    }
}

async fn harness() -> Harness {
    let mut h = cold_harness().await;
    h.dashboard.load_scope(&band()).await.unwrap();
    h
}

#[tokio::test]
async fn test_load_scope_lists_newest_first() {
    let h = harness().await;
    assert_eq!(visible(&h.dashboard), ids(&[105, 104, 102, 103, 101]));
    let summaries = h.dashboard.set_list_summaries(&band());
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].title, "Friday gig");
}

#[tokio::test]
async fn test_failed_version_type_update_is_rolled_back_by_resync() {
    let mut h = harness().await;
    h.backend.fail_next("tracks.update_version_type", 1);

    let result = h
        .dashboard
        .set_version_type(&TrackId::from(105), Some("Rehearsal"))
        .await;
    assert!(matches!(result, Err(AppError::TrackError(_))));

    let track = h.dashboard.store().track(&TrackId::from(105)).unwrap();
    assert_eq!(track.version_type, None);
    let notice = h.dashboard.notices().latest(Utc::now().naive_utc()).cloned().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(h
        .events
        .events()
        .await
        .iter()
        .any(|e| matches!(e, DashboardEvent::SlicesResynced { .. })));
}

#[tokio::test]
async fn test_version_type_update_is_persisted() {
    let mut h = harness().await;
    let value = h
        .dashboard
        .set_version_type(&TrackId::from(105), Some("  Rehearsal "))
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("Rehearsal"));
    let stored = h.backend.track(&TrackId::from(105)).unwrap();
    assert_eq!(stored.version_type.as_deref(), Some("Rehearsal"));
    let notice = h.dashboard.notices().latest(Utc::now().naive_utc()).cloned().unwrap();
    assert_eq!(notice.level, NoticeLevel::Success);
}

#[tokio::test]
async fn test_success_notice_expires() {
    let mut h = harness().await;
    h.dashboard
        .set_version_type(&TrackId::from(104), Some("Live"))
        .await
        .unwrap();
    let later = Utc::now().naive_utc() + Duration::milliseconds(3500);
    assert!(h.dashboard.notices().visible(later).is_empty());
}

#[tokio::test]
async fn test_shift_click_selects_visible_range() {
    let mut h = harness().await;
    let shown = visible(&h.dashboard);
    h.dashboard
        .click_track(&TrackId::from(101), ClickModifier::None, &shown);
    h.dashboard
        .click_track(&TrackId::from(104), ClickModifier::Range, &shown);
    assert_eq!(
        h.dashboard.selection().selected_in_order(&shown),
        ids(&[104, 102, 103, 101])
    );
}

#[tokio::test]
async fn test_shift_click_after_meta_click_anchor() {
    let mut h = harness().await;
    let shown = visible(&h.dashboard);
    h.dashboard
        .click_track(&TrackId::from(105), ClickModifier::Toggle, &shown);
    h.dashboard
        .click_track(&TrackId::from(102), ClickModifier::Toggle, &shown);
    h.dashboard
        .click_track(&TrackId::from(105), ClickModifier::Toggle, &shown);
    h.dashboard
        .click_track(&TrackId::from(101), ClickModifier::Range, &shown);
    assert_eq!(
        h.dashboard.selection().selected_in_order(&shown),
        ids(&[102, 103, 101])
    );
}

#[tokio::test]
async fn test_rating_same_value_twice_removes_it() {
    let mut h = harness().await;
    let track = TrackId::from(101);

    let summary = h.dashboard.rate(&track, RatingValue::Loved).await.unwrap();
    assert_eq!(summary.personal, Some(RatingValue::Loved));
    assert_eq!(summary.total.total(), 2);

    let summary = h.dashboard.rate(&track, RatingValue::Loved).await.unwrap();
    assert_eq!(summary.personal, None);
    assert_eq!(summary.total.liked, 1);
    assert_eq!(summary.total.total(), 1);
    assert_eq!(h.backend.ratings_of(&track).len(), 1);
}

#[tokio::test]
async fn test_changing_rating_keeps_one_row() {
    let mut h = harness().await;
    let track = TrackId::from(102);

    h.dashboard.rate(&track, RatingValue::Liked).await.unwrap();
    let summary = h.dashboard.rate(&track, RatingValue::Loved).await.unwrap();

    assert_eq!(summary.personal, Some(RatingValue::Loved));
    assert_eq!(summary.total.total(), 1);
    assert_eq!(summary.total.loved, 1);
    assert_eq!(h.backend.ratings_of(&track).len(), 1);
}

#[tokio::test]
async fn test_reorder_save_is_dense_and_repeatable() {
    let mut h = harness().await;
    let set_list = SetListId::from(20);
    h.dashboard.open_set_list(&set_list).await.unwrap();

    h.dashboard.begin_reorder(&set_list).unwrap();
    h.dashboard.drag_over(2, 0).unwrap();
    let saved = h.dashboard.save_reorder().await.unwrap();
    let order: Vec<i64> = saved.iter().map(|e| e.track_id.as_i64()).collect();
    assert_eq!(order, vec![101, 105, 104]);
    let positions: Vec<i32> = saved.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![1, 2, 3]);

    h.dashboard.begin_reorder(&set_list).unwrap();
    let again = h.dashboard.save_reorder().await.unwrap();
    assert_eq!(again, saved);
    assert!(!h.dashboard.reorder().is_active());
}

#[tokio::test]
async fn test_reorder_partial_failure_reconciles_with_server() {
    let mut h = harness().await;
    let set_list = SetListId::from(20);
    h.dashboard.open_set_list(&set_list).await.unwrap();
    h.backend.fail_next("set_lists.update_entry_position", 1);

    h.dashboard.begin_reorder(&set_list).unwrap();
    h.dashboard.drag_over(0, 2).unwrap();
    let result = h.dashboard.save_reorder().await;
    assert!(matches!(
        result,
        Err(AppError::PartialFailure { failed: 1, total: 3 })
    ));
    let cached = h.dashboard.store().entries(&set_list).to_vec();
    assert_eq!(cached, h.backend.entries_of(&set_list));
}

#[tokio::test]
async fn test_duplicate_entry_rejected_without_network() {
    let mut h = harness().await;
    let set_list = SetListId::from(20);
    h.dashboard.open_set_list(&set_list).await.unwrap();
    let before = h.backend.total_calls();

    let result = h
        .dashboard
        .add_to_set_list(&set_list, &TrackId::from(104))
        .await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert_eq!(h.backend.total_calls(), before);
}

#[tokio::test]
async fn test_add_entry_appends_at_end() {
    let mut h = harness().await;
    let set_list = SetListId::from(20);
    let entry = h
        .dashboard
        .add_to_set_list(&set_list, &TrackId::from(102))
        .await
        .unwrap();
    assert_eq!(entry.position, 4);
    assert_eq!(h.backend.entries_of(&set_list).len(), 4);
}

#[tokio::test]
async fn test_blank_set_list_title_never_reaches_backend() {
    let mut h = harness().await;
    let before = h.backend.total_calls();
    h.dashboard.open_set_list_dialog();
    h.dashboard.set_list_dialog().set_title("   ");

    let created = h.dashboard.submit_set_list_dialog(&band()).await.unwrap();
    assert!(created.is_none());
    assert!(h.dashboard.set_list_dialog().error().is_some());
    assert!(h.dashboard.set_list_dialog().is_open());
    assert_eq!(h.backend.total_calls(), before);
}

#[tokio::test]
async fn test_set_list_dialog_creates_set_list() {
    let mut h = harness().await;
    h.dashboard.open_set_list_dialog();
    h.dashboard.set_list_dialog().set_title("Saturday");

    let created = h
        .dashboard
        .submit_set_list_dialog(&band())
        .await
        .unwrap()
        .unwrap();
    assert!(!h.dashboard.set_list_dialog().is_open());
    assert!(h.backend.set_list(&created.id).is_some());
    let titles: Vec<String> = h
        .dashboard
        .set_list_summaries(&band())
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["Saturday".to_string(), "Friday gig".to_string()]);
}

#[tokio::test]
async fn test_work_versions_hero_first() {
    let mut h = harness().await;
    let detail = h.dashboard.open_work(&WorkId::from(10), None).await.unwrap();
    let order: Vec<i64> = detail.versions.iter().map(|v| v.id).collect();
    assert_eq!(order, vec![101, 102, 103]);
    assert!(detail.versions[0].is_hero);
    assert_eq!(detail.summary.version_count, 3);

    let live = h
        .dashboard
        .open_work(&WorkId::from(10), Some("live"))
        .await
        .unwrap();
    assert_eq!(live.versions.len(), 1);
    assert_eq!(live.version_types, vec!["Demo", "Live", "Master"]);
}

#[tokio::test]
async fn test_set_hero_reorders_versions() {
    let mut h = harness().await;
    let work = WorkId::from(10);
    h.dashboard.open_work(&work, None).await.unwrap();
    h.dashboard.set_hero(&work, &TrackId::from(103)).await.unwrap();

    let order: Vec<i64> = h
        .dashboard
        .store()
        .work_versions(&work)
        .iter()
        .map(|t| t.id.as_i64())
        .collect();
    assert_eq!(order, vec![103, 102, 101]);
    assert_eq!(
        h.backend.work(&work).unwrap().hero_track_id,
        Some(TrackId::from(103))
    );
}

#[tokio::test]
async fn test_set_hero_rejects_non_member_without_network() {
    let mut h = harness().await;
    let work = WorkId::from(10);
    h.dashboard.open_work(&work, None).await.unwrap();
    let before = h.backend.total_calls();

    let result = h.dashboard.set_hero(&work, &TrackId::from(105)).await;
    assert!(matches!(
        result,
        Err(AppError::WorkError(WorkError::HeroNotMember { .. }))
    ));
    assert_eq!(h.backend.total_calls(), before);
}

#[tokio::test]
async fn test_ungrouped_tracks_move_without_confirmation() {
    let mut h = harness().await;
    let outcome = h
        .dashboard
        .add_tracks_to_work(&WorkId::from(11), &ids(&[105]))
        .await
        .unwrap();
    assert_eq!(outcome, AddTracksOutcome::Added(ids(&[105])));
    assert_eq!(
        h.backend.track(&TrackId::from(105)).unwrap().version_group_id,
        Some(WorkId::from(11))
    );
}

#[tokio::test]
async fn test_grouped_track_needs_confirmation_before_move() {
    let mut h = harness().await;
    let target = WorkId::from(11);
    let outcome = h
        .dashboard
        .add_tracks_to_work(&target, &ids(&[101]))
        .await
        .unwrap();
    let AddTracksOutcome::NeedsConfirmation(pending) = outcome else {
        panic!("expected confirmation");
    };
    assert_eq!(pending.conflicting_tracks.len(), 1);
    assert_eq!(pending.conflicting_tracks[0].current_work_name.as_deref(), Some("Song A"));
    assert_eq!(
        h.backend.track(&TrackId::from(101)).unwrap().version_group_id,
        Some(WorkId::from(10))
    );

    let moved = h.dashboard.confirm_move().await.unwrap();
    assert_eq!(moved, ids(&[101]));
    assert!(h.dashboard.works().pending().is_none());

    let counts: Vec<(i64, usize)> = h
        .dashboard
        .work_summaries(&band())
        .iter()
        .map(|w| (w.id, w.version_count))
        .collect();
    assert!(counts.contains(&(10, 2)));
    assert!(counts.contains(&(11, 2)));
    // 被移走的是原 Work 的主打版本
    assert_eq!(h.backend.work(&WorkId::from(10)).unwrap().hero_track_id, None);
}

#[tokio::test]
async fn test_moving_hero_clears_uncached_source_work() {
    let mut h = cold_harness().await;
    h.dashboard.open_work(&WorkId::from(11), None).await.unwrap();

    let outcome = h
        .dashboard
        .add_tracks_to_work(&WorkId::from(11), &ids(&[101]))
        .await
        .unwrap();
    assert!(matches!(outcome, AddTracksOutcome::NeedsConfirmation(_)));
    h.dashboard.confirm_move().await.unwrap();

    assert_eq!(
        h.backend.track(&TrackId::from(101)).unwrap().version_group_id,
        Some(WorkId::from(11))
    );
    assert_eq!(h.backend.work(&WorkId::from(10)).unwrap().hero_track_id, None);
    assert!(h.dashboard.store().work(&WorkId::from(10)).is_none());
}

#[tokio::test]
async fn test_failed_move_resyncs_source_scope() {
    let mut h = harness().await;
    let personal = Scope::Personal(UserId::from(1));
    h.backend.insert_track(Track::new(
        TrackId::from(301),
        "Voice memo",
        "memo.m4a",
        None,
        UserId::from(1),
    ));
    h.dashboard.load_scope(&personal).await.unwrap();
    h.backend.fail_next("tracks.update_version_group", 1);

    let result = h
        .dashboard
        .add_tracks_to_work(&WorkId::from(11), &ids(&[301]))
        .await;
    assert!(matches!(
        result,
        Err(AppError::PartialFailure { failed: 1, total: 1 })
    ));

    let memo = &h.dashboard.store().tracks(&personal)[0];
    assert_eq!(memo.id, TrackId::from(301));
    assert_eq!(memo.version_group_id, None);
}

#[tokio::test]
async fn test_cancelled_move_changes_nothing() {
    let mut h = harness().await;
    h.dashboard
        .add_tracks_to_work(&WorkId::from(11), &ids(&[102]))
        .await
        .unwrap();
    h.dashboard.cancel_move();
    assert!(h.dashboard.works().pending().is_none());
    assert_eq!(
        h.backend.track(&TrackId::from(102)).unwrap().version_group_id,
        Some(WorkId::from(10))
    );
}

#[tokio::test]
async fn test_work_sort_by_version_count() {
    let mut h = harness().await;
    let sort = h.dashboard.toggle_work_sort(WorkSortKey::VersionCount);
    assert_eq!(sort.direction, SortDirection::Descending);
    let names: Vec<String> = h
        .dashboard
        .work_summaries(&band())
        .into_iter()
        .map(|w| w.name)
        .collect();
    assert_eq!(names, vec!["Song A", "Song B"]);

    let sort = h.dashboard.toggle_work_sort(WorkSortKey::VersionCount);
    assert_eq!(sort.direction, SortDirection::Ascending);
    let first = h.dashboard.work_summaries(&band()).remove(0);
    assert_eq!(first.name, "Song B");
}

#[tokio::test]
async fn test_deleted_work_restored_from_recycle_bin() {
    let mut h = harness().await;
    let work = WorkId::from(11);
    let band_id = BandId::from(1);
    h.dashboard.delete_work(&work).await.unwrap();

    assert!(h.dashboard.store().work(&work).is_none());
    let track = h.dashboard.store().track(&TrackId::from(104)).unwrap();
    assert_eq!(track.version_group_id, None);

    let rows = h.dashboard.load_recycle_bin(&band_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].days_remaining, 30);

    h.dashboard
        .restore_item(&band_id, RecycledKind::Work, 11)
        .await
        .unwrap();
    assert!(h.dashboard.store().work(&work).is_some());
    let track = h.dashboard.store().track(&TrackId::from(104)).unwrap();
    assert_eq!(track.version_group_id, Some(work));
    assert!(h.dashboard.store().recycle_bin(&band_id).is_empty());
}

#[tokio::test]
async fn test_recycle_bin_shows_who_deleted() {
    let mut h = harness().await;
    let shown = visible(&h.dashboard);
    // 105 由 Alex 上传，当前用户 Sam 删除
    h.dashboard
        .click_track(&TrackId::from(105), ClickModifier::None, &shown);
    h.dashboard.delete_selected(&shown).await.unwrap();

    let rows = h.dashboard.load_recycle_bin(&BandId::from(1)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].deleted_by, 1);
    assert_eq!(rows[0].deleted_by_name.as_deref(), Some("Sam"));
}

#[tokio::test]
async fn test_partial_delete_reports_and_resyncs() {
    let mut h = harness().await;
    let shown = visible(&h.dashboard);
    h.dashboard.select_all(&shown);
    h.backend.fail_next("tracks.soft_delete", 2);

    let result = h.dashboard.delete_selected(&shown).await;
    assert!(matches!(
        result,
        Err(AppError::PartialFailure { failed: 2, total: 5 })
    ));
    assert!(h.dashboard.selection().is_empty());
    // 重新拉取后只剩删除失败的两首
    assert_eq!(visible(&h.dashboard).len(), 2);
}

#[tokio::test]
async fn test_comments_and_version_types() {
    let mut h = harness().await;
    let track = TrackId::from(105);
    let comment = h
        .dashboard
        .add_comment(&track, "Tempo drags here", Some(42.0))
        .await
        .unwrap();
    h.dashboard
        .edit_comment(&track, &comment.id, "Tempo drags in the bridge")
        .await
        .unwrap();
    let comments = h
        .dashboard
        .load_comments(&track, domain::comment::CommentSort::Timestamp)
        .await
        .unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].content, "Tempo drags in the bridge");

    let band_id = BandId::from(1);
    h.dashboard.create_version_type(&band_id, "Acoustic").await.unwrap();
    let duplicate = h.dashboard.create_version_type(&band_id, "demo").await;
    assert!(duplicate.is_err());
    // 校验错误只在表单内显示
    assert!(h
        .dashboard
        .notices()
        .visible(Utc::now().naive_utc())
        .iter()
        .all(|n| n.level != NoticeLevel::Error));
}

#[tokio::test]
async fn test_playback_auto_advances_in_list_order() {
    let mut h = harness().await;
    h.dashboard.play(&TrackId::from(104)).await.unwrap();
    h.dashboard.handle_audio_event(AudioEvent::CanPlay).await.unwrap();
    h.dashboard.handle_audio_event(AudioEvent::Ended).await.unwrap();
    assert_eq!(
        h.dashboard.playback().state(),
        &PlaybackState::Loading(TrackId::from(102))
    );
    let started: Vec<DashboardEvent> = h
        .events
        .events()
        .await
        .into_iter()
        .filter(|e| matches!(e, DashboardEvent::PlaybackStarted { .. }))
        .collect();
    assert_eq!(started.len(), 2);
}

#[tokio::test]
async fn test_share_link_and_deep_link() {
    let h = harness().await;
    let link = h.dashboard.share_link(&SetListId::from(20)).unwrap();
    assert_eq!(link, "https://coretet.app/playlist/AbC123xYz0");
    assert!(h.dashboard.open_link("coretet://playlist/AbC123xYz0").is_ok());
}
