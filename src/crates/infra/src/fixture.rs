use crate::repository::in_memory::InMemoryBackend;
use chrono::{NaiveDateTime, Utc};
use domain::comment::Comment;
use domain::rating::{Rating, RatingValue};
use domain::set_list::{SetList, SetListEntry};
use domain::track::Track;
use domain::value::{
    BandId, CommentId, SetListEntryId, SetListId, TrackId, UserId, VersionTypeId, WorkId,
};
use domain::version_type::VersionType;
use domain::work::Work;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Failed to read fixture: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse fixture: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid fixture: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct FixtureUser {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FixtureVersionType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub band_id: Option<i64>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct FixtureTrack {
    pub id: i64,
    pub title: String,
    pub file_url: String,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub folder_path: Option<String>,
    #[serde(default)]
    pub version_type: Option<String>,
    #[serde(default)]
    pub work_id: Option<i64>,
    #[serde(default)]
    pub band_id: Option<i64>,
    pub created_by: i64,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureWork {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hero_track_id: Option<i64>,
    #[serde(default)]
    pub band_id: Option<i64>,
    pub created_by: i64,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureSetList {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub band_id: Option<i64>,
    pub created_by: i64,
    #[serde(default)]
    pub share_code: Option<String>,
    /// 按顺序排列的音轨ID
    #[serde(default)]
    pub tracks: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureRating {
    pub track_id: i64,
    pub user_id: i64,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct FixtureComment {
    pub id: i64,
    pub track_id: i64,
    pub user_id: i64,
    pub content: String,
    #[serde(default)]
    pub timestamp_seconds: Option<f64>,
}

/// 演示和测试用的初始数据（JSON）
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub users: Vec<FixtureUser>,
    pub version_types: Vec<FixtureVersionType>,
    pub tracks: Vec<FixtureTrack>,
    pub works: Vec<FixtureWork>,
    pub set_lists: Vec<FixtureSetList>,
    pub ratings: Vec<FixtureRating>,
    pub comments: Vec<FixtureComment>,
}

impl Fixture {
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// 写入后端；歌单条目的ID为 `歌单ID * 1000 + 位置`
    pub fn seed(&self, backend: &InMemoryBackend) -> Result<(), FixtureError> {
        let now = Utc::now().naive_utc();
        for user in &self.users {
            backend.set_user_name(UserId::from(user.id), &user.name);
        }
        for t in &self.version_types {
            backend.insert_version_type(VersionType {
                id: VersionTypeId::from(t.id),
                name: t.name.clone(),
                band_id: t.band_id.map(BandId::from),
                is_default: t.is_default,
            });
        }
        for t in &self.tracks {
            let mut track = Track::new(
                TrackId::from(t.id),
                &t.title,
                &t.file_url,
                t.band_id.map(BandId::from),
                UserId::from(t.created_by),
            );
            track.duration_seconds = t.duration_seconds;
            track.folder_path = t.folder_path.clone();
            track.set_version_type(t.version_type.as_deref());
            track.version_group_id = t.work_id.map(WorkId::from);
            track.created_at = t.created_at.unwrap_or(now);
            backend.insert_track(track);
        }
        for w in &self.works {
            let mut work = Work::new(
                WorkId::from(w.id),
                &w.name,
                w.band_id.map(BandId::from),
                UserId::from(w.created_by),
            )
            .map_err(|e| FixtureError::Invalid(e.to_string()))?;
            work.update_description(w.description.as_deref());
            work.hero_track_id = w.hero_track_id.map(TrackId::from);
            if let Some(created_at) = w.created_at {
                work.created_at = created_at;
                work.updated_at = created_at;
            }
            backend.insert_work(work);
        }
        for l in &self.set_lists {
            let mut set_list = SetList::new(
                SetListId::from(l.id),
                &l.title,
                l.description.as_deref(),
                l.band_id.map(BandId::from),
                UserId::from(l.created_by),
            )
            .map_err(|e| FixtureError::Invalid(e.to_string()))?;
            set_list.share_code = l.share_code.clone();
            for (index, track_id) in l.tracks.iter().enumerate() {
                let position = index as i32 + 1;
                backend.insert_entry(SetListEntry::new(
                    SetListEntryId::from(l.id * 1000 + i64::from(position)),
                    set_list.id.clone(),
                    TrackId::from(*track_id),
                    position,
                    set_list.created_by.clone(),
                ));
            }
            backend.insert_set_list(set_list);
        }
        for r in &self.ratings {
            let value: RatingValue = r
                .value
                .parse()
                .map_err(|e: domain::rating::RatingError| FixtureError::Invalid(e.to_string()))?;
            backend.insert_rating(Rating::new(
                TrackId::from(r.track_id),
                UserId::from(r.user_id),
                value,
            ));
        }
        for c in &self.comments {
            let comment = Comment::new(
                CommentId::from(c.id),
                TrackId::from(c.track_id),
                UserId::from(c.user_id),
                &c.content,
                c.timestamp_seconds,
            )
            .map_err(|e| FixtureError::Invalid(e.to_string()))?;
            backend.insert_comment(comment);
        }
        log::info!(
            "[Fixture] seeded {} tracks, {} works, {} set lists",
            self.tracks.len(),
            self.works.len(),
            self.set_lists.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "users": [{ "id": 1, "name": "Sam" }],
        "tracks": [
            { "id": 10, "title": "Intro", "file_url": "a.mp3", "band_id": 5, "created_by": 1,
              "version_type": "Demo", "work_id": 3 },
            { "id": 11, "title": "Outro", "file_url": "b.mp3", "band_id": 5, "created_by": 1 }
        ],
        "works": [{ "id": 3, "name": "Intro", "band_id": 5, "created_by": 1, "hero_track_id": 10 }],
        "set_lists": [{ "id": 7, "title": "Gig", "band_id": 5, "created_by": 1, "tracks": [11, 10] }],
        "ratings": [{ "track_id": 10, "user_id": 1, "value": "love" }]
    }"#;

    #[test]
    fn test_seed_populates_backend() {
        let backend = InMemoryBackend::new();
        Fixture::from_json(JSON).unwrap().seed(&backend).unwrap();

        let track = backend.track(&TrackId::from(10)).unwrap();
        assert_eq!(track.version_type.as_deref(), Some("Demo"));
        assert_eq!(track.version_group_id, Some(WorkId::from(3)));

        let entries = backend.entries_of(&SetListId::from(7));
        let order: Vec<i64> = entries.iter().map(|e| e.track_id.as_i64()).collect();
        assert_eq!(order, vec![11, 10]);
        assert_eq!(entries[0].id, SetListEntryId::from(7001));

        assert_eq!(backend.ratings_of(&TrackId::from(10))[0].value, RatingValue::Loved);
    }

    #[test]
    fn test_unknown_rating_rejected() {
        let json = r#"{ "ratings": [{ "track_id": 1, "user_id": 1, "value": "meh" }] }"#;
        let result = Fixture::from_json(json).unwrap().seed(&InMemoryBackend::new());
        assert!(matches!(result, Err(FixtureError::Invalid(_))));
    }
}
