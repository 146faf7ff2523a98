use super::InMemoryBackend;
use async_trait::async_trait;
use domain::rating::{Rating, RatingError, RatingRepository};
use domain::value::{TrackId, UserId};

pub struct InMemoryRatingRepository {
    backend: InMemoryBackend,
}

impl InMemoryRatingRepository {
    pub fn new(backend: InMemoryBackend) -> Self {
        Self { backend }
    }

    fn enter(&self, op: &'static str) -> Result<(), RatingError> {
        self.backend.enter(op).map_err(RatingError::DbErr)
    }
}

#[async_trait]
impl RatingRepository for InMemoryRatingRepository {
    async fn find_by_track(&self, track_id: &TrackId) -> Result<Vec<Rating>, RatingError> {
        self.enter("ratings.find_by_track")?;
        let mut rows = self.backend.ratings_of(track_id);
        rows.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(rows)
    }

    async fn upsert(&self, rating: &Rating) -> Result<(), RatingError> {
        self.enter("ratings.upsert")?;
        self.backend.insert_rating(rating.clone());
        Ok(())
    }

    async fn delete(&self, track_id: &TrackId, user_id: &UserId) -> Result<(), RatingError> {
        self.enter("ratings.delete")?;
        self.backend
            .tables
            .ratings
            .remove(&(track_id.clone(), user_id.clone()));
        Ok(())
    }
}
