use super::InMemoryBackend;
use async_trait::async_trait;
use domain::comment::{Comment, CommentError, CommentRepository};
use domain::value::{CommentId, TrackId};

pub struct InMemoryCommentRepository {
    backend: InMemoryBackend,
}

impl InMemoryCommentRepository {
    pub fn new(backend: InMemoryBackend) -> Self {
        Self { backend }
    }

    fn enter(&self, op: &'static str) -> Result<(), CommentError> {
        self.backend.enter(op).map_err(CommentError::DbErr)
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn find_by_track(&self, track_id: &TrackId) -> Result<Vec<Comment>, CommentError> {
        self.enter("comments.find_by_track")?;
        let mut comments: Vec<Comment> = self
            .backend
            .tables
            .comments
            .iter()
            .filter(|c| &c.track_id == track_id)
            .map(|c| c.clone())
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn insert(&self, comment: &Comment) -> Result<(), CommentError> {
        self.enter("comments.insert")?;
        self.backend.insert_comment(comment.clone());
        Ok(())
    }

    async fn update(&self, comment: &Comment) -> Result<(), CommentError> {
        self.enter("comments.update")?;
        let mut existing = self
            .backend
            .tables
            .comments
            .get_mut(&comment.id)
            .ok_or_else(|| CommentError::NotFound(comment.id.clone()))?;
        existing.content = comment.content.clone();
        existing.updated_at = comment.updated_at;
        Ok(())
    }

    async fn delete(&self, id: &CommentId) -> Result<(), CommentError> {
        self.enter("comments.delete")?;
        self.backend
            .tables
            .comments
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CommentError::NotFound(id.clone()))
    }
}
