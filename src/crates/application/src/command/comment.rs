use crate::store::entity_store::{not_found, EntityStore};
use crate::store::slice::{CommandResult, CommandResultExt, StaleSlice};
use domain::comment::Comment;
use domain::value::{CommentId, TrackId};

impl EntityStore {
    /// 发表评论，`timestamp_seconds` 为评论对应的音频时间点
    pub async fn add_comment(
        &mut self,
        track_id: &TrackId,
        content: &str,
        timestamp_seconds: Option<f64>,
    ) -> CommandResult<Comment> {
        let id = self.next_id().await.local()?;
        let comment = Comment::new(
            CommentId::from(id),
            track_id.clone(),
            self.viewer.clone(),
            content,
            timestamp_seconds,
        )
        .local()?;
        self.comments
            .entry(track_id.clone())
            .or_default()
            .push(comment.clone());

        self.repos
            .comments
            .insert(&comment)
            .await
            .stale(|| vec![StaleSlice::Comments(track_id.clone())])?;
        log::info!("[Comment] comment {} posted on track {}", comment.id, track_id);
        Ok(comment)
    }

    pub async fn edit_comment(
        &mut self,
        track_id: &TrackId,
        comment_id: &CommentId,
        content: &str,
    ) -> CommandResult<Comment> {
        let mut comment = self
            .comments(track_id)
            .iter()
            .find(|c| &c.id == comment_id)
            .cloned()
            .ok_or_else(|| not_found("Comment", comment_id))
            .local()?;
        comment.edit(content).local()?;
        if let Some(slot) = self
            .comments
            .get_mut(track_id)
            .and_then(|list| list.iter_mut().find(|c| &c.id == comment_id))
        {
            *slot = comment.clone();
        }

        self.repos
            .comments
            .update(&comment)
            .await
            .stale(|| vec![StaleSlice::Comments(track_id.clone())])?;
        log::info!("[Comment] comment {} edited", comment_id);
        Ok(comment)
    }

    pub async fn delete_comment(
        &mut self,
        track_id: &TrackId,
        comment_id: &CommentId,
    ) -> CommandResult<()> {
        if let Some(list) = self.comments.get_mut(track_id) {
            list.retain(|c| &c.id != comment_id);
        }
        self.repos
            .comments
            .delete(comment_id)
            .await
            .stale(|| vec![StaleSlice::Comments(track_id.clone())])?;
        log::info!("[Comment] comment {} deleted", comment_id);
        Ok(())
    }
}
