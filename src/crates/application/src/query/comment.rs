use crate::store::entity_store::EntityStore;
use domain::comment::{sort_comments, Comment, CommentSort};
use domain::value::TrackId;

pub fn sorted_comments(store: &EntityStore, track_id: &TrackId, sort: CommentSort) -> Vec<Comment> {
    let mut comments = store.comments(track_id).to_vec();
    sort_comments(&mut comments, sort);
    comments
}
