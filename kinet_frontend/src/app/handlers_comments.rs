use log::{debug, error, info};

use crate::api::SocialApi;
use crate::error::ApiError;
use crate::feed::FeedKind;
use crate::models::{Comment, CommentId, PostId};

use super::state::ViewId;
use super::KinetApp;

impl<A: SocialApi> KinetApp<A> {
    pub(super) fn handle_comment_added(
        &mut self,
        origin: FeedKind,
        view: Option<ViewId>,
        post_id: PostId,
        result: Result<Option<Comment>, ApiError>,
    ) {
        if let Some(view) = view {
            match self.comment_views.get_mut(&view) {
                Some(open) => open.thread.comment_added(result.as_ref().map(Clone::clone)),
                None => debug!("{view} closed before comment on post {post_id} settled"),
            }
        }
        match result {
            Ok(_) => {
                info!("added comment to post {post_id}");
                self.refresh_after_comment(&origin);
            }
            Err(err) => {
                error!("failed to add comment to post {post_id}: {err}");
                if view.is_none() {
                    self.info_banner = Some("Failed to add comment.".into());
                }
            }
        }
    }

    pub(super) fn handle_comment_updated(
        &mut self,
        view: ViewId,
        comment_id: CommentId,
        content: String,
        result: Result<Option<Comment>, ApiError>,
    ) {
        if let Err(err) = &result {
            error!("failed to update comment {comment_id}: {err}");
        }
        let Some(open) = self.comment_views.get_mut(&view) else {
            debug!("{view} closed before edit of comment {comment_id} settled");
            return;
        };
        open.thread
            .edit_saved(comment_id, &content, result.as_ref().map(Clone::clone));
    }

    /// The origin feed is reloaded so every copy of the post picks up the
    /// server's comment list.
    fn refresh_after_comment(&mut self, origin: &FeedKind) {
        if !self.refresh(origin) {
            debug!("{origin} feed closed; skipping refresh after comment");
        }
    }
}
