use crate::api::SocialApi;
use crate::error::ApiError;
use crate::feed::{FeedKind, FeedTicket, LikeToggle};
use crate::models::{Comment, CommentId, Post, PostId, User, UserId};

use super::state::ViewId;
use super::KinetApp;

/// Results coming back from background tasks. Every spawned task sends
/// exactly one of these.
#[derive(Debug)]
pub enum AppMessage {
    CurrentUserLoaded(Result<User, ApiError>),
    FeedLoaded {
        ticket: FeedTicket,
        result: Result<Vec<Post>, ApiError>,
    },
    PostCreated(Result<Post, ApiError>),
    LikeToggled {
        toggle: LikeToggle,
        result: Result<(), ApiError>,
    },
    CommentAdded {
        origin: FeedKind,
        view: Option<ViewId>,
        post_id: PostId,
        result: Result<Option<Comment>, ApiError>,
    },
    CommentUpdated {
        view: ViewId,
        comment_id: CommentId,
        content: String,
        result: Result<Option<Comment>, ApiError>,
    },
    ProfileLoaded {
        user_id: UserId,
        result: Result<User, ApiError>,
    },
    FollowersLoaded {
        user_id: UserId,
        result: Result<Vec<User>, ApiError>,
    },
    FollowingLoaded {
        user_id: UserId,
        result: Result<Vec<User>, ApiError>,
    },
    FollowChanged {
        user_id: UserId,
        follow: bool,
        result: Result<(), ApiError>,
    },
    SearchCompleted {
        query: String,
        result: Result<Vec<User>, ApiError>,
    },
}

pub(super) fn process_message<A: SocialApi>(app: &mut KinetApp<A>, message: AppMessage) {
    app.in_flight = app.in_flight.saturating_sub(1);
    match message {
        AppMessage::CurrentUserLoaded(result) => app.handle_current_user_loaded(result),
        AppMessage::FeedLoaded { ticket, result } => app.handle_feed_loaded(ticket, result),
        AppMessage::PostCreated(result) => app.handle_post_created(result),
        AppMessage::LikeToggled { toggle, result } => app.handle_like_toggled(toggle, result),
        AppMessage::CommentAdded {
            origin,
            view,
            post_id,
            result,
        } => app.handle_comment_added(origin, view, post_id, result),
        AppMessage::CommentUpdated {
            view,
            comment_id,
            content,
            result,
        } => app.handle_comment_updated(view, comment_id, content, result),
        AppMessage::ProfileLoaded { user_id, result } => app.handle_profile_loaded(user_id, result),
        AppMessage::FollowersLoaded { user_id, result } => {
            app.handle_followers_loaded(user_id, result)
        }
        AppMessage::FollowingLoaded { user_id, result } => {
            app.handle_following_loaded(user_id, result)
        }
        AppMessage::FollowChanged {
            user_id,
            follow,
            result,
        } => app.handle_follow_changed(user_id, follow, result),
        AppMessage::SearchCompleted { query, result } => {
            app.handle_search_completed(query, result)
        }
    }
}
