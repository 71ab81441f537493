use std::fmt;

use crate::feed::{CommentThread, FeedKind, FeedStore};
use crate::models::{User, UserId};

#[derive(Default)]
pub struct CreatePostState {
    pub content: String,
    pub submitting: bool,
    pub error: Option<String>,
}

/// Handle for an open comment thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(pub(super) u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

pub struct CommentView {
    /// Feed whose refreshes keep this thread in sync.
    pub origin: FeedKind,
    pub thread: CommentThread,
}

pub struct ProfileState {
    pub user_id: UserId,
    pub user: Option<User>,
    pub user_loading: bool,
    pub error: Option<String>,
    pub posts: FeedStore,
    pub followers: Vec<User>,
    pub followers_loading: bool,
    pub following: Vec<User>,
    pub following_loading: bool,
    pub is_following: bool,
    pub follow_in_flight: bool,
}

impl ProfileState {
    pub fn new(user_id: UserId) -> Self {
        Self {
            posts: FeedStore::new(FeedKind::User(user_id.clone())),
            user_id,
            user: None,
            user_loading: false,
            error: None,
            followers: Vec::new(),
            followers_loading: false,
            following: Vec::new(),
            following_loading: false,
            is_following: false,
            follow_in_flight: false,
        }
    }

    pub fn follower_count(&self) -> usize {
        self.followers.len()
    }
}

#[derive(Default)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<User>,
    pub is_loading: bool,
    pub error: Option<String>,
}
