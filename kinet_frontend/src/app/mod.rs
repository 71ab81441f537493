use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::api::{ApiClient, SocialApi};
use crate::feed::{CommentThread, FeedKind, FeedStore};
use crate::session::Session;

mod handlers_comments;
mod handlers_feed;
mod handlers_profile;
mod messages;
mod spawners;
mod state;
mod tasks;

pub use messages::AppMessage;
pub use state::{CommentView, CreatePostState, ProfileState, SearchState, ViewId};

/// Headless client state and the loop that keeps it current.
///
/// Network calls run on background threads; their results come back over a
/// channel and are applied here, so every store has exactly one writer.
pub struct KinetApp<A: SocialApi = ApiClient> {
    api: A,
    tx: Sender<AppMessage>,
    rx: Receiver<AppMessage>,
    in_flight: usize,
    session: Session,
    current_user_loading: bool,
    feed: FeedStore,
    my_posts: FeedStore,
    profile: Option<ProfileState>,
    comment_views: HashMap<ViewId, CommentView>,
    next_view_id: u64,
    create_post: CreatePostState,
    search: SearchState,
    info_banner: Option<String>,
}

impl<A: SocialApi> KinetApp<A> {
    pub fn new(api: A) -> Self {
        Self::with_session(api, Session::default())
    }

    pub fn with_session(api: A, session: Session) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            api,
            tx,
            rx,
            in_flight: 0,
            session,
            current_user_loading: false,
            feed: FeedStore::new(FeedKind::Recent),
            my_posts: FeedStore::new(FeedKind::Mine),
            profile: None,
            comment_views: HashMap::new(),
            next_view_id: 1,
            create_post: CreatePostState::default(),
            search: SearchState::default(),
            info_banner: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_current_user_loading(&self) -> bool {
        self.current_user_loading
    }

    pub fn recent(&self) -> &FeedStore {
        &self.feed
    }

    pub fn my_posts(&self) -> &FeedStore {
        &self.my_posts
    }

    pub fn store(&self, kind: &FeedKind) -> Option<&FeedStore> {
        store_ref(&self.feed, &self.my_posts, &self.profile, kind)
    }

    fn store_mut(&mut self, kind: &FeedKind) -> Option<&mut FeedStore> {
        match kind {
            FeedKind::Recent => Some(&mut self.feed),
            FeedKind::Mine => Some(&mut self.my_posts),
            FeedKind::User(user_id) => self
                .profile
                .as_mut()
                .filter(|p| &p.user_id == user_id)
                .map(|p| &mut p.posts),
        }
    }

    pub fn profile(&self) -> Option<&ProfileState> {
        self.profile.as_ref()
    }

    pub fn comment_thread(&self, view: ViewId) -> Option<&CommentThread> {
        self.comment_views.get(&view).map(|v| &v.thread)
    }

    pub fn create_post_state(&self) -> &CreatePostState {
        &self.create_post
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn info_banner(&self) -> Option<&str> {
        self.info_banner.as_deref()
    }

    pub fn take_info_banner(&mut self) -> Option<String> {
        self.info_banner.take()
    }

    /// Number of background tasks that have not reported back yet.
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }

    /// Applies every result that has already arrived, without blocking.
    pub fn process_messages(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            messages::process_message(self, message);
        }
    }

    /// Blocks until all spawned tasks, including follow-ups they trigger,
    /// have been applied. Returns `false` on timeout.
    pub fn wait_for_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(message) => messages::process_message(self, message),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false
                }
            }
        }
        true
    }

    /// Drops all cached state tied to the signed-in user. Results still in
    /// flight land on bumped generations and are discarded.
    pub fn sign_out(&mut self) {
        self.session.set_user(None);
        self.feed.clear();
        self.my_posts.clear();
        self.profile = None;
        self.comment_views.clear();
        self.create_post = CreatePostState::default();
        self.search = SearchState::default();
        self.info_banner = None;
    }

    fn sync_comment_views(&mut self, kind: &FeedKind) {
        let Some(store) = store_ref(&self.feed, &self.my_posts, &self.profile, kind) else {
            return;
        };
        for view in self.comment_views.values_mut() {
            if &view.origin != kind {
                continue;
            }
            if let Some(post) = store.post(view.thread.post_id()) {
                view.thread.sync_from(&post.comments);
            }
        }
    }
}

fn store_ref<'a>(
    feed: &'a FeedStore,
    my_posts: &'a FeedStore,
    profile: &'a Option<ProfileState>,
    kind: &FeedKind,
) -> Option<&'a FeedStore> {
    match kind {
        FeedKind::Recent => Some(feed),
        FeedKind::Mine => Some(my_posts),
        FeedKind::User(user_id) => profile
            .as_ref()
            .filter(|p| &p.user_id == user_id)
            .map(|p| &p.posts),
    }
}
