use log::{debug, info};

use crate::api::SocialApi;
use crate::feed::{
    submission, CommentThread, EditRejected, FeedError, FeedKind, FeedTicket, LikeToggle,
};
use crate::models::{CommentId, PostId, UserId};

use super::state::{CommentView, ProfileState, ViewId};
use super::tasks;
use super::KinetApp;

impl<A: SocialApi> KinetApp<A> {
    pub fn refresh_current_user(&mut self) {
        if self.current_user_loading {
            return;
        }
        self.current_user_loading = true;
        self.in_flight += 1;
        tasks::load_current_user(self.api.clone(), self.tx.clone());
    }

    /// Requests `page` of `kind`. Page 1 resets the collection. Returns
    /// whether a request was started.
    pub fn load_page(&mut self, kind: &FeedKind, page: u32) -> Result<bool, FeedError> {
        let Some(store) = self.store_mut(kind) else {
            debug!("no open {kind} feed to load");
            return Ok(false);
        };
        match store.begin_page(page)? {
            Some(ticket) => {
                self.spawn_load_feed(ticket);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn load_more(&mut self, kind: &FeedKind) -> bool {
        let Some(ticket) = self.store_mut(kind).and_then(|s| s.begin_load_more()) else {
            return false;
        };
        self.spawn_load_feed(ticket);
        true
    }

    /// Reloads `kind` from the first page. Anything in flight for it is
    /// superseded.
    pub fn refresh(&mut self, kind: &FeedKind) -> bool {
        let Some(ticket) = self.store_mut(kind).map(|s| s.begin_reset()) else {
            return false;
        };
        self.spawn_load_feed(ticket);
        true
    }

    fn spawn_load_feed(&mut self, ticket: FeedTicket) {
        debug!(
            "loading {} page {} (generation {})",
            ticket.kind, ticket.page, ticket.generation
        );
        self.in_flight += 1;
        tasks::load_feed(self.api.clone(), self.tx.clone(), ticket);
    }

    pub fn set_post_draft(&mut self, text: impl Into<String>) {
        self.create_post.content = text.into();
    }

    /// Publishes `content`. Blank text never reaches the server.
    pub fn create_post(&mut self, content: &str) -> bool {
        self.set_post_draft(content);
        self.submit_post()
    }

    pub fn submit_post(&mut self) -> bool {
        if self.create_post.submitting {
            return false;
        }
        let Some(content) = submission(&self.create_post.content) else {
            return false;
        };
        self.create_post.submitting = true;
        self.create_post.error = None;
        self.in_flight += 1;
        tasks::create_post(self.api.clone(), self.tx.clone(), content);
        true
    }

    /// Flips the signed-in user's like on a post in `kind`.
    pub fn toggle_like(&mut self, kind: &FeedKind, post_id: PostId) -> Result<bool, FeedError> {
        let user_id = self.session.user_id().cloned().ok_or(FeedError::NoSession)?;
        let currently_liked = self
            .store(kind)
            .and_then(|s| s.post(post_id))
            .ok_or(FeedError::UnknownPost(post_id))?
            .liked_by(&user_id);
        self.toggle_like_from(kind, post_id, currently_liked)
    }

    /// Like [`toggle_like`](Self::toggle_like), trusting the caller's view of
    /// whether the post is liked.
    pub fn toggle_like_from(
        &mut self,
        kind: &FeedKind,
        post_id: PostId,
        currently_liked: bool,
    ) -> Result<bool, FeedError> {
        let user_id = self.session.user_id().cloned().ok_or(FeedError::NoSession)?;
        let store = self
            .store_mut(kind)
            .ok_or(FeedError::UnknownPost(post_id))?;
        match store.begin_like_toggle(post_id, currently_liked, &user_id)? {
            Some(toggle) => {
                self.spawn_toggle_like(toggle);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn spawn_toggle_like(&mut self, toggle: LikeToggle) {
        self.in_flight += 1;
        tasks::toggle_like(self.api.clone(), self.tx.clone(), toggle);
    }

    /// Posts a comment without an open thread; `kind` is refreshed afterwards.
    pub fn add_comment(&mut self, kind: &FeedKind, post_id: PostId, content: &str) -> bool {
        let Some(content) = submission(content) else {
            return false;
        };
        self.in_flight += 1;
        tasks::add_comment(
            self.api.clone(),
            self.tx.clone(),
            kind.clone(),
            None,
            post_id,
            content,
        );
        true
    }

    /// Opens a thread seeded from the post's current comments.
    pub fn open_comments(&mut self, kind: &FeedKind, post_id: PostId) -> Option<ViewId> {
        let thread = CommentThread::new(self.store(kind)?.post(post_id)?);
        let view = ViewId(self.next_view_id);
        self.next_view_id += 1;
        self.comment_views.insert(
            view,
            CommentView {
                origin: kind.clone(),
                thread,
            },
        );
        Some(view)
    }

    pub fn close_comments(&mut self, view: ViewId) {
        self.comment_views.remove(&view);
    }

    pub fn set_comment_draft(&mut self, view: ViewId, text: impl Into<String>) {
        if let Some(view) = self.comment_views.get_mut(&view) {
            view.thread.set_draft(text);
        }
    }

    pub fn submit_comment(&mut self, view: ViewId) -> bool {
        let Some(open) = self.comment_views.get_mut(&view) else {
            return false;
        };
        let Some(content) = open.thread.begin_submit() else {
            return false;
        };
        let origin = open.origin.clone();
        let post_id = open.thread.post_id();
        self.in_flight += 1;
        tasks::add_comment(
            self.api.clone(),
            self.tx.clone(),
            origin,
            Some(view),
            post_id,
            content,
        );
        true
    }

    pub fn begin_edit(&mut self, view: ViewId, comment_id: CommentId) -> Result<(), EditRejected> {
        let open = self
            .comment_views
            .get_mut(&view)
            .ok_or(EditRejected::ThreadClosed)?;
        open.thread.begin_edit(comment_id, &self.session)
    }

    pub fn set_edit_content(&mut self, view: ViewId, text: impl Into<String>) {
        if let Some(open) = self.comment_views.get_mut(&view) {
            open.thread.set_edit_content(text);
        }
    }

    pub fn cancel_edit(&mut self, view: ViewId) -> bool {
        self.comment_views
            .get_mut(&view)
            .map(|open| open.thread.cancel_edit())
            .unwrap_or(false)
    }

    pub fn save_edit(&mut self, view: ViewId) -> bool {
        let Some((comment_id, content)) = self
            .comment_views
            .get_mut(&view)
            .and_then(|open| open.thread.begin_save())
        else {
            return false;
        };
        self.in_flight += 1;
        tasks::update_comment(self.api.clone(), self.tx.clone(), view, comment_id, content);
        true
    }

    /// Switches the profile panel to `user_id` and loads it.
    pub fn open_profile(&mut self, user_id: UserId) {
        if self.profile.as_ref().is_some_and(|p| p.user_id == user_id) {
            self.refresh(&FeedKind::User(user_id));
            return;
        }
        self.close_profile();
        info!("opening profile {user_id}");
        let mut profile = ProfileState::new(user_id.clone());
        profile.user_loading = true;
        profile.followers_loading = true;
        let ticket = profile.posts.begin_reset();
        self.profile = Some(profile);

        self.in_flight += 2;
        tasks::load_profile(self.api.clone(), self.tx.clone(), user_id.clone());
        tasks::load_followers(self.api.clone(), self.tx.clone(), user_id);
        self.spawn_load_feed(ticket);
    }

    pub fn close_profile(&mut self) {
        let Some(profile) = self.profile.take() else {
            return;
        };
        let kind = FeedKind::User(profile.user_id);
        self.comment_views.retain(|_, view| view.origin != kind);
    }

    pub fn load_following(&mut self) -> bool {
        let Some(profile) = self.profile.as_mut() else {
            return false;
        };
        if profile.following_loading {
            return false;
        }
        profile.following_loading = true;
        let user_id = profile.user_id.clone();
        self.in_flight += 1;
        tasks::load_following(self.api.clone(), self.tx.clone(), user_id);
        true
    }

    pub(super) fn spawn_load_followers(&mut self) {
        let Some(profile) = self.profile.as_mut() else {
            return;
        };
        profile.followers_loading = true;
        let user_id = profile.user_id.clone();
        self.in_flight += 1;
        tasks::load_followers(self.api.clone(), self.tx.clone(), user_id);
    }

    pub fn follow(&mut self) -> bool {
        self.spawn_change_follow(true)
    }

    pub fn unfollow(&mut self) -> bool {
        self.spawn_change_follow(false)
    }

    fn spawn_change_follow(&mut self, follow: bool) -> bool {
        let Some(me) = self.session.user_id().cloned() else {
            self.info_banner = Some("Sign in to follow people.".into());
            return false;
        };
        let Some(profile) = self.profile.as_mut() else {
            return false;
        };
        if profile.user_id == me || profile.follow_in_flight {
            return false;
        }
        profile.follow_in_flight = true;
        profile.error = None;
        let user_id = profile.user_id.clone();
        self.in_flight += 1;
        tasks::change_follow(self.api.clone(), self.tx.clone(), user_id, me, follow);
        true
    }

    /// Updates the search box. Only the result for the latest query is kept.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        self.search.query = query.clone();
        self.search.error = None;
        if query.trim().is_empty() {
            self.search.results.clear();
            self.search.is_loading = false;
            return;
        }
        self.search.is_loading = true;
        self.in_flight += 1;
        tasks::search_users(self.api.clone(), self.tx.clone(), query);
    }
}
