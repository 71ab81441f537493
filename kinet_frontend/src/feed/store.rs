use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::error::ApiError;
use crate::models::{Post, PostId, UserId};

/// Which backend listing a store mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// `GET /posts?page=N`, newest first.
    Recent,
    /// `GET /my-posts`, delivered in one response.
    Mine,
    /// `GET /user/:id/posts`, delivered in one response.
    User(UserId),
}

impl FeedKind {
    pub fn is_paginated(&self) -> bool {
        matches!(self, FeedKind::Recent)
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Recent => write!(f, "recent"),
            FeedKind::Mine => write!(f, "mine"),
            FeedKind::User(id) => write!(f, "user:{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Reset,
    Append,
}

/// Captured when a fetch starts; the result only lands if the store's
/// generation still matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTicket {
    pub kind: FeedKind,
    pub generation: u64,
    pub page: u32,
    pub mode: FetchMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Replaced { total: usize },
    Appended { added: usize, updated: usize },
    Stale,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("page numbers start at 1")]
    InvalidPage,
    #[error("post {0} is not in this feed")]
    UnknownPost(PostId),
    #[error("no signed-in user")]
    NoSession,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Like mutation waiting for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeToggle {
    pub kind: FeedKind,
    pub post_id: PostId,
    pub user_id: UserId,
    /// State before the toggle; the request sent is unlike when `true`.
    pub was_liked: bool,
}

impl LikeToggle {
    pub fn target(&self) -> bool {
        !self.was_liked
    }
}

/// A toggle in flight plus the like state the server last reported for it.
#[derive(Debug)]
struct PendingLike {
    toggle: LikeToggle,
    server_liked: bool,
}

/// Ordered, de-duplicated posts for one feed.
#[derive(Debug)]
pub struct FeedStore {
    kind: FeedKind,
    posts: Vec<Post>,
    generation: u64,
    next_page: u32,
    exhausted: bool,
    reset_in_flight: Option<u64>,
    append_in_flight: Option<u32>,
    pending_likes: HashMap<PostId, PendingLike>,
    loaded: bool,
    pub error: Option<String>,
}

impl FeedStore {
    pub fn new(kind: FeedKind) -> Self {
        Self {
            kind,
            posts: Vec::new(),
            generation: 0,
            next_page: 1,
            exhausted: false,
            reset_in_flight: None,
            append_in_flight: None,
            pending_likes: HashMap::new(),
            loaded: false,
            error: None,
        }
    }

    pub fn kind(&self) -> &FeedKind {
        &self.kind
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn post(&self, post_id: PostId) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_loading(&self) -> bool {
        self.reset_in_flight.is_some() || self.append_in_flight.is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn has_pending_like(&self, post_id: PostId) -> bool {
        self.pending_likes.contains_key(&post_id)
    }

    /// Starts a fetch of `page`. Page 1 is a reset and supersedes everything
    /// in flight; later pages append and return `None` when the fetch would
    /// overlap another one or there is nothing more to load.
    pub fn begin_page(&mut self, page: u32) -> Result<Option<FeedTicket>, FeedError> {
        match page {
            0 => Err(FeedError::InvalidPage),
            1 => Ok(Some(self.begin_reset())),
            _ => Ok(self.begin_append(page)),
        }
    }

    pub fn begin_reset(&mut self) -> FeedTicket {
        self.generation += 1;
        self.reset_in_flight = Some(self.generation);
        self.append_in_flight = None;
        FeedTicket {
            kind: self.kind.clone(),
            generation: self.generation,
            page: 1,
            mode: FetchMode::Reset,
        }
    }

    /// Ticket for the next page, or `None` if one can't start right now.
    pub fn begin_load_more(&mut self) -> Option<FeedTicket> {
        if !self.loaded {
            return Some(self.begin_reset());
        }
        let page = self.next_page.max(2);
        self.begin_append(page)
    }

    fn begin_append(&mut self, page: u32) -> Option<FeedTicket> {
        if !self.kind.is_paginated() || self.exhausted {
            return None;
        }
        if self.reset_in_flight.is_some() || self.append_in_flight.is_some() {
            log::debug!("{} feed busy, skipping page {page}", self.kind);
            return None;
        }
        self.append_in_flight = Some(page);
        Some(FeedTicket {
            kind: self.kind.clone(),
            generation: self.generation,
            page,
            mode: FetchMode::Append,
        })
    }

    /// Applies a finished fetch. Stale results are dropped whether they
    /// succeeded or failed; a failure leaves the collection untouched.
    pub fn apply_page(
        &mut self,
        ticket: &FeedTicket,
        result: Result<Vec<Post>, ApiError>,
    ) -> Result<Applied, FeedError> {
        if ticket.kind != self.kind || ticket.generation != self.generation {
            log::debug!(
                "dropping stale {} page {} (generation {} != {})",
                self.kind,
                ticket.page,
                ticket.generation,
                self.generation
            );
            return Ok(Applied::Stale);
        }
        match ticket.mode {
            FetchMode::Reset => self.reset_in_flight = None,
            FetchMode::Append => {
                if self.append_in_flight != Some(ticket.page) {
                    log::debug!("dropping unexpected {} page {}", self.kind, ticket.page);
                    return Ok(Applied::Stale);
                }
                self.append_in_flight = None;
            }
        }

        let posts = match result {
            Ok(posts) => posts,
            Err(err) => {
                self.error = Some(err.user_message());
                return Err(err.into());
            }
        };
        self.error = None;

        let applied = match ticket.mode {
            FetchMode::Reset => {
                self.posts = dedupe(posts);
                self.next_page = 2;
                self.exhausted = false;
                self.loaded = true;
                Applied::Replaced {
                    total: self.posts.len(),
                }
            }
            FetchMode::Append => {
                if posts.is_empty() {
                    self.exhausted = true;
                }
                let (added, updated) = merge_posts(&mut self.posts, posts);
                self.next_page = self.next_page.max(ticket.page.saturating_add(1));
                Applied::Appended { added, updated }
            }
        };
        self.reapply_pending_likes();
        Ok(applied)
    }

    /// Puts a freshly created post at the top.
    pub fn prepend(&mut self, post: Post) {
        let post = post.normalize();
        self.posts.retain(|p| p.id != post.id);
        self.posts.insert(0, post);
    }

    /// Starts a like/unlike. The local copy is patched right away; `None`
    /// means a toggle for this post is still waiting on the server.
    pub fn begin_like_toggle(
        &mut self,
        post_id: PostId,
        currently_liked: bool,
        user_id: &UserId,
    ) -> Result<Option<LikeToggle>, FeedError> {
        if self.pending_likes.contains_key(&post_id) {
            log::debug!("like toggle for post {post_id} already pending");
            return Ok(None);
        }
        let post = self
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or(FeedError::UnknownPost(post_id))?;
        let toggle = LikeToggle {
            kind: self.kind.clone(),
            post_id,
            user_id: user_id.clone(),
            was_liked: currently_liked,
        };
        let server_liked = post.liked_by(user_id);
        post.set_liked(user_id, toggle.target());
        self.pending_likes.insert(
            post_id,
            PendingLike {
                toggle: toggle.clone(),
                server_liked,
            },
        );
        Ok(Some(toggle))
    }

    /// Settles a toggle. On failure the post goes back to the like state
    /// the server last reported, whatever the caller believed it was.
    pub fn finish_like_toggle(&mut self, toggle: &LikeToggle, succeeded: bool) {
        match self.pending_likes.get(&toggle.post_id) {
            Some(pending) if &pending.toggle == toggle => {}
            _ => return,
        }
        let Some(pending) = self.pending_likes.remove(&toggle.post_id) else {
            return;
        };
        if !succeeded {
            if let Some(post) = self.posts.iter_mut().find(|p| p.id == toggle.post_id) {
                post.set_liked(&toggle.user_id, pending.server_liked);
            }
        }
    }

    fn reapply_pending_likes(&mut self) {
        for pending in self.pending_likes.values_mut() {
            let toggle = &pending.toggle;
            if let Some(post) = self.posts.iter_mut().find(|p| p.id == toggle.post_id) {
                pending.server_liked = post.liked_by(&toggle.user_id);
                post.set_liked(&toggle.user_id, toggle.target());
            }
        }
    }

    pub fn clear(&mut self) {
        self.generation += 1;
        self.posts.clear();
        self.next_page = 1;
        self.exhausted = false;
        self.reset_in_flight = None;
        self.append_in_flight = None;
        self.pending_likes.clear();
        self.loaded = false;
        self.error = None;
    }
}

/// Collapses repeated ids within one delivery. The first position is kept,
/// the last copy's value wins.
pub fn dedupe(posts: Vec<Post>) -> Vec<Post> {
    let mut merged = Vec::with_capacity(posts.len());
    merge_posts(&mut merged, posts);
    merged
}

/// Merges `incoming` into `existing` by id. Returns `(added, updated)`.
pub fn merge_posts(existing: &mut Vec<Post>, incoming: Vec<Post>) -> (usize, usize) {
    let mut index: HashMap<PostId, usize> = existing
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id, i))
        .collect();
    let mut added = 0;
    let mut updated = 0;
    for post in incoming {
        let post = post.normalize();
        match index.get(&post.id) {
            Some(&i) => {
                if supersedes(&post, &existing[i]) {
                    existing[i] = post;
                    updated += 1;
                }
            }
            None => {
                index.insert(post.id, existing.len());
                existing.push(post);
                added += 1;
            }
        }
    }
    (added, updated)
}

/// The arriving copy wins unless both carry timestamps and it is older.
fn supersedes(incoming: &Post, current: &Post) -> bool {
    match (incoming.updated_at, current.updated_at) {
        (Some(new), Some(old)) => new >= old,
        _ => true,
    }
}
