use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kinet_frontend::app::KinetApp;
use kinet_frontend::error::{ApiError, ApiResult};
use kinet_frontend::feed::{EditPhase, EditRejected, FeedKind};
use kinet_frontend::models::{Comment, CommentId, Like, Post, PostId, User, UserId};
use kinet_frontend::{Session, SocialApi};
use pretty_assertions::assert_eq;

const IDLE: Duration = Duration::from_secs(5);
const PAGE_SIZE: usize = 2;

#[derive(Default)]
struct Backend {
    users: Vec<User>,
    posts: Vec<Post>,
    followers: HashMap<UserId, Vec<UserId>>,
    next_id: u64,
    fail_likes: bool,
    gates: HashMap<u32, Receiver<()>>,
    calls: Vec<String>,
}

/// In-memory stand-in for the HTTP API. Posts are served newest first.
#[derive(Clone, Default)]
struct FakeApi {
    me: Option<UserId>,
    backend: Arc<Mutex<Backend>>,
}

impl FakeApi {
    fn signed_in_as(user: &User) -> Self {
        let api = Self {
            me: Some(user.id.clone()),
            ..Default::default()
        };
        {
            let mut backend = api.backend.lock().unwrap();
            backend.users.push(user.clone());
            backend.next_id = 100;
        }
        api
    }

    fn add_user(&self, user: &User) {
        self.backend.lock().unwrap().users.push(user.clone());
    }

    fn seed_post(&self, id: u64, author: &User, comments: Vec<Comment>) {
        let mut backend = self.backend.lock().unwrap();
        backend.posts.insert(
            0,
            Post {
                id: PostId(id),
                author: author.clone(),
                content: format!("post {id}"),
                likes: Vec::new(),
                comments,
                updated_at: None,
            },
        );
    }

    /// Holds `page` until the returned sender fires.
    fn gate_page(&self, page: u32) -> Sender<()> {
        let (tx, rx) = mpsc::channel();
        self.backend.lock().unwrap().gates.insert(page, rx);
        tx
    }

    fn calls(&self) -> Vec<String> {
        self.backend.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) -> std::sync::MutexGuard<'_, Backend> {
        let mut backend = self.backend.lock().unwrap();
        backend.calls.push(call);
        backend
    }

    fn me(&self) -> ApiResult<UserId> {
        self.me
            .clone()
            .ok_or_else(|| ApiError::rejected(401, r#"{"message":"Unauthenticated."}"#))
    }

    fn lookup(backend: &Backend, id: &UserId) -> ApiResult<User> {
        backend
            .users
            .iter()
            .find(|u| &u.id == id)
            .cloned()
            .ok_or_else(|| ApiError::rejected(404, ""))
    }
}

impl SocialApi for FakeApi {
    fn current_user(&self) -> ApiResult<User> {
        let me = self.me()?;
        let backend = self.record("fetchuser".into());
        Self::lookup(&backend, &me)
    }

    fn fetch_posts(&self, page: u32) -> ApiResult<Vec<Post>> {
        let gate = self.record(format!("posts {page}")).gates.remove(&page);
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        let backend = self.backend.lock().unwrap();
        let start = (page as usize - 1) * PAGE_SIZE;
        Ok(backend.posts.iter().skip(start).take(PAGE_SIZE).cloned().collect())
    }

    fn fetch_my_posts(&self) -> ApiResult<Vec<Post>> {
        let me = self.me()?;
        let backend = self.record("my-posts".into());
        Ok(backend.posts.iter().filter(|p| p.author.id == me).cloned().collect())
    }

    fn fetch_user(&self, user_id: &UserId) -> ApiResult<User> {
        let backend = self.record(format!("user {user_id}"));
        Self::lookup(&backend, user_id)
    }

    fn fetch_user_posts(&self, user_id: &UserId) -> ApiResult<Vec<Post>> {
        let backend = self.record(format!("user {user_id} posts"));
        Ok(backend.posts.iter().filter(|p| &p.author.id == user_id).cloned().collect())
    }

    fn create_post(&self, content: &str) -> ApiResult<Post> {
        let me = self.me()?;
        let mut backend = self.record(format!("create {content}"));
        backend.next_id += 1;
        let post = Post {
            id: PostId(backend.next_id),
            author: Self::lookup(&backend, &me)?,
            content: content.to_string(),
            likes: Vec::new(),
            comments: Vec::new(),
            updated_at: None,
        };
        backend.posts.insert(0, post.clone());
        Ok(post)
    }

    fn like_post(&self, post_id: PostId) -> ApiResult<()> {
        let me = self.me()?;
        let mut backend = self.record(format!("like {post_id}"));
        if backend.fail_likes {
            return Err(ApiError::rejected(500, ""));
        }
        if let Some(post) = backend.posts.iter_mut().find(|p| p.id == post_id) {
            post.likes.push(Like { user_id: me });
        }
        Ok(())
    }

    fn unlike_post(&self, post_id: PostId) -> ApiResult<()> {
        let me = self.me()?;
        let mut backend = self.record(format!("unlike {post_id}"));
        if backend.fail_likes {
            return Err(ApiError::rejected(500, ""));
        }
        let Some(post) = backend.posts.iter_mut().find(|p| p.id == post_id) else {
            return Err(ApiError::rejected(404, "Post not found"));
        };
        if !post.liked_by(&me) {
            return Err(ApiError::rejected(404, "Like not found"));
        }
        post.likes.retain(|l| l.user_id != me);
        Ok(())
    }

    fn add_comment(&self, post_id: PostId, content: &str) -> ApiResult<Option<Comment>> {
        let me = self.me()?;
        let mut backend = self.record(format!("comment {post_id} {content}"));
        backend.next_id += 1;
        let comment = Comment {
            id: CommentId(backend.next_id),
            content: content.to_string(),
            author: Some(Self::lookup(&backend, &me)?),
        };
        let post = backend
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| ApiError::rejected(404, ""))?;
        post.comments.push(comment.clone());
        Ok(Some(comment))
    }

    fn update_comment(&self, comment_id: CommentId, content: &str) -> ApiResult<Option<Comment>> {
        let mut backend = self.record(format!("edit {comment_id} {content}"));
        for post in backend.posts.iter_mut() {
            if let Some(comment) = post.comments.iter_mut().find(|c| c.id == comment_id) {
                comment.content = content.to_string();
                // The update endpoint echoes the comment without its author.
                return Ok(Some(Comment {
                    id: comment_id,
                    content: content.to_string(),
                    author: None,
                }));
            }
        }
        Err(ApiError::rejected(404, ""))
    }

    fn followers(&self, user_id: &UserId) -> ApiResult<Vec<User>> {
        let backend = self.record(format!("followers {user_id}"));
        let ids = backend.followers.get(user_id).cloned().unwrap_or_default();
        ids.iter().map(|id| Self::lookup(&backend, id)).collect()
    }

    fn following(&self, user_id: &UserId) -> ApiResult<Vec<User>> {
        let backend = self.record(format!("following {user_id}"));
        let followed = backend
            .followers
            .iter()
            .filter(|(_, followers)| followers.contains(user_id))
            .map(|(id, _)| Self::lookup(&backend, id))
            .collect();
        followed
    }

    fn follow(&self, followed: &UserId, follower: &UserId) -> ApiResult<()> {
        let mut backend = self.record(format!("follow {followed} by {follower}"));
        let entry = backend.followers.entry(followed.clone()).or_default();
        if entry.contains(follower) {
            return Err(ApiError::rejected(409, r#"{"message":"Already following"}"#));
        }
        entry.push(follower.clone());
        Ok(())
    }

    fn unfollow(&self, followed: &UserId, follower: &UserId) -> ApiResult<()> {
        let mut backend = self.record(format!("unfollow {followed} by {follower}"));
        if let Some(entry) = backend.followers.get_mut(followed) {
            entry.retain(|id| id != follower);
        }
        Ok(())
    }

    fn search_users(&self, query: &str) -> ApiResult<Vec<User>> {
        let backend = self.record(format!("search {query}"));
        Ok(backend
            .users
            .iter()
            .filter(|u| u.username.starts_with(query))
            .cloned()
            .collect())
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn user(id: u64, username: &str) -> User {
    User {
        id: UserId::from(id),
        username: username.to_string(),
        ..Default::default()
    }
}

fn ids(posts: &[Post]) -> Vec<u64> {
    posts.iter().map(|p| p.id.0).collect()
}

fn app_for(api: &FakeApi, me: &User) -> KinetApp<FakeApi> {
    KinetApp::with_session(api.clone(), Session::new(Some(me.clone())))
}

#[test]
fn pages_append_in_order() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    for id in 1..=5 {
        api.seed_post(id, &me, Vec::new());
    }
    let mut app = app_for(&api, &me);

    assert!(app.load_page(&FeedKind::Recent, 1).unwrap());
    assert!(app.wait_for_idle(IDLE));
    assert_eq!(ids(app.recent().posts()), vec![5, 4]);

    assert!(app.load_more(&FeedKind::Recent));
    assert!(app.wait_for_idle(IDLE));
    assert!(app.load_more(&FeedKind::Recent));
    assert!(app.wait_for_idle(IDLE));
    assert_eq!(ids(app.recent().posts()), vec![5, 4, 3, 2, 1]);

    // Empty page marks the end.
    assert!(app.load_more(&FeedKind::Recent));
    assert!(app.wait_for_idle(IDLE));
    assert!(app.recent().is_exhausted());
    assert!(!app.load_more(&FeedKind::Recent));
}

#[test]
fn refresh_discards_in_flight_append() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    for id in 1..=3 {
        api.seed_post(id, &me, Vec::new());
    }
    let mut app = app_for(&api, &me);
    app.load_page(&FeedKind::Recent, 1).unwrap();
    assert!(app.wait_for_idle(IDLE));

    let release = api.gate_page(2);
    assert!(app.load_more(&FeedKind::Recent));
    // A second append while one is in flight is refused.
    assert!(!app.load_more(&FeedKind::Recent));
    assert!(app.refresh(&FeedKind::Recent));
    release.send(()).unwrap();
    assert!(app.wait_for_idle(IDLE));

    assert_eq!(ids(app.recent().posts()), vec![3, 2]);
    assert_eq!(app.recent().next_page(), 2);
}

#[test]
fn blank_post_is_never_sent() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    let mut app = app_for(&api, &me);

    assert!(!app.create_post("   \n"));
    assert!(app.is_idle());
    assert!(api.calls().is_empty());
}

#[test]
fn created_post_lands_on_top_of_both_feeds() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    api.seed_post(1, &me, Vec::new());
    let mut app = app_for(&api, &me);
    app.load_page(&FeedKind::Recent, 1).unwrap();
    app.load_page(&FeedKind::Mine, 1).unwrap();
    assert!(app.wait_for_idle(IDLE));

    assert!(app.create_post("  hello  "));
    assert!(app.wait_for_idle(IDLE));

    assert_eq!(app.recent().posts()[0].content, "hello");
    assert_eq!(app.my_posts().posts()[0].content, "hello");
    assert_eq!(app.recent().posts().len(), 2);
    assert_eq!(app.create_post_state().content, "");
    assert!(api.calls().contains(&"create hello".to_string()));
}

#[test]
fn like_is_optimistic_then_refreshed() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    api.seed_post(1, &me, Vec::new());
    let mut app = app_for(&api, &me);
    app.load_page(&FeedKind::Recent, 1).unwrap();
    assert!(app.wait_for_idle(IDLE));

    assert!(app.toggle_like(&FeedKind::Recent, PostId(1)).unwrap());
    assert!(app.recent().posts()[0].liked_by(&me.id));
    // Repeats are refused until the server answers.
    assert!(!app.toggle_like(&FeedKind::Recent, PostId(1)).unwrap());

    assert!(app.wait_for_idle(IDLE));
    let post = &app.recent().posts()[0];
    assert!(post.liked_by(&me.id));
    assert_eq!(post.like_count(), 1);

    let calls = api.calls();
    let like_at = calls.iter().position(|c| c == "like 1").unwrap();
    assert_eq!(calls[like_at + 1..], ["posts 1".to_string()]);

    assert!(app.toggle_like(&FeedKind::Recent, PostId(1)).unwrap());
    assert!(app.wait_for_idle(IDLE));
    assert_eq!(app.recent().posts()[0].like_count(), 0);
    assert!(api.calls().contains(&"unlike 1".to_string()));
}

#[test]
fn failed_like_is_reverted() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    api.seed_post(1, &me, Vec::new());
    api.backend.lock().unwrap().fail_likes = true;
    let mut app = app_for(&api, &me);
    app.load_page(&FeedKind::Recent, 1).unwrap();
    assert!(app.wait_for_idle(IDLE));

    app.toggle_like(&FeedKind::Recent, PostId(1)).unwrap();
    assert!(app.wait_for_idle(IDLE));

    assert!(!app.recent().posts()[0].liked_by(&me.id));
    assert!(!app.recent().has_pending_like(PostId(1)));
    assert_eq!(app.info_banner(), Some("Failed to update like."));
}

#[test]
fn rejected_unlike_of_unliked_post_invents_no_like() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    api.seed_post(1, &me, Vec::new());
    let mut app = app_for(&api, &me);
    app.load_page(&FeedKind::Recent, 1).unwrap();
    assert!(app.wait_for_idle(IDLE));

    // A stale view still shows the post as liked.
    app.toggle_like_from(&FeedKind::Recent, PostId(1), true).unwrap();
    assert!(app.wait_for_idle(IDLE));

    let post = &app.recent().posts()[0];
    assert!(!post.liked_by(&me.id));
    assert_eq!(post.like_count(), 0);
    assert!(!app.recent().has_pending_like(PostId(1)));
    assert_eq!(app.info_banner(), Some("Failed to update like."));
    assert_eq!(api.calls().last().map(String::as_str), Some("unlike 1"));
}

#[test]
fn like_requires_a_session() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    api.seed_post(1, &me, Vec::new());
    let mut app = KinetApp::new(api.clone());
    app.load_page(&FeedKind::Recent, 1).unwrap();
    assert!(app.wait_for_idle(IDLE));
    assert!(app.toggle_like(&FeedKind::Recent, PostId(1)).is_err());
}

#[test]
fn comment_shows_in_thread_and_feed() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    api.seed_post(1, &me, Vec::new());
    let mut app = app_for(&api, &me);
    app.load_page(&FeedKind::Recent, 1).unwrap();
    assert!(app.wait_for_idle(IDLE));

    let view = app.open_comments(&FeedKind::Recent, PostId(1)).unwrap();
    app.set_comment_draft(view, "   ");
    assert!(!app.submit_comment(view));

    app.set_comment_draft(view, " nice ");
    assert!(app.submit_comment(view));
    assert!(app.wait_for_idle(IDLE));

    let thread = app.comment_thread(view).unwrap();
    assert_eq!(thread.draft(), "");
    let contents: Vec<&str> = thread.comments().iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["nice"]);
    assert_eq!(app.recent().posts()[0].comments.len(), 1);
}

#[test]
fn closed_thread_ignores_late_result() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    api.seed_post(1, &me, Vec::new());
    let mut app = app_for(&api, &me);
    app.load_page(&FeedKind::Recent, 1).unwrap();
    assert!(app.wait_for_idle(IDLE));

    let view = app.open_comments(&FeedKind::Recent, PostId(1)).unwrap();
    app.set_comment_draft(view, "bye");
    assert!(app.submit_comment(view));
    app.close_comments(view);
    assert!(app.wait_for_idle(IDLE));

    assert!(app.comment_thread(view).is_none());
    assert_eq!(app.recent().posts()[0].comments[0].content, "bye");
}

#[test]
fn edit_keeps_author_and_reaches_server() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    let mine = Comment {
        id: CommentId(42),
        content: "foo".into(),
        author: Some(me.clone()),
    };
    api.seed_post(1, &me, vec![mine]);
    let mut app = app_for(&api, &me);
    app.load_page(&FeedKind::Recent, 1).unwrap();
    assert!(app.wait_for_idle(IDLE));

    let view = app.open_comments(&FeedKind::Recent, PostId(1)).unwrap();
    app.begin_edit(view, CommentId(42)).unwrap();
    app.set_edit_content(view, "bar");
    assert!(app.save_edit(view));
    assert_eq!(
        app.comment_thread(view).unwrap().edit().unwrap().phase,
        EditPhase::Saving
    );
    assert!(app.wait_for_idle(IDLE));

    let thread = app.comment_thread(view).unwrap();
    assert!(thread.edit().is_none());
    assert_eq!(thread.comments()[0].content, "bar");
    assert_eq!(thread.comments()[0].author.as_ref(), Some(&me));
    assert!(api.calls().contains(&"edit 42 bar".to_string()));
}

#[test]
fn only_author_may_edit() {
    init_logging();
    let me = user(7, "ada");
    let other = user(8, "bob");
    let api = FakeApi::signed_in_as(&me);
    api.add_user(&other);
    let theirs = Comment {
        id: CommentId(5),
        content: "theirs".into(),
        author: Some(other.clone()),
    };
    api.seed_post(1, &other, vec![theirs]);
    let mut app = app_for(&api, &me);
    app.load_page(&FeedKind::Recent, 1).unwrap();
    assert!(app.wait_for_idle(IDLE));

    let view = app.open_comments(&FeedKind::Recent, PostId(1)).unwrap();
    assert_eq!(
        app.begin_edit(view, CommentId(5)),
        Err(EditRejected::NotAuthor(CommentId(5)))
    );
    app.close_comments(view);
    assert_eq!(
        app.begin_edit(view, CommentId(5)),
        Err(EditRejected::ThreadClosed)
    );
}

#[test]
fn follow_conflict_rechecks_followers() {
    init_logging();
    let me = user(7, "ada");
    let other = user(9, "cy");
    let api = FakeApi::signed_in_as(&me);
    api.add_user(&other);
    api.backend
        .lock()
        .unwrap()
        .followers
        .insert(other.id.clone(), vec![me.id.clone()]);
    let mut app = app_for(&api, &me);

    app.open_profile(other.id.clone());
    assert!(app.wait_for_idle(IDLE));
    let profile = app.profile().unwrap();
    assert_eq!(profile.user.as_ref(), Some(&other));
    assert!(profile.is_following);

    assert!(app.follow());
    assert!(app.wait_for_idle(IDLE));
    assert_eq!(app.info_banner(), Some("You are already following this user."));
    assert!(app.profile().unwrap().is_following);

    assert!(app.unfollow());
    assert!(app.wait_for_idle(IDLE));
    let profile = app.profile().unwrap();
    assert!(!profile.is_following);
    assert_eq!(profile.follower_count(), 0);
}

#[test]
fn cannot_follow_yourself() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    let mut app = app_for(&api, &me);
    app.open_profile(me.id.clone());
    assert!(app.wait_for_idle(IDLE));
    assert!(!app.follow());
}

#[test]
fn only_latest_search_is_kept() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    api.add_user(&user(8, "adam"));
    api.add_user(&user(9, "bob"));
    let mut app = app_for(&api, &me);

    app.set_search_query("b");
    app.set_search_query("ada");
    assert!(app.wait_for_idle(IDLE));

    let names: Vec<&str> = app.search().results.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["ada", "adam"]);

    app.set_search_query("  ");
    assert!(app.search().results.is_empty());
    assert!(!app.search().is_loading);
}

#[test]
fn current_user_is_fetched_into_session() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    let mut app = KinetApp::new(api);
    app.refresh_current_user();
    assert!(app.is_current_user_loading());
    assert!(app.wait_for_idle(IDLE));
    assert!(!app.is_current_user_loading());
    assert_eq!(app.session().user(), Some(&me));
}

#[test]
fn results_apply_without_blocking() {
    init_logging();
    let me = user(7, "ada");
    let api = FakeApi::signed_in_as(&me);
    api.seed_post(1, &me, Vec::new());
    let mut app = app_for(&api, &me);
    app.load_page(&FeedKind::Recent, 1).unwrap();

    let deadline = std::time::Instant::now() + IDLE;
    while !app.is_idle() && std::time::Instant::now() < deadline {
        app.process_messages();
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(app.is_idle());
    assert_eq!(ids(app.recent().posts()), vec![1]);
}
