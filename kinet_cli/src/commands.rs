use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::Subcommand;
use kinet_frontend::feed::FeedKind;
use kinet_frontend::models::{CommentId, PostId, RegisterInput, UserId};
use kinet_frontend::{ApiClient, KinetApp, TokenStore};
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::render;

/// How far back `like`, `comments` and `edit-comment` page through the
/// recent feed looking for a post.
const MAX_SCAN_PAGES: u32 = 20;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session token
    Login {
        username_or_email: String,
        #[arg(long, env = "KINET_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored token
    Logout,
    /// Create a new account
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "KINET_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "")]
        gender: String,
        /// YYYY-MM-DD
        #[arg(long, default_value = "")]
        birthdate: String,
    },
    /// Send a password reset email
    ForgotPassword { email: String },
    /// Show the signed-in user
    Whoami,
    /// Show the recent feed
    Feed {
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Show your own posts
    MyPosts,
    /// Publish a post
    Post {
        #[arg(required = true, num_args = 1..)]
        content: Vec<String>,
    },
    /// Like a post, or remove your like
    Like { post_id: u64 },
    /// Comment on a post
    Comment {
        post_id: u64,
        #[arg(required = true, num_args = 1..)]
        content: Vec<String>,
    },
    /// List a post's comments
    Comments { post_id: u64 },
    /// Change the text of one of your comments
    EditComment {
        post_id: u64,
        comment_id: u64,
        #[arg(required = true, num_args = 1..)]
        content: Vec<String>,
    },
    /// Show a user's profile and posts
    Profile { user_id: String },
    /// List a user's followers
    Followers { user_id: String },
    /// List who a user follows
    Following { user_id: String },
    Follow { user_id: String },
    Unfollow { user_id: String },
    /// Find users by name
    Search { query: String },
    /// Upload a new profile picture
    Avatar { path: PathBuf },
    /// Interactive session keeping feeds loaded between commands
    Shell,
}

/// Everything a command needs: settings, token storage and a live client.
pub struct Context {
    pub config: CliConfig,
    pub tokens: TokenStore,
    pub app: KinetApp<ApiClient>,
}

impl Context {
    pub fn new(config: CliConfig) -> Result<Self> {
        let tokens = config.token_store();
        let mut client = ApiClient::with_timeout(&config.api_url, config.timeout())
            .with_context(|| format!("cannot use API address {}", config.api_url))?;
        client.set_token(tokens.load()?);
        Ok(Self {
            config,
            tokens,
            app: KinetApp::new(client),
        })
    }

    fn wait_limit(&self) -> Duration {
        // Some operations chain a follow-up request.
        self.config.timeout() * 3
    }

    /// Applies every outstanding result, then prints any notice it raised.
    pub fn settle(&mut self) -> Result<()> {
        if !self.app.wait_for_idle(self.wait_limit()) {
            bail!("timed out waiting for {}", self.config.api_url);
        }
        if let Some(banner) = self.app.take_info_banner() {
            println!("{banner}");
        }
        Ok(())
    }

    fn ensure_user(&mut self) -> Result<UserId> {
        if self.app.session().user().is_none() {
            if self.app.api().token().is_none() {
                bail!("not signed in; run `kinet login` first");
            }
            // The shell may already have a lookup running from an earlier line.
            if !self.app.is_current_user_loading() {
                self.app.refresh_current_user();
            }
            self.settle()?;
        }
        self.app
            .session()
            .user_id()
            .cloned()
            .ok_or_else(|| anyhow!("session expired; run `kinet login` again"))
    }

    fn load_feed(&mut self, kind: &FeedKind) -> Result<()> {
        self.app.load_page(kind, 1)?;
        self.settle()?;
        self.feed_error(kind)
    }

    fn feed_error(&self, kind: &FeedKind) -> Result<()> {
        match self.app.store(kind).and_then(|s| s.error.as_deref()) {
            Some(message) => bail!("could not load {kind} feed: {message}"),
            None => Ok(()),
        }
    }

    /// Loads the next page of the recent feed and returns how many posts it
    /// added, or `None` when nothing more could be requested.
    pub fn more(&mut self) -> Result<Option<usize>> {
        let kind = FeedKind::Recent;
        let before = self.app.recent().posts().len();
        if !self.app.load_more(&kind) {
            return Ok(None);
        }
        self.settle()?;
        self.feed_error(&kind)?;
        Ok(Some(self.app.recent().posts().len().saturating_sub(before)))
    }

    fn locate_post(&mut self, post_id: PostId) -> Result<FeedKind> {
        let kind = FeedKind::Recent;
        if !self.app.recent().is_loaded() {
            self.load_feed(&kind)?;
        }
        let mut pages = 1;
        while self.app.recent().post(post_id).is_none() && pages < MAX_SCAN_PAGES {
            if self.more()?.is_none() {
                break;
            }
            pages += 1;
        }
        if self.app.recent().post(post_id).is_some() {
            return Ok(kind);
        }

        let mine = FeedKind::Mine;
        self.load_feed(&mine)?;
        if self.app.my_posts().post(post_id).is_some() {
            return Ok(mine);
        }
        bail!("post {post_id} not found")
    }

    fn open_profile(&mut self, user_id: &str) -> Result<()> {
        self.app.open_profile(UserId::new(user_id));
        self.settle()?;
        match self.app.profile().and_then(|p| p.error.clone()) {
            Some(message) => bail!("could not load user {user_id}: {message}"),
            None => Ok(()),
        }
    }
}

pub fn run(ctx: &mut Context, command: Command) -> Result<()> {
    match command {
        Command::Login {
            username_or_email,
            password,
        } => {
            let response = ctx.app.api().login(&username_or_email, &password)?;
            ctx.tokens.save(&response.token)?;
            ctx.app.api_mut().set_token(Some(response.token));
            ctx.app.sign_out();
            match response.user {
                Some(user) => println!("Signed in as {}", render::user_line(&user)),
                None => println!("Signed in."),
            }
            info!("token stored at {}", ctx.tokens.path().display());
        }
        Command::Logout => {
            if ctx.app.api().token().is_some() {
                if let Err(err) = ctx.app.api().logout() {
                    warn!("server logout failed: {err}");
                }
            }
            ctx.tokens.clear()?;
            ctx.app.api_mut().set_token(None);
            ctx.app.sign_out();
            println!("Signed out.");
        }
        Command::Register {
            first_name,
            last_name,
            username,
            email,
            password,
            gender,
            birthdate,
        } => {
            let input = RegisterInput {
                first_name,
                last_name,
                username,
                gender,
                birthdate,
                email,
                password_confirmation: password.clone(),
                password,
            };
            ctx.app.api().register(&input)?;
            println!("Account created. You can now run `kinet login`.");
        }
        Command::ForgotPassword { email } => {
            ctx.app.api().forgot_password(&email)?;
            println!("If {email} has an account, a reset link is on its way.");
        }
        Command::Whoami => {
            ctx.ensure_user()?;
            if let Some(user) = ctx.app.session().user() {
                println!("{}", render::user_line(user));
            }
        }
        Command::Feed { pages } => {
            ctx.load_feed(&FeedKind::Recent)?;
            for _ in 1..pages.max(1) {
                if ctx.more()?.is_none() {
                    break;
                }
            }
            println!("{}", render::posts(ctx.app.recent().posts(), ctx.app.session()));
        }
        Command::MyPosts => {
            ctx.ensure_user()?;
            ctx.load_feed(&FeedKind::Mine)?;
            println!("{}", render::posts(ctx.app.my_posts().posts(), ctx.app.session()));
        }
        Command::Post { content } => {
            ctx.ensure_user()?;
            if !ctx.app.create_post(&content.join(" ")) {
                bail!("post is empty");
            }
            ctx.settle()?;
            if let Some(message) = &ctx.app.create_post_state().error {
                bail!("could not publish: {message}");
            }
            if let Some(post) = ctx.app.recent().posts().first() {
                println!("{}", render::post(post, ctx.app.session()));
            }
        }
        Command::Like { post_id } => {
            let me = ctx.ensure_user()?;
            let post_id = PostId(post_id);
            let kind = ctx.locate_post(post_id)?;
            ctx.app.toggle_like(&kind, post_id)?;
            ctx.settle()?;
            if let Some(post) = ctx.app.store(&kind).and_then(|s| s.post(post_id)) {
                let state = if post.liked_by(&me) { "Liked" } else { "Unliked" };
                println!("{state} #{post_id} ({} likes)", post.like_count());
            }
        }
        Command::Comment { post_id, content } => {
            ctx.ensure_user()?;
            let post_id = PostId(post_id);
            let kind = ctx.locate_post(post_id)?;
            let view = ctx
                .app
                .open_comments(&kind, post_id)
                .ok_or_else(|| anyhow!("post {post_id} not found"))?;
            ctx.app.set_comment_draft(view, content.join(" "));
            if !ctx.app.submit_comment(view) {
                bail!("comment is empty");
            }
            ctx.settle()?;
            let thread = ctx
                .app
                .comment_thread(view)
                .ok_or_else(|| anyhow!("comment thread closed"))?;
            if let Some(message) = &thread.error {
                bail!("could not comment: {message}");
            }
            println!("{}", render::comments(thread.comments(), ctx.app.session()));
            ctx.app.close_comments(view);
        }
        Command::Comments { post_id } => {
            let post_id = PostId(post_id);
            let kind = ctx.locate_post(post_id)?;
            if let Some(post) = ctx.app.store(&kind).and_then(|s| s.post(post_id)) {
                println!("{}", render::comments(&post.comments, ctx.app.session()));
            }
        }
        Command::EditComment {
            post_id,
            comment_id,
            content,
        } => {
            ctx.ensure_user()?;
            let post_id = PostId(post_id);
            let comment_id = CommentId(comment_id);
            let kind = ctx.locate_post(post_id)?;
            let view = ctx
                .app
                .open_comments(&kind, post_id)
                .ok_or_else(|| anyhow!("post {post_id} not found"))?;
            ctx.app.begin_edit(view, comment_id)?;
            ctx.app.set_edit_content(view, content.join(" "));
            if !ctx.app.save_edit(view) {
                bail!("comment text is empty");
            }
            ctx.settle()?;
            let thread = ctx
                .app
                .comment_thread(view)
                .ok_or_else(|| anyhow!("comment thread closed"))?;
            if let Some(message) = &thread.error {
                bail!("could not save comment {comment_id}: {message}");
            }
            println!("{}", render::comments(thread.comments(), ctx.app.session()));
            ctx.app.close_comments(view);
        }
        Command::Profile { user_id } => {
            ctx.open_profile(&user_id)?;
            if let Some(profile) = ctx.app.profile() {
                if let Some(user) = &profile.user {
                    println!(
                        "{}",
                        render::profile(user, ctx.app.api(), profile.follower_count())
                    );
                }
                println!();
                println!("{}", render::posts(profile.posts.posts(), ctx.app.session()));
            }
        }
        Command::Followers { user_id } => {
            ctx.open_profile(&user_id)?;
            if let Some(profile) = ctx.app.profile() {
                println!("{}", render::users(&profile.followers));
            }
        }
        Command::Following { user_id } => {
            ctx.open_profile(&user_id)?;
            ctx.app.load_following();
            ctx.settle()?;
            if let Some(profile) = ctx.app.profile() {
                println!("{}", render::users(&profile.following));
            }
        }
        Command::Follow { user_id } => change_follow(ctx, &user_id, true)?,
        Command::Unfollow { user_id } => change_follow(ctx, &user_id, false)?,
        Command::Search { query } => {
            ctx.app.set_search_query(query);
            ctx.settle()?;
            let search = ctx.app.search();
            if let Some(message) = &search.error {
                bail!("search failed: {message}");
            }
            println!("{}", render::users(&search.results));
        }
        Command::Avatar { path } => {
            ctx.ensure_user()?;
            ctx.app.api().upload_profile_picture(&path)?;
            println!("Profile picture updated.");
        }
        Command::Shell => bail!("already in a shell"),
    }
    Ok(())
}

fn change_follow(ctx: &mut Context, user_id: &str, follow: bool) -> Result<()> {
    let me = ctx.ensure_user()?;
    if me.as_str() == user_id.trim() {
        bail!("you cannot follow yourself");
    }
    ctx.open_profile(user_id)?;
    let started = if follow {
        ctx.app.follow()
    } else {
        ctx.app.unfollow()
    };
    if !started {
        bail!("another follow change is still in progress");
    }
    ctx.settle()?;
    let profile = ctx
        .app
        .profile()
        .ok_or_else(|| anyhow!("profile {user_id} closed"))?;
    if let Some(message) = &profile.error {
        bail!("{message}");
    }
    let state = if profile.is_following {
        "Following"
    } else {
        "Not following"
    };
    println!("{state} {user_id} ({} followers)", profile.follower_count());
    Ok(())
}
