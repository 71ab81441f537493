use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    comment_from_response, Comment, CommentId, CreateCommentInput, CreatePostInput, FollowEntry,
    FollowInput, ForgotPasswordInput, LikeInput, Listing, LoginInput, LoginResponse, Post,
    PostId, PostResponse, RegisterInput, UpdateCommentInput, User, UserId,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Backend operations the feed and profile logic depend on.
///
/// Implementations block the calling thread; `KinetApp` only ever calls them
/// from background tasks.
pub trait SocialApi: Clone + Send + 'static {
    fn current_user(&self) -> ApiResult<User>;
    fn fetch_posts(&self, page: u32) -> ApiResult<Vec<Post>>;
    fn fetch_my_posts(&self) -> ApiResult<Vec<Post>>;
    fn fetch_user(&self, user_id: &UserId) -> ApiResult<User>;
    fn fetch_user_posts(&self, user_id: &UserId) -> ApiResult<Vec<Post>>;
    fn create_post(&self, content: &str) -> ApiResult<Post>;
    fn like_post(&self, post_id: PostId) -> ApiResult<()>;
    fn unlike_post(&self, post_id: PostId) -> ApiResult<()>;
    fn add_comment(&self, post_id: PostId, content: &str) -> ApiResult<Option<Comment>>;
    fn update_comment(&self, comment_id: CommentId, content: &str) -> ApiResult<Option<Comment>>;
    fn followers(&self, user_id: &UserId) -> ApiResult<Vec<User>>;
    fn following(&self, user_id: &UserId) -> ApiResult<Vec<User>>;
    fn follow(&self, followed: &UserId, follower: &UserId) -> ApiResult<()>;
    fn unfollow(&self, followed: &UserId, follower: &UserId) -> ApiResult<()>;
    fn search_users(&self, query: &str) -> ApiResult<Vec<User>>;
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let base = sanitize_base_url(base_url.into())?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base,
            token: None,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.trim().is_empty());
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    /// Absolute URL for a profile picture or other server-hosted asset.
    pub fn asset_url(&self, path: &str) -> String {
        resolve_asset_url(&self.base_url, path)
    }

    pub fn login(&self, username_or_email: &str, password: &str) -> ApiResult<LoginResponse> {
        let url = self.url("/login")?;
        let input = LoginInput {
            username_or_email: username_or_email.to_string(),
            password: password.to_string(),
        };
        let response = self.send(self.client.post(url).json(&input))?;
        read_json(response)
    }

    pub fn register(&self, input: &RegisterInput) -> ApiResult<()> {
        let url = self.url("/register")?;
        self.send(self.client.post(url).json(input))?;
        Ok(())
    }

    pub fn forgot_password(&self, email: &str) -> ApiResult<()> {
        let url = self.url("/forgot-password")?;
        let input = ForgotPasswordInput {
            email: email.to_string(),
        };
        self.send(self.client.post(url).json(&input))?;
        Ok(())
    }

    pub fn logout(&self) -> ApiResult<()> {
        let url = self.url("/logout")?;
        self.send(self.client.post(url))?;
        Ok(())
    }

    pub fn upload_profile_picture(&self, path: &Path) -> anyhow::Result<()> {
        let url = self.url("/profile/update-picture")?;
        let form = multipart::Form::new().file("profile_picture", path)?;
        self.send(self.client.post(url).multipart(form))?;
        Ok(())
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|_| ApiError::InvalidUrl(joined))
    }

    fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .unwrap_or_else(|_| "Unable to read body".to_string());
        log::debug!("request rejected with {status}: {body}");
        Err(ApiError::rejected(status.as_u16(), &body))
    }

    fn get_list<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Vec<T>> {
        let url = self.url(path)?;
        let response = self.send(self.client.get(url))?;
        let listing: Listing<T> = read_json(response)?;
        Ok(listing.into_vec())
    }

    fn get_users(&self, path: &str) -> ApiResult<Vec<User>> {
        let entries: Vec<FollowEntry> = self.get_list(path)?;
        Ok(entries.into_iter().map(FollowEntry::into_user).collect())
    }
}

impl SocialApi for ApiClient {
    fn current_user(&self) -> ApiResult<User> {
        let url = self.url("/fetchuser")?;
        let response = self.send(self.client.get(url))?;
        read_json(response)
    }

    fn fetch_posts(&self, page: u32) -> ApiResult<Vec<Post>> {
        let url = self.url("/posts")?;
        let response = self.send(self.client.get(url).query(&[("page", page)]))?;
        let listing: Listing<Post> = read_json(response)?;
        Ok(listing.into_vec())
    }

    fn fetch_my_posts(&self) -> ApiResult<Vec<Post>> {
        self.get_list("/my-posts")
    }

    fn fetch_user(&self, user_id: &UserId) -> ApiResult<User> {
        let url = self.url(&format!("/user/{user_id}"))?;
        let response = self.send(self.client.get(url))?;
        read_json(response)
    }

    fn fetch_user_posts(&self, user_id: &UserId) -> ApiResult<Vec<Post>> {
        self.get_list(&format!("/user/{user_id}/posts"))
    }

    fn create_post(&self, content: &str) -> ApiResult<Post> {
        let url = self.url("/posts")?;
        let input = CreatePostInput {
            content: content.to_string(),
        };
        let response = self.send(self.client.post(url).json(&input))?;
        let wrapper: PostResponse = read_json(response)?;
        Ok(wrapper.post)
    }

    fn like_post(&self, post_id: PostId) -> ApiResult<()> {
        let url = self.url("/likes")?;
        self.send(self.client.post(url).json(&LikeInput { post_id }))?;
        Ok(())
    }

    fn unlike_post(&self, post_id: PostId) -> ApiResult<()> {
        let url = self.url("/likes")?;
        self.send(self.client.delete(url).json(&LikeInput { post_id }))?;
        Ok(())
    }

    fn add_comment(&self, post_id: PostId, content: &str) -> ApiResult<Option<Comment>> {
        let url = self.url("/comments")?;
        let input = CreateCommentInput {
            post_id,
            content: content.to_string(),
        };
        let response = self.send(self.client.post(url).json(&input))?;
        read_optional_comment(response)
    }

    fn update_comment(&self, comment_id: CommentId, content: &str) -> ApiResult<Option<Comment>> {
        let url = self.url(&format!("/comments/{comment_id}"))?;
        let input = UpdateCommentInput {
            content: content.to_string(),
        };
        let response = self.send(self.client.put(url).json(&input))?;
        read_optional_comment(response)
    }

    fn followers(&self, user_id: &UserId) -> ApiResult<Vec<User>> {
        self.get_users(&format!("/user/{user_id}/followers"))
    }

    fn following(&self, user_id: &UserId) -> ApiResult<Vec<User>> {
        self.get_users(&format!("/user/{user_id}/following"))
    }

    fn follow(&self, followed: &UserId, follower: &UserId) -> ApiResult<()> {
        let url = self.url("/follow")?;
        let input = FollowInput {
            follower_id: follower.clone(),
            followed_user_id: followed.clone(),
        };
        self.send(self.client.post(url).json(&input))?;
        Ok(())
    }

    fn unfollow(&self, followed: &UserId, follower: &UserId) -> ApiResult<()> {
        let url = self.url("/unfollow")?;
        let input = FollowInput {
            follower_id: follower.clone(),
            followed_user_id: followed.clone(),
        };
        self.send(self.client.delete(url).json(&input))?;
        Ok(())
    }

    fn search_users(&self, query: &str) -> ApiResult<Vec<User>> {
        let url = self.url("/user/search")?;
        let response = self.send(self.client.get(url).query(&[("q", query)]))?;
        let listing: Listing<User> = read_json(response)?;
        Ok(listing.into_vec())
    }
}

fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response.bytes()?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn read_optional_comment(response: Response) -> ApiResult<Option<Comment>> {
    let bytes = response.bytes()?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let body: Value = match serde_json::from_slice(&bytes) {
        Ok(body) => body,
        Err(err) => {
            log::debug!("comment response was not JSON: {err}");
            return Ok(None);
        }
    };
    Ok(comment_from_response(body))
}

fn sanitize_base_url(mut base: String) -> ApiResult<String> {
    base = base.trim().to_string();
    if !base.starts_with("http://") && !base.starts_with("https://") {
        base = format!("http://{base}");
    }
    while base.ends_with('/') {
        base.pop();
    }
    Url::parse(&base).map_err(|_| ApiError::InvalidUrl(base.clone()))?;
    Ok(base)
}

/// Assets live next to the API, not under it: `/storage/x.jpg` resolves
/// against the base URL with a trailing `/api` segment removed.
pub fn resolve_asset_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let root = base_url.strip_suffix("/api").unwrap_or(base_url);
    if path.starts_with('/') {
        format!("{root}{path}")
    } else {
        format!("{root}/{path}")
    }
}
