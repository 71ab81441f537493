use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// User identifier as a normalised string.
///
/// Different endpoints send user ids as JSON numbers or as strings
/// (`7` vs `"7"`). Both decode to the same value so comparisons never depend
/// on which endpoint a record came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Numeric ids go back out as numbers, the way the server sent them.
        match self.0.parse::<i64>() {
            Ok(n) => serializer.serialize_i64(n),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Uint(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => UserId(n.to_string()),
            Raw::Uint(n) => UserId(n.to_string()),
            Raw::Text(text) => UserId::new(text),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub u64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            format!("{full} ({})", self.username)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "user", default)]
    pub author: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    #[serde(rename = "user")]
    pub author: User,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub likes: Vec<Like>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn liked_by(&self, user_id: &UserId) -> bool {
        self.likes.iter().any(|like| &like.user_id == user_id)
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    /// Adds or removes the like for `user_id`. Returns whether anything changed.
    pub fn set_liked(&mut self, user_id: &UserId, liked: bool) -> bool {
        let present = self.liked_by(user_id);
        match (present, liked) {
            (false, true) => {
                self.likes.push(Like {
                    user_id: user_id.clone(),
                });
                true
            }
            (true, false) => {
                self.likes.retain(|like| &like.user_id != user_id);
                true
            }
            _ => false,
        }
    }

    /// Collapses duplicate likes and comments, keeping the first occurrence.
    pub fn normalize(mut self) -> Self {
        let mut seen_users = HashSet::new();
        self.likes.retain(|like| seen_users.insert(like.user_id.clone()));
        let mut seen_comments = HashSet::new();
        self.comments.retain(|c| seen_comments.insert(c.id));
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Unparseable timestamps are dropped rather than failing the whole post.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(text)) => DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        _ => None,
    })
}

/// A list endpoint either wraps its payload (`{"data": [...]}`) or returns
/// the bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Wrapped { data } => data,
            Listing::Bare(items) => items,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostResponse {
    pub post: Post,
}

/// Comment endpoints answer with `{"comment": ..}`, `{"data": ..}`, the bare
/// comment, or something with no usable comment at all.
pub fn comment_from_response(body: Value) -> Option<Comment> {
    let candidate = match body {
        Value::Object(mut map) => {
            if let Some(inner) = map.remove("comment") {
                inner
            } else if let Some(inner) = map.remove("data") {
                inner
            } else {
                Value::Object(map)
            }
        }
        other => other,
    };
    serde_json::from_value(candidate).ok()
}

/// One entry of a followers/following listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FollowEntry {
    Follower { follower: User },
    Followed { followed_user: User },
    Following { following: User },
    Bare(User),
}

impl FollowEntry {
    pub fn into_user(self) -> User {
        match self {
            FollowEntry::Follower { follower } => follower,
            FollowEntry::Followed { followed_user } => followed_user,
            FollowEntry::Following { following } => following,
            FollowEntry::Bare(user) => user,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePostInput {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeInput {
    pub post_id: PostId,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCommentInput {
    pub post_id: PostId,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateCommentInput {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowInput {
    pub follower_id: UserId,
    pub followed_user_id: UserId,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginInput {
    #[serde(rename = "usernameoremail")]
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub gender: String,
    pub birthdate: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordInput {
    pub email: String,
}
