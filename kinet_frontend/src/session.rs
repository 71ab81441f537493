use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::{Comment, User, UserId};

/// Who is signed in. Owned by `KinetApp` and handed by reference to the
/// stores and comment threads that need it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    pub fn new(user: Option<User>) -> Self {
        Self { user }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(|u| &u.id)
    }

    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    pub fn is_current(&self, user_id: &UserId) -> bool {
        self.user_id() == Some(user_id)
    }

    /// Only a comment's own author gets the edit affordance. The server
    /// enforces authorship independently.
    pub fn can_edit(&self, comment: &Comment) -> bool {
        comment
            .author
            .as_ref()
            .is_some_and(|author| self.is_current(&author.id))
    }

    /// Posts by the signed-in user show the fresher local profile (e.g. a
    /// just-uploaded avatar) instead of the copy embedded in the post.
    pub fn display_author<'a>(&'a self, author: &'a User) -> &'a User {
        match &self.user {
            Some(me) if me.id == author.id => me,
            _ => author,
        }
    }
}

/// File-backed bearer token storage.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$DATA_DIR/kinet/token`, falling back to `.kinet/token`.
    pub fn default_path() -> PathBuf {
        match dirs::data_dir() {
            Some(dir) => dir.join("kinet").join("token"),
            None => PathBuf::from(".kinet").join("token"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read token from {}", self.path.display()))?;
        let token = raw.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }

    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, token.trim())
            .with_context(|| format!("failed to write token to {}", self.path.display()))
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommentId;

    fn user(id: &str) -> User {
        User {
            id: UserId::new(id),
            username: format!("user{id}"),
            ..Default::default()
        }
    }

    #[test]
    fn only_author_can_edit() {
        let session = Session::new(Some(user("7")));
        let mine = Comment {
            id: CommentId(1),
            content: "x".into(),
            author: Some(user("7")),
        };
        let theirs = Comment {
            id: CommentId(2),
            content: "y".into(),
            author: Some(user("8")),
        };
        let anonymous = Comment {
            id: CommentId(3),
            content: "z".into(),
            author: None,
        };
        assert!(session.can_edit(&mine));
        assert!(!session.can_edit(&theirs));
        assert!(!session.can_edit(&anonymous));
        assert!(!Session::default().can_edit(&mine));
    }

    #[test]
    fn display_author_prefers_session_profile() {
        let mut me = user("7");
        me.profile_picture = Some("/storage/new.jpg".into());
        let session = Session::new(Some(me));
        let embedded = user("7");
        assert_eq!(
            session.display_author(&embedded).profile_picture.as_deref(),
            Some("/storage/new.jpg")
        );
        let other = user("9");
        assert_eq!(session.display_author(&other).id, other.id);
    }

    #[test]
    fn token_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("kinet").join("token"));
        assert_eq!(store.load().unwrap(), None);
        store.save("abc\n").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("abc"));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
