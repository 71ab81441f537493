pub mod comments;
pub mod store;

pub use comments::{CommentEdit, CommentThread, EditPhase, EditRejected};
pub use store::{Applied, FeedError, FeedKind, FeedStore, FeedTicket, FetchMode, LikeToggle};

/// Trimmed user text, or `None` when there is nothing to send.
pub fn submission(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
