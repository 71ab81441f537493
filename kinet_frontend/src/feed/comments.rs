use thiserror::Error;

use crate::error::ApiError;
use crate::models::{Comment, CommentId, Post, PostId};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Editing,
    Saving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentEdit {
    pub comment_id: CommentId,
    pub content: String,
    pub phase: EditPhase,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditRejected {
    #[error("comment {0} is not in this thread")]
    UnknownComment(CommentId),
    #[error("only the author can edit comment {0}")]
    NotAuthor(CommentId),
    #[error("comment {0} is still saving")]
    SaveInProgress(CommentId),
    #[error("comment thread is no longer open")]
    ThreadClosed,
}

/// Local shadow of one post's comments while its thread is open.
///
/// Adds and edits land here immediately; the next authoritative copy of the
/// post replaces the list wholesale.
#[derive(Debug)]
pub struct CommentThread {
    post_id: PostId,
    comments: Vec<Comment>,
    seeded_from: Vec<Comment>,
    draft: String,
    submitting: bool,
    edit: Option<CommentEdit>,
    pub error: Option<String>,
}

impl CommentThread {
    pub fn new(post: &Post) -> Self {
        Self {
            post_id: post.id,
            comments: post.comments.clone(),
            seeded_from: post.comments.clone(),
            draft: String::new(),
            submitting: false,
            edit: None,
            error: None,
        }
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn edit(&self) -> Option<&CommentEdit> {
        self.edit.as_ref()
    }

    /// Replaces the shadow list when the server's copy has changed.
    pub fn sync_from(&mut self, comments: &[Comment]) -> bool {
        if self.seeded_from.as_slice() == comments {
            return false;
        }
        self.seeded_from = comments.to_vec();
        self.comments = comments.to_vec();
        if let Some(edit) = &self.edit {
            if !self.comments.iter().any(|c| c.id == edit.comment_id) {
                self.edit = None;
            }
        }
        true
    }

    /// Trimmed draft ready to send, or `None` if it is blank or a submission
    /// is already in flight.
    pub fn begin_submit(&mut self) -> Option<String> {
        if self.submitting {
            return None;
        }
        let content = self.draft.trim();
        if content.is_empty() {
            return None;
        }
        self.submitting = true;
        self.error = None;
        Some(content.to_string())
    }

    /// On failure the draft stays so the user can retry.
    pub fn comment_added(&mut self, result: Result<Option<Comment>, &ApiError>) {
        self.submitting = false;
        match result {
            Ok(created) => {
                if let Some(comment) = created {
                    if !self.comments.iter().any(|c| c.id == comment.id) {
                        self.comments.push(comment);
                    }
                }
                self.draft.clear();
                self.error = None;
            }
            Err(err) => {
                self.error = Some(err.user_message());
            }
        }
    }

    pub fn begin_edit(
        &mut self,
        comment_id: CommentId,
        session: &Session,
    ) -> Result<(), EditRejected> {
        if let Some(edit) = &self.edit {
            if edit.phase == EditPhase::Saving {
                return Err(EditRejected::SaveInProgress(edit.comment_id));
            }
        }
        let comment = self
            .comments
            .iter()
            .find(|c| c.id == comment_id)
            .ok_or(EditRejected::UnknownComment(comment_id))?;
        if !session.can_edit(comment) {
            return Err(EditRejected::NotAuthor(comment_id));
        }
        self.edit = Some(CommentEdit {
            comment_id,
            content: comment.content.clone(),
            phase: EditPhase::Editing,
        });
        Ok(())
    }

    pub fn set_edit_content(&mut self, text: impl Into<String>) {
        if let Some(edit) = &mut self.edit {
            if edit.phase == EditPhase::Editing {
                edit.content = text.into();
            }
        }
    }

    /// Leaves edit mode; refused while a save is in flight.
    pub fn cancel_edit(&mut self) -> bool {
        match &self.edit {
            Some(edit) if edit.phase == EditPhase::Editing => {
                self.edit = None;
                true
            }
            _ => false,
        }
    }

    pub fn begin_save(&mut self) -> Option<(CommentId, String)> {
        let edit = self.edit.as_mut()?;
        if edit.phase != EditPhase::Editing {
            return None;
        }
        let content = edit.content.trim();
        if content.is_empty() {
            return None;
        }
        let content = content.to_string();
        edit.phase = EditPhase::Saving;
        self.error = None;
        Some((edit.comment_id, content))
    }

    /// Settles a save. The entry keeps its id, and its author when the
    /// response has none; a failure drops back to `Editing`.
    pub fn edit_saved(
        &mut self,
        comment_id: CommentId,
        submitted: &str,
        result: Result<Option<Comment>, &ApiError>,
    ) {
        let Some(edit) = self.edit.as_mut() else {
            return;
        };
        if edit.comment_id != comment_id || edit.phase != EditPhase::Saving {
            return;
        }
        match result {
            Ok(updated) => {
                if let Some(entry) = self.comments.iter_mut().find(|c| c.id == comment_id) {
                    match updated {
                        Some(updated) => {
                            entry.content = updated.content;
                            if updated.author.is_some() {
                                entry.author = updated.author;
                            }
                        }
                        None => entry.content = submitted.to_string(),
                    }
                }
                self.edit = None;
                self.error = None;
            }
            Err(err) => {
                edit.phase = EditPhase::Editing;
                self.error = Some(err.user_message());
            }
        }
    }
}
