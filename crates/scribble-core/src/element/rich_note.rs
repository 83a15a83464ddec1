//! Rich-text notes with threaded comments.

use crate::sync::now_millis;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for comments.
pub type CommentId = Uuid;

/// Errors from comment operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentError {
    #[error("Comment not found: {0}")]
    NotFound(CommentId),
    #[error("Only the author may delete comment {0}")]
    NotAuthor(CommentId),
    #[error("No rich note with id {0}")]
    NoteNotFound(Uuid),
}

/// A single comment in a note's thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    /// Display name of the author.
    pub author: String,
    pub author_id: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    #[serde(default)]
    pub resolved: bool,
}

/// Payload of a rich-note element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichNote {
    pub id: Uuid,
    /// Rich text markup, stored verbatim.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub last_edited_by: String,
    /// Milliseconds since the Unix epoch.
    pub last_edited_at: u64,
}

impl RichNote {
    /// Create an empty note owned by `author_id`.
    pub fn new(author_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: String::new(),
            comments: Vec::new(),
            last_edited_by: author_id.to_string(),
            last_edited_at: now_millis(),
        }
    }

    /// Replace the note content and stamp the editor.
    pub fn set_content(&mut self, content: impl Into<String>, editor_id: &str) {
        self.content = content.into();
        self.last_edited_by = editor_id.to_string();
        self.last_edited_at = now_millis();
    }

    /// Append a new unresolved comment and return its id.
    pub fn add_comment(&mut self, text: impl Into<String>, author: &str, author_id: &str) -> CommentId {
        let comment = Comment {
            id: Uuid::new_v4(),
            text: text.into(),
            author: author.to_string(),
            author_id: author_id.to_string(),
            timestamp: now_millis(),
            resolved: false,
        };
        let id = comment.id;
        self.comments.push(comment);
        id
    }

    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    /// Flip the resolved flag. Any user may do this.
    /// Returns the new value.
    pub fn toggle_resolved(&mut self, id: CommentId) -> Result<bool, CommentError> {
        let comment = self
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CommentError::NotFound(id))?;
        comment.resolved = !comment.resolved;
        Ok(comment.resolved)
    }

    /// Delete a comment. Only its author may delete it.
    pub fn delete_comment(&mut self, id: CommentId, requester_id: &str) -> Result<Comment, CommentError> {
        let index = self
            .comments
            .iter()
            .position(|c| c.id == id)
            .ok_or(CommentError::NotFound(id))?;
        if self.comments[index].author_id != requester_id {
            return Err(CommentError::NotAuthor(id));
        }
        Ok(self.comments.remove(index))
    }

    /// Number of comments not yet resolved.
    pub fn open_comments(&self) -> usize {
        self.comments.iter().filter(|c| !c.resolved).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_comment_is_unresolved() {
        let mut note = RichNote::new("alice-id");
        let id = note.add_comment("looks good", "Alice", "alice-id");
        let comment = note.comment(id).unwrap();
        assert!(!comment.resolved);
        assert_eq!(comment.author, "Alice");
        assert_eq!(note.open_comments(), 1);
    }

    #[test]
    fn test_any_user_toggles_resolved() {
        let mut note = RichNote::new("alice-id");
        let id = note.add_comment("fix this", "Alice", "alice-id");
        assert_eq!(note.toggle_resolved(id), Ok(true));
        assert_eq!(note.open_comments(), 0);
        assert_eq!(note.toggle_resolved(id), Ok(false));
        let missing = Uuid::new_v4();
        assert_eq!(note.toggle_resolved(missing), Err(CommentError::NotFound(missing)));
    }

    #[test]
    fn test_only_author_deletes() {
        let mut note = RichNote::new("alice-id");
        let id = note.add_comment("mine", "Alice", "alice-id");
        assert_eq!(note.delete_comment(id, "bob-id"), Err(CommentError::NotAuthor(id)));
        assert_eq!(note.comments.len(), 1);
        let removed = note.delete_comment(id, "alice-id").unwrap();
        assert_eq!(removed.text, "mine");
        assert!(note.comments.is_empty());
        assert_eq!(note.delete_comment(id, "alice-id"), Err(CommentError::NotFound(id)));
    }

    #[test]
    fn test_set_content_stamps_editor() {
        let mut note = RichNote::new("alice-id");
        note.set_content("<p>hello</p>", "bob-id");
        assert_eq!(note.content, "<p>hello</p>");
        assert_eq!(note.last_edited_by, "bob-id");
    }
}
