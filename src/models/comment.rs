use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Cleaned comment fields, ready to be stored. Every field may be empty.
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub name: String,
    pub email: String,
    pub body: String,
}

/// A comment together with the title of the post it was left on, used by the
/// moderation listing.
#[derive(Debug, Clone, Serialize)]
pub struct CommentWithPost {
    #[serde(flatten)]
    pub comment: Comment,
    pub post_title: String,
}

impl std::fmt::Display for CommentWithPost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "comment by {} on {}", self.comment.name, self.post_title)
    }
}
