use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PostImage {
    pub id: i64,
    pub post_id: i64,
    pub image: String,
    pub created_at: String,
}

/// A post image joined with the title of the post it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct PostImageWithTitle {
    #[serde(flatten)]
    pub image: PostImage,
    pub post_title: String,
}

impl std::fmt::Display for PostImageWithTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.post_title)
    }
}
