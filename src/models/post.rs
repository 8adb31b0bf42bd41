use super::Tag;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl PostStatus {
    /// Only published posts are ever shown to visitors.
    pub fn is_visible(self) -> bool {
        self == Self::Published
    }
}

impl FromStr for PostStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub author: String,
    pub body: String,
    pub image: Option<String>,
    pub status: PostStatus,
    pub published_at: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Post {
    pub fn published_date(&self) -> Option<NaiveDate> {
        DateTime::parse_from_rfc3339(&self.published_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    }

    /// Canonical public path, keyed on the publish date and the slug.
    pub fn absolute_url(&self) -> String {
        match self.published_date() {
            Some(date) => format!(
                "/blog/{}/{}/{}/{}/",
                date.year(),
                date.month(),
                date.day(),
                self.slug
            ),
            None => format!("/blog/{}/", self.slug),
        }
    }
}

impl std::fmt::Display for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostWithTags {
    #[serde(flatten)]
    pub post: Post,
    pub tags: Vec<Tag>,
    pub comment_count: i64,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct CreatePost {
    pub title: String,
    pub slug: Option<String>,
    pub author: String,
    pub body: String,
    pub image: Option<String>,
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub status: Option<PostStatus>,
    pub published_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}
