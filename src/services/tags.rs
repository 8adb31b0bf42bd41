use crate::models::{Post, PostWithTags, Tag, TagWithCount};
use crate::services::error::{BlogError, ServiceResult};
use crate::services::posts::{
    enrich_posts, placeholders, row_to_post, ID_CHUNK, POST_COLUMNS, VISIBLE,
};
use crate::services::slug::generate_slug;
use crate::Database;
use rusqlite::{Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};

pub const SIMILAR_POSTS_LIMIT: usize = 4;

fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
    })
}

pub fn get_tag_by_slug(db: &Database, slug: &str) -> ServiceResult<Option<Tag>> {
    let conn = db.get()?;
    let tag = conn
        .query_row(
            "SELECT id, name, slug FROM tags WHERE slug = ?",
            [slug],
            row_to_tag,
        )
        .optional()?;
    Ok(tag)
}

pub fn require_tag(db: &Database, slug: &str) -> ServiceResult<Tag> {
    get_tag_by_slug(db, slug)?.ok_or(BlogError::NotFound("tag"))
}

pub fn tags_for_post(db: &Database, post_id: i64) -> ServiceResult<Vec<Tag>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.slug FROM tags t JOIN post_tags pt ON t.id = pt.tag_id WHERE pt.post_id = ? ORDER BY t.name",
    )?;
    let tags = stmt
        .query_map([post_id], row_to_tag)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Replaces the tag set of a post, creating tags that do not exist yet.
/// Names are trimmed; names that slugify to nothing are skipped.
pub(crate) fn set_post_tags(
    conn: &Connection,
    post_id: i64,
    names: &[String],
) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM post_tags WHERE post_id = ?", [post_id])?;

    let mut seen = HashSet::new();
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let tag_slug = generate_slug(name);
        if tag_slug.is_empty() || !seen.insert(tag_slug.clone()) {
            continue;
        }
        conn.execute(
            "INSERT OR IGNORE INTO tags (name, slug) VALUES (?, ?)",
            (name, &tag_slug),
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO post_tags (post_id, tag_id) SELECT ?, id FROM tags WHERE slug = ?",
            (post_id, &tag_slug),
        )?;
    }
    Ok(())
}

/// A resolved tag and the published posts carrying it.
#[derive(Debug, Clone)]
pub struct TaggedPosts {
    pub tag: Tag,
    /// Newest first, not yet enriched.
    pub posts: Vec<Post>,
}

impl TaggedPosts {
    pub fn post_ids(&self) -> Vec<i64> {
        self.posts.iter().map(|p| p.id).collect()
    }
}

/// Published posts carrying the tag, newest first. An unknown slug is
/// `NotFound`.
pub fn posts_for_tag(db: &Database, tag_slug: &str) -> ServiceResult<TaggedPosts> {
    let tag = require_tag(db, tag_slug)?;
    let conn = db.get()?;
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {} FROM posts p
        JOIN post_tags pt ON pt.post_id = p.id
        WHERE pt.tag_id = ? AND {}
        ORDER BY p.published_at DESC, p.id DESC
        "#,
        POST_COLUMNS, VISIBLE
    ))?;
    let posts = stmt
        .query_map([tag.id], row_to_post)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TaggedPosts { tag, posts })
}

/// For each tag found on the given posts, how many of those posts carry it.
/// Most common first, then by name.
pub fn tag_counts_over(db: &Database, post_ids: &[i64]) -> ServiceResult<Vec<TagWithCount>> {
    let mut seen = HashSet::new();
    let ids: Vec<i64> = post_ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let conn = db.get()?;
    let mut counts: HashMap<i64, TagWithCount> = HashMap::new();
    for chunk in ids.chunks(ID_CHUNK) {
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT t.id, t.name, t.slug, COUNT(DISTINCT pt.post_id) AS count
            FROM tags t
            JOIN post_tags pt ON t.id = pt.tag_id
            WHERE pt.post_id IN ({})
            GROUP BY t.id
            "#,
            placeholders(chunk.len())
        ))?;
        let params: Vec<&dyn rusqlite::ToSql> =
            chunk.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok((row_to_tag(row)?, row.get::<_, i64>(3)?))
        })?;
        for row in rows {
            let (tag, count) = row?;
            counts
                .entry(tag.id)
                .or_insert_with(|| TagWithCount { tag, count: 0 })
                .count += count;
        }
    }

    let mut tags: Vec<TagWithCount> = counts.into_values().collect();
    tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.name.cmp(&b.tag.name)));
    Ok(tags)
}

/// Tag counts over every published post.
pub fn tag_counts_over_published(db: &Database) -> ServiceResult<Vec<TagWithCount>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT t.id, t.name, t.slug, COUNT(DISTINCT p.id) AS count
        FROM tags t
        JOIN post_tags pt ON t.id = pt.tag_id
        JOIN posts p ON p.id = pt.post_id
        WHERE {}
        GROUP BY t.id
        ORDER BY count DESC, t.name
        "#,
        VISIBLE
    ))?;
    let tags = stmt
        .query_map([], |row| {
            Ok(TagWithCount {
                tag: row_to_tag(row)?,
                count: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Other published posts sharing at least one tag with `post`, most shared
/// tags first, then newest first.
pub fn similar_posts(db: &Database, post: &Post, limit: usize) -> ServiceResult<Vec<PostWithTags>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {}, COUNT(pt.tag_id) AS same_tags
        FROM posts p
        JOIN post_tags pt ON pt.post_id = p.id
        WHERE pt.tag_id IN (SELECT tag_id FROM post_tags WHERE post_id = ?)
          AND p.id != ?
          AND {}
        GROUP BY p.id
        ORDER BY same_tags DESC, p.published_at DESC, p.id DESC
        LIMIT ?
        "#,
        POST_COLUMNS, VISIBLE
    ))?;
    let posts = stmt
        .query_map((post.id, post.id, limit), row_to_post)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(enrich_posts(&conn, posts)?)
}
