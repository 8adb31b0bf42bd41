use crate::db::{format_timestamp, next_update_timestamp, now_timestamp};
use crate::models::{CreatePost, Post, PostStatus, PostWithTags, Tag, UpdatePost};
use crate::services::error::{BlogError, ServiceResult};
use crate::services::forms::FieldErrors;
use crate::services::slug::{generate_slug, validate_slug};
use crate::services::tags::set_post_tags;
use crate::Database;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;

pub(crate) const POST_COLUMNS: &str =
    "p.id, p.title, p.slug, p.author, p.body, p.image, p.status, p.published_at, p.created_at, p.updated_at";

/// The visibility filter. Every public read path restricts on this clause.
pub(crate) const VISIBLE: &str = "p.status = 'published'";

pub(crate) fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        author: row.get(3)?,
        body: row.get(4)?,
        image: row.get(5)?,
        status: row
            .get::<_, String>(6)?
            .parse()
            .unwrap_or(PostStatus::Draft),
        published_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn check_post_fields(
    errors: &mut FieldErrors,
    title: &str,
    slug: &str,
    author: Option<&str>,
) {
    if title.trim().is_empty() {
        errors.add("title", "This field is required.");
    } else if title.chars().count() > 255 {
        errors.add("title", "Ensure this value has at most 255 characters.");
    }
    if !validate_slug(slug) {
        errors.add(
            "slug",
            "Invalid slug: must be 1-255 characters, lowercase letters, numbers, and hyphens only",
        );
    }
    if let Some(author) = author {
        if author.trim().is_empty() {
            errors.add("author", "This field is required.");
        }
    }
}

fn slug_taken_for_date(
    conn: &Connection,
    slug: &str,
    published_at: &str,
    exclude_id: Option<i64>,
) -> rusqlite::Result<bool> {
    let day = published_at.get(..10).unwrap_or(published_at);
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE slug = ? AND substr(published_at, 1, 10) = ? AND id != ?",
        (slug, day, exclude_id.unwrap_or(-1)),
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn create_post(db: &Database, input: CreatePost) -> ServiceResult<i64> {
    let slug = input
        .slug
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| generate_slug(&input.title));
    let published_at = input
        .published_at
        .map(|dt| format_timestamp(&dt))
        .unwrap_or_else(now_timestamp);

    let conn = db.get()?;

    let mut errors = FieldErrors::new();
    check_post_fields(&mut errors, &input.title, &slug, Some(&input.author));
    if errors.is_empty() && slug_taken_for_date(&conn, &slug, &published_at, None)? {
        errors.add("slug", "Slug must be unique for the publish date.");
    }
    if !errors.is_empty() {
        return Err(BlogError::Validation(errors));
    }

    let now = now_timestamp();
    conn.execute(
        r#"
        INSERT INTO posts (title, slug, author, body, image, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        (
            input.title.trim(),
            &slug,
            input.author.trim(),
            &input.body,
            &input.image,
            input.status.to_string(),
            &published_at,
            &now,
            &now,
        ),
    )?;

    let post_id = conn.last_insert_rowid();
    set_post_tags(&conn, post_id, &input.tags)?;

    tracing::info!(post_id, slug = %slug, status = %input.status, "Created post");
    Ok(post_id)
}

pub fn update_post(db: &Database, id: i64, input: UpdatePost) -> ServiceResult<()> {
    let conn = db.get()?;
    let current = fetch_post(&conn, id)?.ok_or(BlogError::NotFound("post"))?;

    let title = input.title.unwrap_or(current.title);
    let slug = input.slug.unwrap_or(current.slug);
    let body = input.body.unwrap_or(current.body);
    let image = input.image.or(current.image);
    let status = input.status.unwrap_or(current.status);
    let published_at = input
        .published_at
        .map(|dt| format_timestamp(&dt))
        .unwrap_or(current.published_at);

    let mut errors = FieldErrors::new();
    check_post_fields(&mut errors, &title, &slug, None);
    if errors.is_empty() && slug_taken_for_date(&conn, &slug, &published_at, Some(id))? {
        errors.add("slug", "Slug must be unique for the publish date.");
    }
    if !errors.is_empty() {
        return Err(BlogError::Validation(errors));
    }

    conn.execute(
        r#"
        UPDATE posts SET title = ?, slug = ?, body = ?, image = ?, status = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
        (
            title.trim(),
            &slug,
            &body,
            &image,
            status.to_string(),
            &published_at,
            next_update_timestamp(&current.updated_at),
            id,
        ),
    )?;

    if let Some(tags) = input.tags {
        set_post_tags(&conn, id, &tags)?;
    }

    tracing::info!(post_id = id, "Updated post");
    Ok(())
}

pub fn publish_post(db: &Database, id: i64) -> ServiceResult<()> {
    update_post(
        db,
        id,
        UpdatePost {
            status: Some(PostStatus::Published),
            ..Default::default()
        },
    )
}

/// Deletes a post. Comments and images go with it; tags stay.
pub fn delete_post(db: &Database, id: i64) -> ServiceResult<()> {
    let conn = db.get()?;
    let deleted = conn.execute("DELETE FROM posts WHERE id = ?", [id])?;
    if deleted == 0 {
        return Err(BlogError::NotFound("post"));
    }
    tracing::info!(post_id = id, "Deleted post");
    Ok(())
}

fn fetch_post(conn: &Connection, id: i64) -> rusqlite::Result<Option<Post>> {
    conn.query_row(
        &format!("SELECT {} FROM posts p WHERE p.id = ?", POST_COLUMNS),
        [id],
        row_to_post,
    )
    .optional()
}

/// Looks a post up regardless of its status. Authoring tools only.
pub fn get_post(db: &Database, id: i64) -> ServiceResult<Option<Post>> {
    let conn = db.get()?;
    Ok(fetch_post(&conn, id)?)
}

/// Every published post, newest first.
pub fn published_posts(db: &Database) -> ServiceResult<Vec<Post>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts p WHERE {} ORDER BY p.published_at DESC, p.id DESC",
        POST_COLUMNS, VISIBLE
    ))?;
    let posts = stmt
        .query_map([], row_to_post)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn get_published_post(db: &Database, id: i64) -> ServiceResult<Post> {
    let conn = db.get()?;
    fetch_post(&conn, id)?
        .filter(|post| post.status.is_visible())
        .ok_or(BlogError::NotFound("post"))
}

pub fn get_published_post_by_date(
    db: &Database,
    year: i32,
    month: u32,
    day: u32,
    slug: &str,
) -> ServiceResult<Post> {
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(BlogError::NotFound("post"))?;
    let conn = db.get()?;
    conn.query_row(
        &format!(
            "SELECT {} FROM posts p WHERE p.slug = ? AND substr(p.published_at, 1, 10) = ? AND {}",
            POST_COLUMNS, VISIBLE
        ),
        (slug, date.format("%Y-%m-%d").to_string()),
        row_to_post,
    )
    .optional()?
    .ok_or(BlogError::NotFound("post"))
}

/// One window of the public listing, newest first.
pub fn list_published_posts(
    db: &Database,
    limit: usize,
    offset: usize,
) -> ServiceResult<Vec<PostWithTags>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts p WHERE {} ORDER BY p.published_at DESC, p.id DESC LIMIT ? OFFSET ?",
        POST_COLUMNS, VISIBLE
    ))?;
    let posts = stmt
        .query_map((limit, offset), row_to_post)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(enrich_posts(&conn, posts)?)
}

pub fn count_published_posts(db: &Database) -> ServiceResult<usize> {
    let conn = db.get()?;
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM posts p WHERE {}", VISIBLE),
        [],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

pub fn latest_published_posts(db: &Database, count: usize) -> ServiceResult<Vec<PostWithTags>> {
    list_published_posts(db, count, 0)
}

/// All posts for the authoring listing: drafts first, then by publish date,
/// optionally narrowed by a title/body substring.
pub fn list_posts(
    db: &Database,
    status: Option<PostStatus>,
    search: Option<&str>,
) -> ServiceResult<Vec<Post>> {
    let conn = db.get()?;

    let mut sql = format!("SELECT {} FROM posts p WHERE 1=1", POST_COLUMNS);
    let mut params: Vec<String> = Vec::new();

    if let Some(s) = status {
        sql.push_str(" AND p.status = ?");
        params.push(s.to_string());
    }
    if let Some(term) = search.filter(|t| !t.is_empty()) {
        sql.push_str(" AND (p.title LIKE ? OR p.body LIKE ?)");
        let pattern = format!("%{}%", term);
        params.push(pattern.clone());
        params.push(pattern);
    }

    sql.push_str(" ORDER BY p.status, p.published_at");

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> =
        params.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

    let posts = stmt
        .query_map(param_refs.as_slice(), row_to_post)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// Largest id list bound into a single `IN (...)` clause. SQLite's default
/// limit on bound parameters is 999 on older builds.
pub(crate) const ID_CHUNK: usize = 500;

pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

/// Attaches tags, the active comment count and the canonical URL to each
/// post, batching the lookups over the whole set.
pub(crate) fn enrich_posts(
    conn: &Connection,
    posts: Vec<Post>,
) -> rusqlite::Result<Vec<PostWithTags>> {
    if posts.is_empty() {
        return Ok(vec![]);
    }

    let post_ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let mut tags_by_post: HashMap<i64, Vec<Tag>> = HashMap::new();
    let mut comments_by_post: HashMap<i64, i64> = HashMap::new();

    for chunk in post_ids.chunks(ID_CHUNK) {
        let params: Vec<&dyn rusqlite::ToSql> =
            chunk.iter().map(|id| id as &dyn rusqlite::ToSql).collect();

        let mut tag_stmt = conn.prepare(&format!(
            r#"
            SELECT pt.post_id, t.id, t.name, t.slug
            FROM tags t
            JOIN post_tags pt ON t.id = pt.tag_id
            WHERE pt.post_id IN ({})
            ORDER BY t.name
            "#,
            placeholders(chunk.len())
        ))?;
        let tag_rows = tag_stmt.query_map(params.as_slice(), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Tag {
                    id: row.get(1)?,
                    name: row.get(2)?,
                    slug: row.get(3)?,
                },
            ))
        })?;
        for row in tag_rows {
            let (post_id, tag) = row?;
            tags_by_post.entry(post_id).or_default().push(tag);
        }

        let mut count_stmt = conn.prepare(&format!(
            "SELECT post_id, COUNT(*) FROM comments WHERE active = 1 AND post_id IN ({}) GROUP BY post_id",
            placeholders(chunk.len())
        ))?;
        let count_rows = count_stmt.query_map(params.as_slice(), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in count_rows {
            let (post_id, count) = row?;
            comments_by_post.insert(post_id, count);
        }
    }

    Ok(posts
        .into_iter()
        .map(|post| {
            let tags = tags_by_post.remove(&post.id).unwrap_or_default();
            let comment_count = comments_by_post.get(&post.id).copied().unwrap_or(0);
            let url = post.absolute_url();
            PostWithTags {
                post,
                tags,
                comment_count,
                url,
            }
        })
        .collect())
}

pub fn enrich(db: &Database, posts: Vec<Post>) -> ServiceResult<Vec<PostWithTags>> {
    let conn = db.get()?;
    Ok(enrich_posts(&conn, posts)?)
}
