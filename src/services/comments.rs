use crate::db::{next_update_timestamp, now_timestamp};
use crate::models::{Comment, CommentWithPost};
use crate::services::error::{BlogError, ServiceResult};
use crate::services::forms::CommentForm;
use crate::services::posts::VISIBLE;
use crate::Database;
use rusqlite::{Connection, OptionalExtension};

const COMMENT_COLUMNS: &str =
    "c.id, c.post_id, c.name, c.email, c.body, c.active, c.created_at, c.updated_at";

fn row_to_comment(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        body: row.get(4)?,
        active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn fetch_comment(conn: &Connection, id: i64) -> rusqlite::Result<Option<Comment>> {
    conn.query_row(
        &format!("SELECT {} FROM comments c WHERE c.id = ?", COMMENT_COLUMNS),
        [id],
        row_to_comment,
    )
    .optional()
}

/// Appends a visitor comment to a published post.
///
/// The post is checked first, so a draft or unknown post is reported as
/// `NotFound` even when the form is also invalid. Comments are visible as
/// soon as they are stored.
pub fn submit_comment(db: &Database, post_id: i64, form: &CommentForm) -> ServiceResult<Comment> {
    let conn = db.get()?;

    let visible: Option<i64> = conn
        .query_row(
            &format!("SELECT p.id FROM posts p WHERE p.id = ? AND {}", VISIBLE),
            [post_id],
            |row| row.get(0),
        )
        .optional()?;
    if visible.is_none() {
        return Err(BlogError::NotFound("post"));
    }

    let input = form.validate()?;
    let now = now_timestamp();
    conn.execute(
        r#"
        INSERT INTO comments (post_id, name, email, body, active, created_at, updated_at)
        VALUES (?, ?, ?, ?, 1, ?, ?)
        "#,
        (post_id, &input.name, &input.email, &input.body, &now, &now),
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(comment_id = id, post_id, "Comment received");

    fetch_comment(&conn, id)?
        .ok_or_else(|| BlogError::Store(anyhow::anyhow!("comment {} vanished after insert", id)))
}

/// Active comments of a post, newest first.
pub fn active_comments(db: &Database, post_id: i64) -> ServiceResult<Vec<Comment>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM comments c WHERE c.post_id = ? AND c.active = 1 ORDER BY c.created_at DESC, c.id DESC",
        COMMENT_COLUMNS
    ))?;
    let comments = stmt
        .query_map([post_id], row_to_comment)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

/// Moderation listing across posts, newest first.
pub fn list_comments(
    db: &Database,
    post_id: Option<i64>,
    active: Option<bool>,
) -> ServiceResult<Vec<CommentWithPost>> {
    let conn = db.get()?;

    let mut sql = format!(
        "SELECT {}, p.title FROM comments c JOIN posts p ON p.id = c.post_id WHERE 1=1",
        COMMENT_COLUMNS
    );
    let mut params: Vec<i64> = Vec::new();
    if let Some(id) = post_id {
        sql.push_str(" AND c.post_id = ?");
        params.push(id);
    }
    if let Some(active) = active {
        sql.push_str(" AND c.active = ?");
        params.push(i64::from(active));
    }
    sql.push_str(" ORDER BY c.created_at DESC, c.id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> =
        params.iter().map(|p| p as &dyn rusqlite::ToSql).collect();
    let comments = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(CommentWithPost {
                comment: row_to_comment(row)?,
                post_title: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

pub fn set_comment_active(db: &Database, id: i64, active: bool) -> ServiceResult<()> {
    let conn = db.get()?;
    let current = fetch_comment(&conn, id)?.ok_or(BlogError::NotFound("comment"))?;
    conn.execute(
        "UPDATE comments SET active = ?, updated_at = ? WHERE id = ?",
        (active, next_update_timestamp(&current.updated_at), id),
    )?;
    tracing::info!(comment_id = id, active, "Comment moderated");
    Ok(())
}

pub fn delete_comment(db: &Database, id: i64) -> ServiceResult<()> {
    let conn = db.get()?;
    if conn.execute("DELETE FROM comments WHERE id = ?", [id])? == 0 {
        return Err(BlogError::NotFound("comment"));
    }
    Ok(())
}
