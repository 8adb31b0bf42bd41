use crate::db::now_timestamp;
use crate::models::{PostImage, PostImageWithTitle};
use crate::services::error::{BlogError, ServiceResult};
use crate::services::forms::FieldErrors;
use crate::Database;
use rusqlite::OptionalExtension;
use std::path::Path;
use uuid::Uuid;

const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB

const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

fn row_to_image(row: &rusqlite::Row) -> rusqlite::Result<PostImage> {
    Ok(PostImage {
        id: row.get(0)?,
        post_id: row.get(1)?,
        image: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Records an image file that already lives in the media directory.
pub fn attach_image(db: &Database, post_id: i64, filename: &str) -> ServiceResult<PostImage> {
    let conn = db.get()?;
    let exists: Option<i64> = conn
        .query_row("SELECT id FROM posts WHERE id = ?", [post_id], |row| {
            row.get(0)
        })
        .optional()?;
    if exists.is_none() {
        return Err(BlogError::NotFound("post"));
    }

    let created_at = now_timestamp();
    conn.execute(
        "INSERT INTO post_images (post_id, image, created_at) VALUES (?, ?, ?)",
        (post_id, filename, &created_at),
    )?;

    Ok(PostImage {
        id: conn.last_insert_rowid(),
        post_id,
        image: filename.to_string(),
        created_at,
    })
}

/// Copies an image into the media directory under a fresh name and attaches
/// it to the post.
pub fn import_image(
    db: &Database,
    media_dir: &Path,
    post_id: i64,
    source: &Path,
) -> ServiceResult<PostImage> {
    let mut errors = FieldErrors::new();
    let mime = mime_guess::from_path(source).first_or_octet_stream();
    if !ALLOWED_MIME_TYPES.contains(&mime.essence_str()) {
        errors.add(
            "image",
            format!(
                "File type not allowed: {}. Allowed types: {}",
                mime.essence_str(),
                ALLOWED_MIME_TYPES.join(", ")
            ),
        );
        return Err(BlogError::Validation(errors));
    }

    let size = std::fs::metadata(source).map_err(anyhow::Error::from)?.len();
    if size > MAX_FILE_SIZE {
        errors.add(
            "image",
            format!("File too large: {} bytes (max {} bytes)", size, MAX_FILE_SIZE),
        );
        return Err(BlogError::Validation(errors));
    }

    let extension = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    let filename = if extension.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        format!("{}.{}", Uuid::new_v4(), extension)
    };

    std::fs::create_dir_all(media_dir).map_err(anyhow::Error::from)?;
    let target = media_dir.join(&filename);
    std::fs::copy(source, &target).map_err(anyhow::Error::from)?;

    match attach_image(db, post_id, &filename) {
        Ok(image) => Ok(image),
        Err(err) => {
            let _ = std::fs::remove_file(&target);
            Err(err)
        }
    }
}

pub fn list_images(db: &Database, post_id: i64) -> ServiceResult<Vec<PostImage>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, post_id, image, created_at FROM post_images WHERE post_id = ? ORDER BY id",
    )?;
    let images = stmt
        .query_map([post_id], row_to_image)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(images)
}

pub fn list_all_images(db: &Database) -> ServiceResult<Vec<PostImageWithTitle>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(
        r#"
        SELECT i.id, i.post_id, i.image, i.created_at, p.title
        FROM post_images i
        JOIN posts p ON p.id = i.post_id
        ORDER BY i.id
        "#,
    )?;
    let images = stmt
        .query_map([], |row| {
            Ok(PostImageWithTitle {
                image: row_to_image(row)?,
                post_title: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(images)
}

/// Detaches an image and removes its file from the media directory.
pub fn remove_image(db: &Database, media_dir: &Path, id: i64) -> ServiceResult<()> {
    let conn = db.get()?;
    let filename: String = conn
        .query_row("SELECT image FROM post_images WHERE id = ?", [id], |row| {
            row.get(0)
        })
        .optional()?
        .ok_or(BlogError::NotFound("image"))?;

    conn.execute("DELETE FROM post_images WHERE id = ?", [id])?;

    let path = media_dir.join(&filename);
    if let Err(e) = std::fs::remove_file(&path) {
        tracing::warn!("Could not remove media file {}: {}", path.display(), e);
    }
    Ok(())
}
