use crate::models::{CreatePost, PostStatus, UpdatePost};
use crate::services::{posts, tags};
use crate::{Config, Database};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::io::Read;
use std::path::Path;

use super::PostCommand;

pub async fn run(config_path: &Path, command: PostCommand) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open(&config.database.path)?;
    db.migrate()?;

    match command {
        PostCommand::Add {
            title,
            author,
            body_file,
            slug,
            tags,
            image,
            published_at,
            publish,
        } => {
            let body = read_body(body_file.as_deref())?;
            let input = CreatePost {
                title,
                slug,
                author,
                body,
                image,
                status: if publish {
                    PostStatus::Published
                } else {
                    PostStatus::Draft
                },
                published_at: published_at.as_deref().map(parse_published_at).transpose()?,
                tags,
            };
            let id = posts::create_post(&db, input)?;
            tracing::info!("Post {} created", id);
            println!("{}", id);
        }
        PostCommand::Edit {
            id,
            title,
            slug,
            body_file,
            tags,
            image,
            published_at,
            status,
        } => {
            let body = match body_file {
                Some(path) => Some(read_body(Some(&path))?),
                None => None,
            };
            let input = UpdatePost {
                title,
                slug,
                body,
                image,
                status: status.as_deref().map(parse_status).transpose()?,
                published_at: published_at.as_deref().map(parse_published_at).transpose()?,
                tags,
            };
            posts::update_post(&db, id, input)?;
            tracing::info!("Post {} updated", id);
        }
        PostCommand::Publish { id } => {
            posts::publish_post(&db, id)?;
            tracing::info!("Post {} published", id);
        }
        PostCommand::List { status, search } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            let all = posts::list_posts(&db, status, search.as_deref())?;

            println!(
                "{:<6} {:<10} {:<12} {:<40} {:<20}",
                "ID", "STATUS", "DATE", "TITLE", "AUTHOR"
            );
            println!("{}", "-".repeat(90));
            for post in all {
                let date = post
                    .published_date()
                    .map(|d| d.to_string())
                    .unwrap_or_default();
                println!(
                    "{:<6} {:<10} {:<12} {:<40} {:<20}",
                    post.id,
                    post.status,
                    date,
                    clip(&post.title, 40),
                    clip(&post.author, 20)
                );
            }
        }
        PostCommand::Show { id } => {
            let post = posts::get_post(&db, id)?
                .ok_or_else(|| anyhow::anyhow!("Post {} not found", id))?;
            let post_tags = tags::tags_for_post(&db, id)?;

            println!("Title:     {}", post.title);
            println!("Slug:      {}", post.slug);
            println!("Author:    {}", post.author);
            println!("Status:    {}", post.status);
            println!("Published: {}", post.published_at);
            println!("Updated:   {}", post.updated_at);
            println!("URL:       {}", config.site.absolute_url(&post.absolute_url()));
            if let Some(image) = &post.image {
                println!("Image:     {}", image);
            }
            println!(
                "Tags:      {}",
                post_tags
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            println!();
            println!("{}", post.body);
        }
        PostCommand::Delete { id } => {
            posts::delete_post(&db, id)?;
            tracing::info!("Post {} deleted", id);
        }
    }

    Ok(())
}

fn read_body(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("Could not read body file {}", p.display())),
        None => {
            let mut body = String::new();
            std::io::stdin().read_to_string(&mut body)?;
            Ok(body)
        }
    }
}

fn parse_status(raw: &str) -> Result<PostStatus> {
    raw.parse()
        .map_err(|_| anyhow::anyhow!("Invalid status '{}': use draft or published", raw))
}

/// Accepts a full RFC 3339 timestamp or a bare date (midnight UTC).
pub fn parse_published_at(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': use YYYY-MM-DD or RFC 3339", raw))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date '{}'", raw))?;
    Ok(midnight.and_utc())
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
        clipped.push('…');
        clipped
    }
}
