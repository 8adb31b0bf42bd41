use crate::services::comments;
use crate::{Config, Database};
use anyhow::Result;
use std::path::Path;

use super::CommentCommand;

pub async fn run(config_path: &Path, command: CommentCommand) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open(&config.database.path)?;
    db.migrate()?;

    match command {
        CommentCommand::List {
            post,
            hidden,
            active,
        } => {
            let filter = match (active, hidden) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let all = comments::list_comments(&db, post, filter)?;

            println!(
                "{:<6} {:<8} {:<20} {:<30} {:<20}",
                "ID", "ACTIVE", "NAME", "POST", "CREATED"
            );
            println!("{}", "-".repeat(88));
            for entry in all {
                let c = &entry.comment;
                println!(
                    "{:<6} {:<8} {:<20} {:<30} {:<20}",
                    c.id,
                    if c.active { "yes" } else { "no" },
                    c.name,
                    entry.post_title,
                    &c.created_at[..c.created_at.len().min(19)]
                );
            }
        }
        CommentCommand::Hide { id } => {
            comments::set_comment_active(&db, id, false)?;
            tracing::info!("Comment {} hidden", id);
        }
        CommentCommand::Show { id } => {
            comments::set_comment_active(&db, id, true)?;
            tracing::info!("Comment {} visible", id);
        }
        CommentCommand::Delete { id } => {
            comments::delete_comment(&db, id)?;
            tracing::info!("Comment {} deleted", id);
        }
    }

    Ok(())
}
