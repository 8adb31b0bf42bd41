use crate::services::images;
use crate::{Config, Database};
use anyhow::Result;
use std::path::Path;

use super::ImageCommand;

pub async fn run(config_path: &Path, command: ImageCommand) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open(&config.database.path)?;
    db.migrate()?;
    let media_dir = Path::new(&config.media.upload_dir);

    match command {
        ImageCommand::Add { post, file } => {
            let image = images::import_image(&db, media_dir, post, &file)?;
            tracing::info!("Image {} attached to post {} as {}", image.id, post, image.image);
        }
        ImageCommand::List { post: Some(post) } => {
            println!("{:<6} {:<45} {:<20}", "ID", "FILE", "ADDED");
            println!("{}", "-".repeat(72));
            for image in images::list_images(&db, post)? {
                println!(
                    "{:<6} {:<45} {:<20}",
                    image.id,
                    image.image,
                    &image.created_at[..image.created_at.len().min(19)]
                );
            }
        }
        ImageCommand::List { post: None } => {
            println!("{:<6} {:<45} {:<30}", "ID", "FILE", "POST");
            println!("{}", "-".repeat(82));
            for entry in images::list_all_images(&db)? {
                println!(
                    "{:<6} {:<45} {:<30}",
                    entry.image.id,
                    entry.image.image,
                    entry.to_string()
                );
            }
        }
        ImageCommand::Remove { id } => {
            images::remove_image(&db, media_dir, id)?;
            tracing::info!("Image {} removed", id);
        }
    }

    Ok(())
}
