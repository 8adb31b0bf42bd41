use crate::services::contact;
use crate::{Config, Database};
use anyhow::Result;
use std::path::Path;

use super::ContactCommand;

pub async fn run(config_path: &Path, command: ContactCommand) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open(&config.database.path)?;
    db.migrate()?;

    match command {
        ContactCommand::List => {
            let messages = contact::list_contact_messages(&db)?;
            if messages.is_empty() {
                println!("No contact messages.");
            }
            for message in messages {
                println!(
                    "#{} {} <{}> at {}",
                    message.id, message.name, message.email, message.created_at
                );
                for line in message.body.lines() {
                    println!("    {}", line);
                }
                println!();
            }
        }
    }

    Ok(())
}
