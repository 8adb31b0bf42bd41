use anyhow::Result;
use std::path::PathBuf;

pub async fn run(path: PathBuf, name: Option<String>) -> Result<()> {
    let site_name = name.unwrap_or_else(|| "My Blog".to_string());

    let config_path = path.join("scribe.toml");
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    std::fs::create_dir_all(&path)?;
    std::fs::create_dir_all(path.join("data"))?;
    std::fs::create_dir_all(path.join("data/media"))?;

    let config = format!(
        r#"[site]
title = "{}"
description = "Posts, notes and the occasional tutorial"
url = "http://localhost:8000"
language = "en"

[server]
host = "127.0.0.1"
port = 8000

[database]
path = "./data/scribe.db"

[content]
posts_per_page = 6
search_results_per_page = 10
feed_items = 5
excerpt_words = 30

[media]
upload_dir = "./data/media"

[mail]
# "log" prints outgoing mail; "smtp" sends it through [mail.smtp]
backend = "log"
from = "blog@localhost"
contact_recipient = "admin@localhost"

# [mail.smtp]
# host = "smtp.example.com"
# port = 587
# username = "user"
# password = "secret"
# security = "starttls"
"#,
        site_name.replace('"', "\\\"")
    );

    std::fs::write(&config_path, config)?;

    tracing::info!("Created new blog at {:?}", path);
    tracing::info!("Run 'scribe migrate' to set up the database");
    tracing::info!("Run 'scribe serve' to start the server");

    Ok(())
}
