use crate::services::mail::Notifier;
use crate::services::markdown::{truncate_words, MarkdownRenderer};
use crate::{Config, Database};
use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use tera::{Tera, Value};

/// Read-only state shared by every request.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub templates: Tera,
    pub markdown: MarkdownRenderer,
    pub notifier: Notifier,
    pub media_dir: PathBuf,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let notifier = Notifier::from_config(&config.mail)?;
        Self::with_notifier(config, db, notifier)
    }

    pub fn with_notifier(config: Config, db: Database, notifier: Notifier) -> Result<Self> {
        let mut templates = Tera::default();

        templates.register_filter("format_date", format_date_filter);
        templates.register_filter("truncate_words", truncate_words_filter);
        templates.add_raw_templates(vec![
            ("base.html", include_str!("../../templates/base.html")),
            ("404.html", include_str!("../../templates/404.html")),
            ("blog/list.html", include_str!("../../templates/blog/list.html")),
            ("blog/detail.html", include_str!("../../templates/blog/detail.html")),
            ("blog/share.html", include_str!("../../templates/blog/share.html")),
            ("blog/comment.html", include_str!("../../templates/blog/comment.html")),
            ("blog/comment_form.html", include_str!("../../templates/blog/comment_form.html")),
            ("blog/search.html", include_str!("../../templates/blog/search.html")),
            ("blog/contact.html", include_str!("../../templates/blog/contact.html")),
            ("blog/about.html", include_str!("../../templates/blog/about.html")),
            ("blog/sidebar.html", include_str!("../../templates/blog/sidebar.html")),
        ])?;

        let media_dir = PathBuf::from(&config.media.upload_dir);

        Ok(Self {
            config,
            db,
            templates,
            markdown: MarkdownRenderer::new(),
            notifier,
            media_dir,
        })
    }
}

fn format_date_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let date_str = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("format_date requires a string"))?;

    let format = args
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("%B %-d, %Y");

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date_str) {
        return Ok(Value::String(dt.format(format).to_string()));
    }

    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Value::String(dt.format(format).to_string()));
    }

    Ok(Value::String(date_str.to_string()))
}

fn truncate_words_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("truncate_words requires a string"))?;
    let n = args.get("n").and_then(|v| v.as_u64()).unwrap_or(30) as usize;
    Ok(Value::String(truncate_words(s, n)))
}
