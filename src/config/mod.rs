use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Absolute base URL used for share links and the feed.
    pub url: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl SiteConfig {
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentConfig {
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: usize,
    #[serde(default = "default_search_results_per_page")]
    pub search_results_per_page: usize,
    #[serde(default = "default_feed_items")]
    pub feed_items: usize,
    #[serde(default = "default_excerpt_words")]
    pub excerpt_words: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            posts_per_page: default_posts_per_page(),
            search_results_per_page: default_search_results_per_page(),
            feed_items: default_feed_items(),
            excerpt_words: default_excerpt_words(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    #[default]
    Log,
    Smtp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    #[default]
    Starttls,
    Tls,
    None,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailConfig {
    #[serde(default)]
    pub backend: MailBackend,
    #[serde(default = "default_from")]
    pub from: String,
    #[serde(default = "default_contact_recipient")]
    pub contact_recipient: String,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            backend: MailBackend::Log,
            from: default_from(),
            contact_recipient: default_contact_recipient(),
            smtp: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub security: SmtpSecurity,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_pool_size() -> u32 {
    10
}

fn default_posts_per_page() -> usize {
    6
}

fn default_search_results_per_page() -> usize {
    10
}

fn default_feed_items() -> usize {
    5
}

fn default_excerpt_words() -> usize {
    30
}

fn default_upload_dir() -> String {
    "./media".to_string()
}

fn default_from() -> String {
    "blog@localhost".to_string()
}

fn default_contact_recipient() -> String {
    "admin@localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Could not read config file '{}': {}. Run `scribe init` to create one.",
                path.display(),
                e
            )
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.site.url.trim().is_empty() {
            anyhow::bail!("site.url must not be empty");
        }
        url::Url::parse(&self.site.url)
            .map_err(|e| anyhow::anyhow!("site.url '{}' is not a valid URL: {}", self.site.url, e))?;

        check_page_size("content.posts_per_page", self.content.posts_per_page)?;
        check_page_size(
            "content.search_results_per_page",
            self.content.search_results_per_page,
        )?;
        if self.content.feed_items == 0 {
            anyhow::bail!("content.feed_items must be greater than 0");
        }
        if self.content.excerpt_words == 0 {
            anyhow::bail!("content.excerpt_words must be greater than 0");
        }
        if self.database.pool_size == 0 {
            anyhow::bail!("database.pool_size must be greater than 0");
        }

        if self.mail.backend == MailBackend::Smtp {
            match &self.mail.smtp {
                None => anyhow::bail!("mail.backend = \"smtp\" requires a [mail.smtp] section"),
                Some(smtp) if smtp.host.trim().is_empty() => {
                    anyhow::bail!("mail.smtp.host must not be empty")
                }
                Some(smtp) if smtp.username.is_some() != smtp.password.is_some() => {
                    anyhow::bail!("mail.smtp.username and mail.smtp.password must be set together")
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn check_page_size(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        anyhow::bail!("{} must be greater than 0", name);
    }
    if value > 100 {
        anyhow::bail!("{} must be 100 or less", name);
    }
    Ok(())
}
