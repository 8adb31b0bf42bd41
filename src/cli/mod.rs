pub mod comment;
pub mod contact;
pub mod image;
pub mod init;
pub mod migrate;
pub mod post;
pub mod serve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scribe")]
#[command(version)]
#[command(about = "A small blog with search, tags and comments", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, env = "SCRIBE_CONFIG", default_value = "scribe.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new site directory with a starter scribe.toml
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
    /// Run the web server
    Serve {
        #[arg(short = 'H', long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations
    Migrate,
    /// Write and manage posts
    Post {
        #[command(subcommand)]
        command: PostCommand,
    },
    /// Moderate comments
    Comment {
        #[command(subcommand)]
        command: CommentCommand,
    },
    /// Attach images to posts
    Image {
        #[command(subcommand)]
        command: ImageCommand,
    },
    /// Read contact form submissions
    Contact {
        #[command(subcommand)]
        command: ContactCommand,
    },
}

#[derive(Subcommand)]
pub enum PostCommand {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        /// Markdown file with the post body; reads stdin when omitted
        #[arg(long)]
        body_file: Option<PathBuf>,
        #[arg(long)]
        slug: Option<String>,
        /// Comma-separated tag names
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long)]
        image: Option<String>,
        /// RFC 3339 timestamp or YYYY-MM-DD
        #[arg(long)]
        published_at: Option<String>,
        #[arg(long)]
        publish: bool,
    },
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        body_file: Option<PathBuf>,
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        published_at: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    Publish {
        id: i64,
    },
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        id: i64,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum CommentCommand {
    List {
        #[arg(long)]
        post: Option<i64>,
        /// Only hidden comments
        #[arg(long, conflicts_with = "active")]
        hidden: bool,
        /// Only active comments
        #[arg(long)]
        active: bool,
    },
    Hide {
        id: i64,
    },
    Show {
        id: i64,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ImageCommand {
    Add {
        #[arg(long)]
        post: i64,
        file: PathBuf,
    },
    List {
        #[arg(long)]
        post: Option<i64>,
    },
    Remove {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ContactCommand {
    List,
}
