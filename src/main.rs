use clap::Parser;
use scribe::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scribe=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { path, name }) => {
            scribe::cli::init::run(path, name).await?;
        }
        Some(Commands::Serve { host, port }) => {
            scribe::cli::serve::run(&cli.config, host, port).await?;
        }
        Some(Commands::Migrate) => {
            scribe::cli::migrate::run(&cli.config).await?;
        }
        Some(Commands::Post { command }) => {
            scribe::cli::post::run(&cli.config, command).await?;
        }
        Some(Commands::Comment { command }) => {
            scribe::cli::comment::run(&cli.config, command).await?;
        }
        Some(Commands::Image { command }) => {
            scribe::cli::image::run(&cli.config, command).await?;
        }
        Some(Commands::Contact { command }) => {
            scribe::cli::contact::run(&cli.config, command).await?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
