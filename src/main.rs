use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelcrawl::app::AppContext;
use reelcrawl::cli::{commands, Cli, Commands};
use reelcrawl::config::Config;

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(filter)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref())?;

    let config = Config::load(cli.config.as_deref())?;
    let ctx = AppContext::new(config, cli.db)?;

    match cli.command {
        Commands::Serve => {
            commands::serve(ctx).await?;
        }
        Commands::Crawl {
            lang,
            from,
            to,
            no_progress,
        } => {
            commands::crawl(&ctx, lang, from, to, no_progress).await?;
        }
        Commands::Refresh { lang } => {
            commands::refresh(&ctx, lang).await?;
        }
        Commands::Enrich { once } => {
            commands::enrich(&ctx, once).await?;
        }
        Commands::Status => {
            commands::status(&ctx)?;
        }
        Commands::Search { lang, term } => {
            commands::search(&ctx, lang, &term)?;
        }
    }

    Ok(())
}
