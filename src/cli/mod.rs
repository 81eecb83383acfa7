pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::Language;

#[derive(Parser)]
#[command(name = "reelcrawl")]
#[command(about = "Movie listing crawler and Stremio addon", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/reelcrawl/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Log file path (default: stderr)
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run crawl, refresh and enrichment loops plus the addon server
    Serve,
    /// Crawl listing pages (resumes the full crawl by default)
    Crawl {
        /// Only this language
        #[arg(short, long)]
        lang: Option<Language>,

        /// First page (default: resume point)
        #[arg(long)]
        from: Option<u32>,

        /// Last page (default: crawl.max_pages)
        #[arg(long)]
        to: Option<u32>,

        /// Don't record crawl progress
        #[arg(long)]
        no_progress: bool,
    },
    /// Re-crawl the newest listing pages
    Refresh {
        /// Only this language
        #[arg(short, long)]
        lang: Option<Language>,
    },
    /// Look up external ids for scraped movies
    Enrich {
        /// Run a single pass instead of looping
        #[arg(long)]
        once: bool,
    },
    /// Show crawl progress and enrichment counts
    Status,
    /// Search a language's catalog
    Search {
        lang: Language,
        term: String,
    },
}
