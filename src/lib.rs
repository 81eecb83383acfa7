//! # reelcrawl
//!
//! Crawls a regional movie-streaming site, matches what it finds against
//! TMDB/IMDb, and serves the result as a Stremio addon.
//!
//! ## Architecture
//!
//! ```text
//! SiteClient → CrawlEngine ──▶ Store ◀── EnrichmentEngine ← TmdbClient
//!                                │
//!                             Catalog → addon (axum) → SiteClient streams
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Resume the full crawl of every language
//! reelcrawl crawl
//!
//! # Match scraped titles to IMDb ids once
//! TMDB_API_KEY=... reelcrawl enrich --once
//!
//! # Run everything and serve the addon on :7000
//! reelcrawl serve
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// site client and engines.
pub mod app;

/// Stremio addon endpoints: manifest, catalog, meta and stream.
pub mod addon;

/// Reconciled catalog reads: one canonical record per external id.
pub mod catalog;

/// Command-line interface using clap.
///
/// - `serve` - Run every loop plus the addon server
/// - `crawl [--lang] [--from] [--to] [--no-progress]` - Crawl listing pages
/// - `refresh [--lang]` - Re-crawl the newest pages
/// - `enrich [--once]` - Look up external ids
/// - `status` - Crawl progress and enrichment counts
/// - `search <lang> <term>` - Search a catalog
pub mod cli;

/// Configuration loaded from `~/.config/reelcrawl/config.toml` with
/// environment overrides.
pub mod config;

/// Resumable per-language listing crawl.
pub mod crawl;

/// Service mode: scheduled loops and the addon server.
pub mod daemon;

/// Core domain models.
///
/// - [`Language`](domain::Language): Source languages in priority order
/// - [`MovieRecord`](domain::MovieRecord): One scraped listing
/// - [`CrawlProgress`](domain::CrawlProgress): Per-language resume point
/// - [`EnrichmentStatus`](domain::EnrichmentStatus): Lookup tier state
pub mod domain;

/// External id lookup in strict, cleaned and broad tiers.
pub mod enrich;

/// Site access.
///
/// - [`ListingSource`](fetcher::ListingSource): Async trait for listing pages
/// - [`StreamSource`](fetcher::StreamSource): Async trait for stream links
/// - [`SiteClient`](fetcher::SiteClient): reqwest-based implementation with proxy rotation
pub mod fetcher;

/// HTML extraction for listing and watch pages.
pub mod scraper;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
