pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{CrawlProgress, EnrichmentStatus, Language, MovieId, MovieRecord, Tier};

pub use sqlite::SqliteStore;

/// Hard cap on search result size.
pub const SEARCH_LIMIT: usize = 50;

/// Result of one lookup, written back onto a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentUpdate {
    pub status: EnrichmentStatus,
    pub lookup_id: Option<i64>,
    pub external_id: Option<String>,
}

impl EnrichmentUpdate {
    pub fn found(lookup_id: i64, external_id: Option<String>) -> Self {
        Self {
            status: EnrichmentStatus::Found,
            lookup_id: Some(lookup_id),
            external_id,
        }
    }

    pub fn not_found(tier: Tier) -> Self {
        Self {
            status: tier.failure_status(),
            lookup_id: None,
            external_id: None,
        }
    }
}

pub trait Store {
    // Movie operations
    fn upsert_movie(&self, movie: &MovieRecord) -> Result<()>;
    fn upsert_movies(&self, movies: &[MovieRecord]) -> Result<usize>;
    fn get_movie(&self, id: &MovieId) -> Result<Option<MovieRecord>>;
    fn count_movies(&self, lang: Option<Language>) -> Result<i64>;
    /// Oldest and newest `published_at` held for a language.
    fn published_bounds(
        &self,
        lang: Language,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)>;

    // Crawl progress
    fn get_progress(&self, lang: Language) -> Result<CrawlProgress>;
    fn get_all_progress(&self) -> Result<Vec<CrawlProgress>>;
    fn save_progress(&self, lang: Language, page: u32, completed: bool) -> Result<()>;

    // Enrichment
    fn movies_for_enrichment(&self, status: EnrichmentStatus, limit: usize)
        -> Result<Vec<MovieRecord>>;
    /// Applies `update` only if the record still holds `expected`.
    fn record_enrichment(
        &self,
        id: &MovieId,
        expected: EnrichmentStatus,
        update: &EnrichmentUpdate,
    ) -> Result<bool>;
    fn enrichment_counts(&self) -> Result<Vec<(EnrichmentStatus, i64)>>;

    // Reconciled catalog reads
    fn list_catalog(&self, lang: Language, offset: usize, limit: usize)
        -> Result<Vec<MovieRecord>>;
    fn search_catalog(&self, lang: Language, term: &str, limit: usize)
        -> Result<Vec<MovieRecord>>;
    fn resolve_for_playback(&self, external_id: &str) -> Result<Option<MovieRecord>>;
}
