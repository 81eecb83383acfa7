//! External id enrichment.
//!
//! Records move through three lookup tiers, each looser than the last:
//!
//! ```text
//! unprocessed ──Strict──▶ not_found_strict ──Cleaned──▶ not_found_cleaned ──Broad──▶ not_found_broad
//!      │                        │                              │
//!      └────────────────────────┴──────────────────────────────┴──────▶ found
//! ```
//!
//! A tier only ever selects records sitting in its population status, and
//! every write is conditional on that status, so a record never moves
//! backward.

pub mod title;
pub mod tmdb;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::app::Result;
use crate::config::EnrichmentConfig;
use crate::domain::{MovieRecord, Tier};
use crate::store::{EnrichmentUpdate, Store};

pub use title::standardize_title;
pub use tmdb::TmdbClient;

/// What gets sent to the external catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub title: String,
    pub year: Option<i32>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found {
        lookup_id: i64,
        external_id: Option<String>,
    },
    NotFound,
}

#[async_trait]
pub trait ExternalLookup {
    async fn lookup(&self, query: &LookupQuery) -> Result<LookupOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub tier: Tier,
    pub selected: usize,
    pub found: usize,
    pub not_found: usize,
    pub errors: usize,
}

impl BatchReport {
    fn new(tier: Tier) -> Self {
        Self {
            tier,
            selected: 0,
            found: 0,
            not_found: 0,
            errors: 0,
        }
    }
}

/// One Strict, Cleaned, Broad sweep.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub batches: Vec<BatchReport>,
}

impl PassReport {
    pub fn had_work(&self) -> bool {
        self.batches.iter().any(|b| b.selected > 0)
    }

    pub fn found(&self) -> usize {
        self.batches.iter().map(|b| b.found).sum()
    }
}

pub struct EnrichmentEngine {
    store: Arc<dyn Store + Send + Sync>,
    lookup: Arc<dyn ExternalLookup + Send + Sync>,
    lookup_delay: Duration,
    region: String,
}

impl EnrichmentEngine {
    pub fn new(
        store: Arc<dyn Store + Send + Sync>,
        lookup: Arc<dyn ExternalLookup + Send + Sync>,
        config: &EnrichmentConfig,
    ) -> Self {
        Self {
            store,
            lookup,
            lookup_delay: config.lookup_delay(),
            region: config.region.clone(),
        }
    }

    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = delay;
        self
    }

    /// Build the lookup query a tier issues for `record`.
    pub fn query_for(&self, tier: Tier, record: &MovieRecord) -> LookupQuery {
        match tier {
            Tier::Strict => LookupQuery {
                title: record.title.clone(),
                year: record.year,
                region: None,
            },
            Tier::Cleaned => LookupQuery {
                title: standardize_title(&record.title),
                year: record.year,
                region: None,
            },
            Tier::Broad => LookupQuery {
                title: standardize_title(&record.title),
                year: None,
                region: Some(self.region.clone()),
            },
        }
    }

    /// Look up one batch of records waiting in `tier`'s population.
    pub async fn enrich_batch(&self, tier: Tier, batch_size: usize) -> Result<BatchReport> {
        let expected = tier.population();
        let candidates = self.store.movies_for_enrichment(expected, batch_size)?;
        let mut report = BatchReport::new(tier);
        report.selected = candidates.len();

        for (i, record) in candidates.iter().enumerate() {
            if i > 0 && !self.lookup_delay.is_zero() {
                tokio::time::sleep(self.lookup_delay).await;
            }

            let query = self.query_for(tier, record);
            let update = match self.lookup.lookup(&query).await {
                Ok(LookupOutcome::Found {
                    lookup_id,
                    external_id,
                }) => {
                    debug!(id = %record.id, tier = %tier, lookup_id, external_id = ?external_id, "Match found");
                    report.found += 1;
                    EnrichmentUpdate::found(lookup_id, external_id)
                }
                Ok(LookupOutcome::NotFound) => {
                    debug!(id = %record.id, tier = %tier, title = %query.title, "No match");
                    report.not_found += 1;
                    EnrichmentUpdate::not_found(tier)
                }
                Err(e) => {
                    warn!(id = %record.id, tier = %tier, error = %e, "Lookup failed, will retry");
                    report.errors += 1;
                    continue;
                }
            };

            match self.store.record_enrichment(&record.id, expected, &update) {
                Ok(true) => {}
                Ok(false) => debug!(id = %record.id, "Record already left {}", expected),
                Err(e) => {
                    error!(id = %record.id, error = %e, "Failed to store enrichment result");
                    report.errors += 1;
                }
            }
        }

        if report.selected > 0 {
            info!(
                tier = %tier,
                selected = report.selected,
                found = report.found,
                not_found = report.not_found,
                errors = report.errors,
                "Enrichment batch complete"
            );
        }

        Ok(report)
    }

    /// Run Strict, then Cleaned, then Broad.
    pub async fn run_full_pass(&self, batch_size: usize) -> Result<PassReport> {
        let mut pass = PassReport::default();
        for tier in Tier::ALL {
            pass.batches.push(self.enrich_batch(tier, batch_size).await?);
        }
        Ok(pass)
    }
}
