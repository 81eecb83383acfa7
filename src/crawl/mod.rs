//! Per-language listing crawl.
//!
//! Pages are walked strictly in order. After a page's records are committed
//! the language's resume point moves forward, so an interrupted crawl picks
//! up at the first page it has not yet stored.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::app::Result;
use crate::config::CrawlConfig;
use crate::domain::{Language, MovieRecord};
use crate::fetcher::ListingSource;
use crate::store::Store;

/// Why a crawl invocation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The site throttled us; resume later from the checkpoint
    RateLimited,
    /// An empty page past the first: nothing older exists
    EndOfListing,
    /// Walked every requested page
    ReachedEnd,
    /// A page could not be fetched; the next run resumes there
    FetchError,
}

/// Width of one listing page on the first-seen clock.
const PAGE_SPAN_MS: i64 = 1_000;

/// Where first-seen records are placed on the `published_at` timeline.
///
/// Listing pages are newest first but carry no dates, so each record is
/// stamped from its listing position the first time it is stored (the
/// store keeps that first stamp). A crawl from the head of the listing
/// stamps above everything already held; one that starts deeper stamps
/// below the oldest stamp.
#[derive(Debug, Clone, Copy)]
enum ListingClock {
    Head { top: DateTime<Utc>, start_page: u32 },
    Tail,
}

fn stamp_first_seen(records: &mut [MovieRecord], anchor: DateTime<Utc>) {
    for (position, record) in records.iter_mut().enumerate() {
        if record.published_at.is_none() {
            record.published_at = Some(anchor - TimeDelta::milliseconds(position as i64 + 1));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOutcome {
    pub lang: Language,
    pub pages_fetched: u32,
    pub records_upserted: usize,
    /// Last page whose records were stored
    pub last_page: Option<u32>,
    pub stop: StopReason,
}

pub struct CrawlEngine {
    store: Arc<dyn Store + Send + Sync>,
    source: Arc<dyn ListingSource + Send + Sync>,
    config: CrawlConfig,
}

impl CrawlEngine {
    pub fn new(
        store: Arc<dyn Store + Send + Sync>,
        source: Arc<dyn ListingSource + Send + Sync>,
        config: CrawlConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
        }
    }

    fn page_delay(&self) -> Duration {
        let (min, max) = (self.config.delay_min_ms, self.config.delay_max_ms);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(min..=max.max(min)))
    }

    fn listing_clock(&self, lang: Language, start_page: u32, end_page: u32) -> Result<ListingClock> {
        if start_page > 1 {
            return Ok(ListingClock::Tail);
        }

        let now = Utc::now();
        let (_, newest) = self.store.published_bounds(lang)?;
        let pages = i64::from(end_page.saturating_sub(start_page)) + 1;
        Ok(ListingClock::Head {
            top: newest.map_or(now, |newest| newest.max(now))
                + TimeDelta::milliseconds(pages * PAGE_SPAN_MS),
            start_page,
        })
    }

    fn page_anchor(&self, clock: ListingClock, lang: Language, page: u32) -> Result<DateTime<Utc>> {
        match clock {
            ListingClock::Head { top, start_page } => {
                Ok(top - TimeDelta::milliseconds(i64::from(page - start_page) * PAGE_SPAN_MS))
            }
            ListingClock::Tail => {
                let (oldest, _) = self.store.published_bounds(lang)?;
                Ok(oldest.unwrap_or_else(Utc::now))
            }
        }
    }

    /// Crawl `start_page..=end_page` of one language's listing.
    ///
    /// With `persist_progress` the resume point is advanced after each
    /// stored page and a page that fails to fetch ends the invocation, so
    /// the next run starts there. Without it (refreshes) progress is left
    /// alone and failed pages are skipped.
    pub async fn crawl_language(
        &self,
        lang: Language,
        start_page: u32,
        end_page: u32,
        persist_progress: bool,
    ) -> Result<CrawlOutcome> {
        let mut outcome = CrawlOutcome {
            lang,
            pages_fetched: 0,
            records_upserted: 0,
            last_page: None,
            stop: StopReason::ReachedEnd,
        };

        info!(lang = %lang, start_page, end_page, persist_progress, "Crawl started");
        let clock = self.listing_clock(lang, start_page, end_page)?;

        for page in start_page..=end_page {
            if page > start_page {
                let delay = self.page_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            let mut listing = match self.source.fetch_listing_page(lang, page).await {
                Ok(listing) => listing,
                Err(e) if persist_progress => {
                    warn!(lang = %lang, page, error = %e, "Fetch failed, stopping crawl");
                    outcome.stop = StopReason::FetchError;
                    return Ok(outcome);
                }
                Err(e) => {
                    warn!(lang = %lang, page, error = %e, "Skipping page after fetch error");
                    continue;
                }
            };

            if listing.rate_limited {
                warn!(lang = %lang, page, "Rate limited, stopping crawl");
                outcome.stop = StopReason::RateLimited;
                return Ok(outcome);
            }
            outcome.pages_fetched += 1;

            if listing.records.is_empty() {
                if page > 1 {
                    info!(lang = %lang, page, "Reached end of listing");
                    if persist_progress {
                        self.store.save_progress(lang, page, true)?;
                    }
                    outcome.last_page = Some(page);
                    outcome.stop = StopReason::EndOfListing;
                    return Ok(outcome);
                }
                warn!(lang = %lang, page, "First listing page has no records");
            } else {
                let anchor = self.page_anchor(clock, lang, page)?;
                stamp_first_seen(&mut listing.records, anchor);
                outcome.records_upserted += self.store.upsert_movies(&listing.records)?;
            }

            if persist_progress {
                self.store.save_progress(lang, page, false)?;
            }
            outcome.last_page = Some(page);

            debug!(lang = %lang, page, records = listing.records.len(), "Page stored");
        }

        if persist_progress {
            self.store
                .save_progress(lang, outcome.last_page.unwrap_or(0), true)?;
            info!(lang = %lang, "Full scrape completed");
        }

        Ok(outcome)
    }

    /// Continue the full crawl of every unfinished language.
    pub async fn catch_up(&self, languages: &[Language]) -> Vec<CrawlOutcome> {
        let mut outcomes = Vec::new();

        for &lang in languages {
            let mut retries = 0;

            loop {
                let progress = match self.store.get_progress(lang) {
                    Ok(progress) => progress,
                    Err(e) => {
                        error!(lang = %lang, error = %e, "Failed to read crawl progress");
                        break;
                    }
                };

                if progress.full_scrape_completed {
                    debug!(lang = %lang, "Full scrape already completed");
                    break;
                }

                let result = self
                    .crawl_language(lang, progress.resume_page(), self.config.max_pages, true)
                    .await;

                match result {
                    Ok(outcome) => {
                        let stop = outcome.stop;
                        log_outcome(&outcome);
                        outcomes.push(outcome);

                        if stop != StopReason::RateLimited {
                            break;
                        }
                        if retries >= self.config.max_rate_limit_retries {
                            warn!(lang = %lang, retries, "Still rate limited, deferring to next run");
                            break;
                        }
                        retries += 1;

                        let cooldown = self.config.rate_limit_cooldown();
                        info!(lang = %lang, cooldown_secs = cooldown.as_secs(), retry = retries, "Cooling down");
                        tokio::time::sleep(cooldown).await;
                    }
                    Err(e) => {
                        error!(lang = %lang, error = %e, "Crawl aborted");
                        break;
                    }
                }
            }
        }

        outcomes
    }

    /// Re-crawl the newest pages of every language, leaving progress alone.
    pub async fn refresh(&self, languages: &[Language]) -> Vec<CrawlOutcome> {
        let mut outcomes = Vec::new();

        for &lang in languages {
            match self
                .crawl_language(lang, 1, self.config.refresh_pages, false)
                .await
            {
                Ok(outcome) => {
                    log_outcome(&outcome);
                    outcomes.push(outcome);
                }
                Err(e) => error!(lang = %lang, error = %e, "Refresh aborted"),
            }
        }

        outcomes
    }
}

fn log_outcome(outcome: &CrawlOutcome) {
    info!(
        lang = %outcome.lang,
        pages = outcome.pages_fetched,
        records = outcome.records_upserted,
        last_page = ?outcome.last_page,
        stop = ?outcome.stop,
        "Crawl finished"
    );
}
