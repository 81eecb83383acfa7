use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    NotStarted,
    InProgress,
    Completed,
}

/// Resumable deep-crawl checkpoint for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlProgress {
    pub lang: Language,
    pub last_page_scraped: u32,
    pub full_scrape_completed: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CrawlProgress {
    pub fn new(lang: Language) -> Self {
        Self {
            lang,
            last_page_scraped: 0,
            full_scrape_completed: false,
            updated_at: None,
        }
    }

    pub fn state(&self) -> CrawlState {
        if self.full_scrape_completed {
            CrawlState::Completed
        } else if self.last_page_scraped == 0 {
            CrawlState::NotStarted
        } else {
            CrawlState::InProgress
        }
    }

    /// First page the deep crawl should fetch on resume.
    pub fn resume_page(&self) -> u32 {
        self.last_page_scraped + 1
    }
}
