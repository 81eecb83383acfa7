pub mod http_fetcher;
pub mod session;
pub mod site;
mod stream;

use async_trait::async_trait;
use serde::Serialize;

use crate::app::Result;
use crate::domain::{Language, MovieRecord};

pub use session::{PremiumSession, Session, SessionProvider};
pub use site::SiteClient;

/// One listing page as seen by the crawler.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub records: Vec<MovieRecord>,
    /// The site refused to serve the page
    pub rate_limited: bool,
}

impl ListingPage {
    pub fn new(records: Vec<MovieRecord>) -> Self {
        Self {
            records,
            rate_limited: false,
        }
    }

    pub fn rate_limited() -> Self {
        Self {
            records: Vec::new(),
            rate_limited: true,
        }
    }
}

#[async_trait]
pub trait ListingSource {
    async fn fetch_listing_page(&self, lang: Language, page: u32) -> Result<ListingPage>;
}

/// A playable stream for a movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamDescriptor {
    pub title: String,
    pub url: String,
}

impl StreamDescriptor {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

#[async_trait]
pub trait StreamSource {
    async fn fetch_streams(&self, record: &MovieRecord) -> Result<Vec<StreamDescriptor>>;
}
