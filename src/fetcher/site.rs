use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::app::{ReelError, Result};
use crate::config::SiteConfig;
use crate::domain::{Language, MovieRecord};
use crate::fetcher::http_fetcher::{FetchResult, HttpFetcher};
use crate::fetcher::session::{PremiumSession, Session, SessionProvider};
use crate::fetcher::stream::resolve_stream;
use crate::fetcher::{ListingPage, ListingSource, StreamDescriptor, StreamSource};
use crate::scraper::ListingExtractor;

/// HTTP client for the source site: listing pages and stream links.
pub struct SiteClient {
    config: SiteConfig,
    base_url: Url,
    fetcher: HttpFetcher,
    extractor: ListingExtractor,
    premium: Option<Arc<dyn SessionProvider + Send + Sync>>,
}

impl SiteClient {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let premium: Option<Arc<dyn SessionProvider + Send + Sync>> = if config.has_credentials() {
            Some(Arc::new(PremiumSession::new(config.clone())?))
        } else {
            None
        };

        Ok(Self {
            config: config.clone(),
            base_url: Url::parse(&config.base_url)?,
            fetcher: HttpFetcher::new(config.timeout(), &config.user_agent, config.proxies.clone())?,
            extractor: ListingExtractor::new(&config.base_url)?,
            premium,
        })
    }

    /// Replace the premium session provider.
    pub fn with_session_provider(mut self, provider: Arc<dyn SessionProvider + Send + Sync>) -> Self {
        self.premium = Some(provider);
        self
    }

    pub fn listing_url(&self, lang: Language, page: u32) -> Result<Url> {
        let mut url = self.base_url.join("/movie/results/")?;
        url.query_pairs_mut()
            .append_pair("find", "Recent")
            .append_pair("lang", lang.slug())
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    async fn premium_stream(
        &self,
        provider: &(dyn SessionProvider + Send + Sync),
        record: &MovieRecord,
    ) -> Option<String> {
        let session = match provider.acquire().await {
            Ok(session) => session,
            Err(e) => {
                warn!(id = %record.id, error = %e, "Premium login failed");
                return None;
            }
        };

        match resolve_stream(&session, &self.base_url, record, true).await {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                warn!(id = %record.id, "No HD player on premium watch page");
                provider.invalidate().await;
                None
            }
            Err(e) => {
                warn!(id = %record.id, error = %e, "HD stream resolution failed");
                provider.invalidate().await;
                None
            }
        }
    }
}

#[async_trait]
impl ListingSource for SiteClient {
    async fn fetch_listing_page(&self, lang: Language, page: u32) -> Result<ListingPage> {
        let url = self.listing_url(lang, page)?;
        let paths = self.fetcher.paths();
        let mut throttled = false;
        let mut last_error = None;

        for path in &paths {
            match self.fetcher.fetch(path, url.as_str()).await {
                Ok(FetchResult::Content(body)) => {
                    let extracted = self.extractor.extract(lang, &body);
                    if extracted.rate_limited {
                        warn!(lang = %lang, page, %path, "Rate limit page served");
                        throttled = true;
                        continue;
                    }
                    debug!(lang = %lang, page, %path, records = extracted.records.len(), "Listing fetched");
                    return Ok(ListingPage {
                        records: extracted.records,
                        rate_limited: false,
                    });
                }
                Ok(FetchResult::TooManyRequests) => {
                    warn!(lang = %lang, page, %path, "HTTP 429");
                    throttled = true;
                }
                Err(e) => {
                    warn!(lang = %lang, page, %path, error = %e, "Listing fetch failed");
                    last_error = Some(e);
                }
            }
        }

        if throttled || paths.len() > 1 {
            return Ok(ListingPage::rate_limited());
        }

        Err(last_error.unwrap_or_else(|| ReelError::Other("No fetch path available".into())))
    }
}

#[async_trait]
impl StreamSource for SiteClient {
    async fn fetch_streams(&self, record: &MovieRecord) -> Result<Vec<StreamDescriptor>> {
        let mut streams: Vec<StreamDescriptor> = Vec::new();

        if let Some(provider) = &self.premium {
            if let Some(url) = self.premium_stream(provider.as_ref(), record).await {
                streams.push(StreamDescriptor::new("Einthusan HD", url));
            }
        }

        let sd = match Session::anonymous(&self.config) {
            Ok(session) => resolve_stream(&session, &self.base_url, record, false).await,
            Err(e) => Err(e),
        };
        match sd {
            Ok(Some(url)) => {
                if !streams.iter().any(|s| s.url == url) {
                    streams.push(StreamDescriptor::new("Einthusan SD", url));
                }
            }
            Ok(None) => debug!(id = %record.id, "No SD player on watch page"),
            Err(e) if streams.is_empty() => return Err(e),
            Err(e) => warn!(id = %record.id, error = %e, "SD stream resolution failed"),
        }

        Ok(streams)
    }
}
