use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::app::{ReelError, Result};
use crate::config::EnrichmentConfig;
use crate::enrich::{ExternalLookup, LookupOutcome, LookupQuery};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct MovieDetails {
    imdb_id: Option<String>,
    external_ids: Option<ExternalIds>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

impl MovieDetails {
    fn imdb_id(self) -> Option<String> {
        let non_empty = |id: Option<String>| id.filter(|s| !s.trim().is_empty());
        non_empty(self.external_ids.and_then(|e| e.imdb_id)).or_else(|| non_empty(self.imdb_id))
    }
}

/// TMDB movie search, resolving IMDb ids through the details endpoint.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(config: &EnrichmentConfig, timeout: Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ReelError::Config("TMDB API key not configured".into()))?;

        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .user_agent(concat!("reelcrawl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))?;
        url.query_pairs_mut().append_pair("api_key", &self.api_key);
        Ok(url)
    }

    async fn search(&self, query: &LookupQuery) -> Result<Option<i64>> {
        let mut url = self.endpoint("/search/movie")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", &query.title).append_pair("page", "1");
            if let Some(year) = query.year {
                pairs.append_pair("year", &year.to_string());
            }
            if let Some(region) = &query.region {
                pairs.append_pair("region", region);
            }
        }

        let response: SearchResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.results.first().map(|r| r.id))
    }

    async fn details(&self, id: i64) -> Result<MovieDetails> {
        let mut url = self.endpoint(&format!("/movie/{}", id))?;
        url.query_pairs_mut()
            .append_pair("append_to_response", "external_ids");

        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

#[async_trait]
impl ExternalLookup for TmdbClient {
    async fn lookup(&self, query: &LookupQuery) -> Result<LookupOutcome> {
        if query.title.trim().is_empty() {
            return Ok(LookupOutcome::NotFound);
        }

        let Some(lookup_id) = self.search(query).await? else {
            return Ok(LookupOutcome::NotFound);
        };

        let external_id = self.details(lookup_id).await?.imdb_id();
        Ok(LookupOutcome::Found {
            lookup_id,
            external_id,
        })
    }
}
