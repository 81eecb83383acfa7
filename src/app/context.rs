use std::path::PathBuf;
use std::sync::Arc;

use crate::addon::AddonState;
use crate::app::error::{ReelError, Result};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::crawl::CrawlEngine;
use crate::enrich::{EnrichmentEngine, TmdbClient};
use crate::fetcher::SiteClient;
use crate::store::sqlite::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub site: Arc<SiteClient>,
}

impl AppContext {
    /// Open the store at `db_path`, falling back to the configured or default path.
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path.or_else(|| config.database.clone()) {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        Self::with_store(config, Arc::new(SqliteStore::in_memory()?))
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let site = Arc::new(SiteClient::new(&config.site)?);
        Ok(Self {
            config,
            store,
            site,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| ReelError::Config("Could not find data directory".into()))?;
        let app_dir = data_dir.join("reelcrawl");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("reelcrawl.db"))
    }

    pub fn crawl_engine(&self) -> CrawlEngine {
        CrawlEngine::new(
            self.store.clone(),
            self.site.clone(),
            self.config.crawl.clone(),
        )
    }

    /// The enrichment engine, or `None` when no TMDB key is configured.
    pub fn enrichment_engine(&self) -> Result<Option<EnrichmentEngine>> {
        if self
            .config
            .enrichment
            .api_key
            .as_deref()
            .is_none_or(str::is_empty)
        {
            return Ok(None);
        }

        let tmdb = TmdbClient::new(&self.config.enrichment, self.config.site.timeout())?;
        Ok(Some(EnrichmentEngine::new(
            self.store.clone(),
            Arc::new(tmdb),
            &self.config.enrichment,
        )))
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.store.clone())
    }

    pub fn addon_state(&self) -> AddonState {
        AddonState {
            catalog: self.catalog(),
            streams: self.site.clone(),
            languages: self.config.crawl.languages.clone(),
        }
    }
}
