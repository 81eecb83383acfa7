//! Read side of the store as the addon sees it.
//!
//! Titles listed in several languages share an external id; only the
//! canonical variant of each is ever surfaced. Store failures are logged
//! and turned into empty answers.

use std::sync::Arc;

use tracing::error;

use crate::domain::{Language, MovieId, MovieRecord};
use crate::store::{Store, SEARCH_LIMIT};

/// Catalog page size.
pub const PAGE_SIZE: usize = 100;

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn Store + Send + Sync>,
}

impl Catalog {
    pub fn new(store: Arc<dyn Store + Send + Sync>) -> Self {
        Self { store }
    }

    /// One page of the language's reconciled catalog, newest first.
    pub fn list(&self, lang: Language, skip: usize) -> Vec<MovieRecord> {
        self.store
            .list_catalog(lang, skip, PAGE_SIZE)
            .unwrap_or_else(|e| {
                error!(lang = %lang, skip, error = %e, "Catalog listing failed");
                Vec::new()
            })
    }

    pub fn search(&self, lang: Language, term: &str) -> Vec<MovieRecord> {
        if term.trim().is_empty() {
            return Vec::new();
        }

        self.store
            .search_catalog(lang, term.trim(), SEARCH_LIMIT)
            .unwrap_or_else(|e| {
                error!(lang = %lang, term, error = %e, "Catalog search failed");
                Vec::new()
            })
    }

    pub fn resolve_for_playback(&self, external_id: &str) -> Option<MovieRecord> {
        self.store
            .resolve_for_playback(external_id)
            .unwrap_or_else(|e| {
                error!(external_id, error = %e, "Playback resolution failed");
                None
            })
    }

    pub fn resolve_by_internal_id(&self, raw: &str) -> Option<MovieRecord> {
        let id = raw.parse::<MovieId>().ok()?;
        self.store.get_movie(&id).unwrap_or_else(|e| {
            error!(id = raw, error = %e, "Movie lookup failed");
            None
        })
    }

    /// Resolve either id form the addon hands out.
    pub fn resolve_meta(&self, id: &str) -> Option<MovieRecord> {
        if MovieId::is_internal(id) {
            self.resolve_by_internal_id(id)
        } else {
            self.resolve_for_playback(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::EnrichmentStatus;
    use crate::store::{EnrichmentUpdate, SqliteStore};

    fn catalog_with(movies: &[(Language, &str, &str, Option<&str>)]) -> Catalog {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        for (i, (lang, native, title, external)) in movies.iter().enumerate() {
            let mut record = MovieRecord::new(
                *lang,
                native,
                title.to_string(),
                format!("https://einthusan.tv/movie/watch/{native}/?lang={lang}"),
            );
            record.published_at = Utc.with_ymd_and_hms(2024, 1, 1 + i as u32, 0, 0, 0).single();
            store.upsert_movie(&record).unwrap();
            if let Some(external) = external {
                store
                    .record_enrichment(
                        &record.id,
                        EnrichmentStatus::Unprocessed,
                        &EnrichmentUpdate::found(i as i64 + 1, Some(external.to_string())),
                    )
                    .unwrap();
            }
        }
        Catalog::new(store)
    }

    #[test]
    fn test_list_only_shows_canonical_variants() {
        let catalog = catalog_with(&[
            (Language::Tamil, "t1", "Baahubali", Some("tt100")),
            (Language::Hindi, "h1", "Baahubali", Some("tt100")),
            (Language::Hindi, "h2", "Pathaan", Some("tt200")),
            (Language::Hindi, "h3", "Unmatched", None),
        ]);

        let tamil = catalog.list(Language::Tamil, 0);
        assert_eq!(tamil.len(), 1);
        assert_eq!(tamil[0].id.to_string(), "ein:tamil:t1");

        let hindi: Vec<String> = catalog
            .list(Language::Hindi, 0)
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(hindi, vec!["Pathaan"]);

        assert!(catalog.list(Language::Hindi, 5).is_empty());
    }

    #[test]
    fn test_search_blank_term() {
        let catalog = catalog_with(&[(Language::Tamil, "t1", "Leo", Some("tt1"))]);
        assert!(catalog.search(Language::Tamil, "   ").is_empty());
        assert_eq!(catalog.search(Language::Tamil, " le ").len(), 1);
    }

    #[test]
    fn test_resolve_meta_dispatches_on_id_shape() {
        let catalog = catalog_with(&[
            (Language::Telugu, "te1", "RRR", Some("tt300")),
            (Language::Tamil, "t1", "RRR", Some("tt300")),
            (Language::Kannada, "k1", "Kantara", None),
        ]);

        let by_external = catalog.resolve_meta("tt300").unwrap();
        assert_eq!(by_external.lang, Language::Tamil);

        let by_internal = catalog.resolve_meta("ein:kannada:k1").unwrap();
        assert_eq!(by_internal.title, "Kantara");

        assert!(catalog.resolve_meta("ein:klingon:k1").is_none());
        assert!(catalog.resolve_meta("tt999").is_none());
    }
}
