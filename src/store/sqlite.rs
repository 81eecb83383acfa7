use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{ReelError, Result};
use crate::domain::{CrawlProgress, EnrichmentStatus, Language, MovieId, MovieRecord};
use crate::store::{EnrichmentUpdate, Store, SEARCH_LIMIT};

const MOVIE_COLUMNS: &str = "id, lang, title, year, poster, description, director, \
     cast_members, page_url, published_at, hd_available, lookup_id, external_id, \
     enrichment_status, last_scraped_at";

const UPSERT_MOVIE: &str = "INSERT INTO movies (id, lang, title, year, poster, description, director,
         cast_members, page_url, published_at, hd_available, last_scraped_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
     ON CONFLICT(id) DO UPDATE SET
         title = excluded.title,
         year = excluded.year,
         poster = excluded.poster,
         description = excluded.description,
         director = excluded.director,
         cast_members = excluded.cast_members,
         page_url = excluded.page_url,
         published_at = COALESCE(movies.published_at, excluded.published_at),
         hd_available = excluded.hd_available,
         last_scraped_at = excluded.last_scraped_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            ReelError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    /// Fixed-width UTC timestamps so that text ordering matches time ordering.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn conversion_error(idx: usize, err: ReelError) -> rusqlite::Error {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.to_string().into())
    }

    fn row_to_movie(row: &Row<'_>) -> rusqlite::Result<MovieRecord> {
        let id = row
            .get::<_, String>(0)?
            .parse::<MovieId>()
            .map_err(|e| Self::conversion_error(0, e))?;
        let lang = row
            .get::<_, String>(1)?
            .parse::<Language>()
            .map_err(|e| Self::conversion_error(1, e))?;
        let enrichment = row
            .get::<_, String>(13)?
            .parse::<EnrichmentStatus>()
            .map_err(|e| Self::conversion_error(13, e))?;

        Ok(MovieRecord {
            id,
            lang,
            title: row.get(2)?,
            year: row.get(3)?,
            poster: row.get(4)?,
            description: row.get(5)?,
            director: row.get(6)?,
            cast: serde_json::from_str(&row.get::<_, String>(7)?).unwrap_or_default(),
            page_url: row.get(8)?,
            published_at: row
                .get::<_, Option<String>>(9)?
                .and_then(|s| Self::parse_datetime(&s)),
            hd_available: row.get(10)?,
            lookup_id: row.get(11)?,
            external_id: row.get(12)?,
            enrichment,
            last_scraped_at: row
                .get::<_, String>(14)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    fn row_to_progress(row: &Row<'_>) -> rusqlite::Result<CrawlProgress> {
        let lang = row
            .get::<_, String>(0)?
            .parse::<Language>()
            .map_err(|e| Self::conversion_error(0, e))?;

        Ok(CrawlProgress {
            lang,
            last_page_scraped: row.get::<_, i64>(1)?.max(0) as u32,
            full_scrape_completed: row.get(2)?,
            updated_at: row
                .get::<_, Option<String>>(3)?
                .and_then(|s| Self::parse_datetime(&s)),
        })
    }

    fn query_movies<P: Params>(&self, sql: &str, params: P) -> Result<Vec<MovieRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let movies = stmt
            .query_map(params, Self::row_to_movie)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(movies)
    }

    fn upsert_with(conn: &Connection, movie: &MovieRecord) -> Result<()> {
        let cast = serde_json::to_string(&movie.cast)?;
        conn.execute(
            UPSERT_MOVIE,
            params![
                movie.id.to_string(),
                movie.lang.slug(),
                movie.title,
                movie.year,
                movie.poster,
                movie.description,
                movie.director,
                cast,
                movie.page_url,
                movie.published_at.as_ref().map(Self::format_datetime),
                movie.hd_available,
                Self::format_datetime(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// `CASE` expression ranking a row's language by catalog priority.
    fn priority_sql() -> String {
        let arms: String = Language::ALL
            .iter()
            .map(|l| format!(" WHEN '{}' THEN {}", l.slug(), l.priority()))
            .collect();
        format!("CASE lang{} ELSE {} END", arms, Language::ALL.len())
    }

    /// Order that puts the canonical record of an external id first.
    fn canonical_order() -> String {
        format!(
            "{} ASC, hd_available DESC, published_at IS NULL, published_at DESC, id ASC",
            Self::priority_sql()
        )
    }

    /// One row per external id: the canonical record of each partition.
    fn canonical_cte() -> String {
        format!(
            "WITH ranked AS (
                 SELECT {MOVIE_COLUMNS},
                        ROW_NUMBER() OVER (PARTITION BY external_id ORDER BY {}) AS canonical_rank
                 FROM movies
                 WHERE external_id IS NOT NULL
             )",
            Self::canonical_order()
        )
    }

    fn like_pattern(term: &str) -> String {
        let mut escaped = String::with_capacity(term.len() + 2);
        escaped.push('%');
        for c in term.chars() {
            if matches!(c, '\\' | '%' | '_') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        escaped
    }
}

impl Store for SqliteStore {
    fn upsert_movie(&self, movie: &MovieRecord) -> Result<()> {
        let conn = self.lock()?;
        Self::upsert_with(&conn, movie)
    }

    fn upsert_movies(&self, movies: &[MovieRecord]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for movie in movies {
            Self::upsert_with(&tx, movie)?;
        }

        tx.commit()?;
        Ok(movies.len())
    }

    fn get_movie(&self, id: &MovieId) -> Result<Option<MovieRecord>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                &format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ?1"),
                params![id.to_string()],
                Self::row_to_movie,
            )
            .optional()?;

        Ok(result)
    }

    fn count_movies(&self, lang: Option<Language>) -> Result<i64> {
        let conn = self.lock()?;

        let count = match lang {
            Some(lang) => conn.query_row(
                "SELECT COUNT(*) FROM movies WHERE lang = ?1",
                params![lang.slug()],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?,
        };

        Ok(count)
    }

    fn published_bounds(
        &self,
        lang: Language,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let conn = self.lock()?;

        let (oldest, newest): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(published_at), MAX(published_at) FROM movies WHERE lang = ?1",
            params![lang.slug()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok((
            oldest.and_then(|s| Self::parse_datetime(&s)),
            newest.and_then(|s| Self::parse_datetime(&s)),
        ))
    }

    fn get_progress(&self, lang: Language) -> Result<CrawlProgress> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                "SELECT lang, last_page_scraped, full_scrape_completed, updated_at
                 FROM crawl_progress WHERE lang = ?1",
                params![lang.slug()],
                Self::row_to_progress,
            )
            .optional()?;

        Ok(result.unwrap_or_else(|| CrawlProgress::new(lang)))
    }

    fn get_all_progress(&self) -> Result<Vec<CrawlProgress>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT lang, last_page_scraped, full_scrape_completed, updated_at
             FROM crawl_progress",
        )?;

        let mut progress = stmt
            .query_map([], Self::row_to_progress)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        progress.sort_by_key(|p| p.lang.priority());

        Ok(progress)
    }

    fn save_progress(&self, lang: Language, page: u32, completed: bool) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO crawl_progress (lang, last_page_scraped, full_scrape_completed, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(lang) DO UPDATE SET
                 last_page_scraped = MAX(last_page_scraped, excluded.last_page_scraped),
                 full_scrape_completed = MAX(full_scrape_completed, excluded.full_scrape_completed),
                 updated_at = excluded.updated_at",
            params![
                lang.slug(),
                i64::from(page),
                completed,
                Self::format_datetime(&Utc::now())
            ],
        )?;

        Ok(())
    }

    fn movies_for_enrichment(
        &self,
        status: EnrichmentStatus,
        limit: usize,
    ) -> Result<Vec<MovieRecord>> {
        self.query_movies(
            &format!(
                "SELECT {MOVIE_COLUMNS} FROM movies
                 WHERE enrichment_status = ?1
                 ORDER BY last_scraped_at DESC, id ASC
                 LIMIT ?2"
            ),
            params![status.as_str(), limit as i64],
        )
    }

    fn record_enrichment(
        &self,
        id: &MovieId,
        expected: EnrichmentStatus,
        update: &EnrichmentUpdate,
    ) -> Result<bool> {
        let conn = self.lock()?;

        let changed = conn.execute(
            "UPDATE movies SET enrichment_status = ?1, lookup_id = ?2, external_id = ?3
             WHERE id = ?4 AND enrichment_status = ?5",
            params![
                update.status.as_str(),
                update.lookup_id,
                update.external_id,
                id.to_string(),
                expected.as_str()
            ],
        )?;

        Ok(changed > 0)
    }

    fn enrichment_counts(&self) -> Result<Vec<(EnrichmentStatus, i64)>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT enrichment_status, COUNT(*) FROM movies GROUP BY enrichment_status",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let counts = EnrichmentStatus::ALL
            .into_iter()
            .map(|status| {
                let count = rows
                    .iter()
                    .find(|(s, _)| s == status.as_str())
                    .map(|(_, c)| *c)
                    .unwrap_or(0);
                (status, count)
            })
            .collect();

        Ok(counts)
    }

    fn list_catalog(
        &self,
        lang: Language,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<MovieRecord>> {
        self.query_movies(
            &format!(
                "{} SELECT {MOVIE_COLUMNS} FROM ranked
                 WHERE canonical_rank = 1 AND lang = ?1
                 ORDER BY published_at IS NULL, published_at DESC, title ASC
                 LIMIT ?2 OFFSET ?3",
                Self::canonical_cte()
            ),
            params![lang.slug(), limit as i64, offset as i64],
        )
    }

    fn search_catalog(&self, lang: Language, term: &str, limit: usize) -> Result<Vec<MovieRecord>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        self.query_movies(
            &format!(
                "{} SELECT {MOVIE_COLUMNS} FROM ranked
                 WHERE canonical_rank = 1 AND lang = ?1
                   AND LOWER(title) LIKE LOWER(?2) ESCAPE '\\'
                 ORDER BY year IS NULL, year DESC, title ASC
                 LIMIT ?3",
                Self::canonical_cte()
            ),
            params![
                lang.slug(),
                Self::like_pattern(term),
                limit.min(SEARCH_LIMIT) as i64
            ],
        )
    }

    fn resolve_for_playback(&self, external_id: &str) -> Result<Option<MovieRecord>> {
        let mut movies = self.query_movies(
            &format!(
                "SELECT {MOVIE_COLUMNS} FROM movies
                 WHERE external_id = ?1
                 ORDER BY {}
                 LIMIT 1",
                Self::canonical_order()
            ),
            params![external_id],
        )?;

        Ok(movies.pop())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;

    use super::*;
    use crate::domain::Tier;

    fn movie(lang: Language, native: &str, title: &str) -> MovieRecord {
        MovieRecord::new(
            lang,
            native,
            title.to_string(),
            format!("https://einthusan.tv/movie/watch/{native}/?lang={lang}"),
        )
    }

    fn link(store: &SqliteStore, movie: &MovieRecord, lookup_id: i64, external_id: &str) {
        let update = EnrichmentUpdate::found(lookup_id, Some(external_id.to_string()));
        assert!(store
            .record_enrichment(&movie.id, EnrichmentStatus::Unprocessed, &update)
            .unwrap());
    }

    #[test]
    fn test_upsert_and_get_movie() {
        let store = SqliteStore::in_memory().unwrap();
        let mut record = movie(Language::Tamil, "a1", "Vikram");
        record.year = Some(2022);
        record.cast = vec!["Kamal Haasan".into(), "Fahadh Faasil".into()];
        store.upsert_movie(&record).unwrap();

        let stored = store.get_movie(&record.id).unwrap().unwrap();
        assert_eq!(stored.title, "Vikram");
        assert_eq!(stored.year, Some(2022));
        assert_eq!(stored.cast.len(), 2);
        assert_eq!(stored.enrichment, EnrichmentStatus::Unprocessed);
    }

    #[test]
    fn test_upsert_is_idempotent_and_keeps_latest_values() {
        let store = SqliteStore::in_memory().unwrap();
        let mut first = movie(Language::Tamil, "a1", "Old Title");
        first.poster = Some("https://img/old.jpg".into());
        store.upsert_movie(&first).unwrap();

        let mut second = movie(Language::Tamil, "a1", "New Title");
        second.poster = Some("https://img/new.jpg".into());
        store.upsert_movie(&second).unwrap();

        assert_eq!(store.count_movies(None).unwrap(), 1);
        let stored = store.get_movie(&first.id).unwrap().unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.title, "New Title");
        assert_eq!(stored.poster.as_deref(), Some("https://img/new.jpg"));
    }

    #[test]
    fn test_rescrape_preserves_enrichment() {
        let store = SqliteStore::in_memory().unwrap();
        let record = movie(Language::Hindi, "h1", "Dangal");
        store.upsert_movie(&record).unwrap();
        link(&store, &record, 360814, "tt5074352");

        store.upsert_movie(&movie(Language::Hindi, "h1", "Dangal")).unwrap();

        let stored = store.get_movie(&record.id).unwrap().unwrap();
        assert_eq!(stored.enrichment, EnrichmentStatus::Found);
        assert_eq!(stored.external_id.as_deref(), Some("tt5074352"));
        assert_eq!(stored.lookup_id, Some(360814));
    }

    #[test]
    fn test_upsert_movies_batch() {
        let store = SqliteStore::in_memory().unwrap();
        let batch: Vec<_> = (0..5)
            .map(|i| movie(Language::Telugu, &format!("t{i}"), &format!("Title {i}")))
            .collect();

        assert_eq!(store.upsert_movies(&batch).unwrap(), 5);
        assert_eq!(store.count_movies(Some(Language::Telugu)).unwrap(), 5);
        assert_eq!(store.count_movies(Some(Language::Tamil)).unwrap(), 0);
    }

    #[test]
    fn test_first_published_stamp_is_kept() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.published_bounds(Language::Tamil).unwrap(), (None, None));

        let first = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut record = movie(Language::Tamil, "k1", "Kaithi");
        record.published_at = Some(first);
        store.upsert_movie(&record).unwrap();

        record.published_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        store.upsert_movie(&record).unwrap();
        record.published_at = None;
        store.upsert_movie(&record).unwrap();

        let stored = store.get_movie(&record.id).unwrap().unwrap();
        assert_eq!(stored.published_at, Some(first));

        let mut older = movie(Language::Tamil, "k0", "Kaaka Muttai");
        older.published_at = Some(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap());
        store.upsert_movie(&older).unwrap();
        store.upsert_movie(&movie(Language::Tamil, "k2", "Undated")).unwrap();

        assert_eq!(
            store.published_bounds(Language::Tamil).unwrap(),
            (older.published_at, Some(first))
        );
        assert_eq!(store.published_bounds(Language::Hindi).unwrap(), (None, None));
    }

    #[test]
    fn test_progress_defaults_without_row() {
        let store = SqliteStore::in_memory().unwrap();
        let progress = store.get_progress(Language::Kannada).unwrap();
        assert_eq!(progress.last_page_scraped, 0);
        assert!(!progress.full_scrape_completed);
        assert!(store.get_all_progress().unwrap().is_empty());
    }

    #[test]
    fn test_progress_never_regresses() {
        let store = SqliteStore::in_memory().unwrap();
        store.save_progress(Language::Tamil, 5, false).unwrap();
        store.save_progress(Language::Tamil, 3, false).unwrap();
        assert_eq!(store.get_progress(Language::Tamil).unwrap().last_page_scraped, 5);

        store.save_progress(Language::Tamil, 6, true).unwrap();
        store.save_progress(Language::Tamil, 7, false).unwrap();
        let progress = store.get_progress(Language::Tamil).unwrap();
        assert_eq!(progress.last_page_scraped, 7);
        assert!(progress.full_scrape_completed);
    }

    #[test]
    fn test_enrichment_population_and_compare_and_set() {
        let store = SqliteStore::in_memory().unwrap();
        let record = movie(Language::Tamil, "a1", "Her (2024)");
        store.upsert_movie(&record).unwrap();

        let pending = store
            .movies_for_enrichment(EnrichmentStatus::Unprocessed, 10)
            .unwrap();
        assert_eq!(pending.len(), 1);

        let applied = store
            .record_enrichment(
                &record.id,
                EnrichmentStatus::Unprocessed,
                &EnrichmentUpdate::not_found(Tier::Strict),
            )
            .unwrap();
        assert!(applied);

        // Stale writer expecting the old status is rejected
        let stale = store
            .record_enrichment(
                &record.id,
                EnrichmentStatus::Unprocessed,
                &EnrichmentUpdate::found(1, Some("tt1".into())),
            )
            .unwrap();
        assert!(!stale);

        assert!(store
            .movies_for_enrichment(EnrichmentStatus::Unprocessed, 10)
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .movies_for_enrichment(EnrichmentStatus::NotFoundStrict, 10)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_enrichment_counts_cover_every_status() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_movie(&movie(Language::Tamil, "a", "A")).unwrap();
        store.upsert_movie(&movie(Language::Tamil, "b", "B")).unwrap();

        let counts = store.enrichment_counts().unwrap();
        assert_eq!(counts.len(), EnrichmentStatus::ALL.len());
        assert!(counts.contains(&(EnrichmentStatus::Unprocessed, 2)));
        assert!(counts.contains(&(EnrichmentStatus::Found, 0)));
    }

    #[test]
    fn test_list_catalog_deduplicates_across_languages() {
        let store = SqliteStore::in_memory().unwrap();
        let tamil = movie(Language::Tamil, "t1", "Baahubali");
        let telugu = movie(Language::Telugu, "te1", "Baahubali");
        let hindi = movie(Language::Hindi, "h1", "Baahubali");
        let telugu_only = movie(Language::Telugu, "te2", "Eega");
        let unlinked = movie(Language::Telugu, "te3", "Unknown Film");
        for m in [&tamil, &telugu, &hindi, &telugu_only, &unlinked] {
            store.upsert_movie(m).unwrap();
        }
        link(&store, &tamil, 1, "tt2631186");
        link(&store, &telugu, 1, "tt2631186");
        link(&store, &hindi, 1, "tt2631186");
        link(&store, &telugu_only, 2, "tt2258337");

        let tamil_page = store.list_catalog(Language::Tamil, 0, 100).unwrap();
        assert_eq!(tamil_page.len(), 1);
        assert_eq!(tamil_page[0].id, tamil.id);

        let telugu_page = store.list_catalog(Language::Telugu, 0, 100).unwrap();
        assert_eq!(telugu_page.len(), 1);
        assert_eq!(telugu_page[0].id, telugu_only.id);

        assert!(store.list_catalog(Language::Hindi, 0, 100).unwrap().is_empty());

        let mut seen = HashSet::new();
        for lang in Language::ALL {
            for record in store.list_catalog(lang, 0, 100).unwrap() {
                assert!(seen.insert(record.external_id.clone().unwrap()));
            }
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_list_catalog_ordering_and_paging() {
        let store = SqliteStore::in_memory().unwrap();
        let mut newer = movie(Language::Hindi, "n", "Zebra");
        newer.published_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let mut older = movie(Language::Hindi, "o", "Apple");
        older.published_at = Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        let undated_b = movie(Language::Hindi, "b", "Banana");
        let undated_a = movie(Language::Hindi, "a", "Avocado");

        for (i, m) in [&newer, &older, &undated_b, &undated_a].into_iter().enumerate() {
            store.upsert_movie(m).unwrap();
            link(&store, m, i as i64, &format!("tt{i}"));
        }

        let titles: Vec<_> = store
            .list_catalog(Language::Hindi, 0, 10)
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["Zebra", "Apple", "Avocado", "Banana"]);

        let second_page = store.list_catalog(Language::Hindi, 2, 1).unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].title, "Avocado");
    }

    #[test]
    fn test_search_catalog_filters_and_orders() {
        let store = SqliteStore::in_memory().unwrap();
        let mut old = movie(Language::Malayalam, "m1", "Drishyam");
        old.year = Some(2013);
        let mut new = movie(Language::Malayalam, "m2", "Drishyam 2");
        new.year = Some(2021);
        let other = movie(Language::Malayalam, "m3", "Premam");
        for (i, m) in [&old, &new, &other].into_iter().enumerate() {
            store.upsert_movie(m).unwrap();
            link(&store, m, i as i64, &format!("tt{i}"));
        }

        let results = store
            .search_catalog(Language::Malayalam, "drishYAM", 10)
            .unwrap();
        let titles: Vec<_> = results.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Drishyam 2", "Drishyam"]);

        assert!(store
            .search_catalog(Language::Malayalam, "   ", 10)
            .unwrap()
            .is_empty());
        assert!(store
            .search_catalog(Language::Malayalam, "%", 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_search_catalog_caps_limit() {
        let store = SqliteStore::in_memory().unwrap();
        for i in 0..60 {
            let m = movie(Language::Tamil, &format!("x{i}"), &format!("Movie {i}"));
            store.upsert_movie(&m).unwrap();
            link(&store, &m, i, &format!("tt{i}"));
        }

        let results = store.search_catalog(Language::Tamil, "movie", 500).unwrap();
        assert_eq!(results.len(), SEARCH_LIMIT);
    }

    #[test]
    fn test_resolve_for_playback_prefers_priority_language() {
        let store = SqliteStore::in_memory().unwrap();
        let hindi = movie(Language::Hindi, "h", "RRR");
        let mut telugu = movie(Language::Telugu, "te", "RRR");
        telugu.hd_available = true;
        store.upsert_movie(&hindi).unwrap();
        store.upsert_movie(&telugu).unwrap();
        link(&store, &hindi, 579974, "tt8178634");
        link(&store, &telugu, 579974, "tt8178634");

        let resolved = store.resolve_for_playback("tt8178634").unwrap().unwrap();
        assert_eq!(resolved.lang, Language::Hindi);
        assert!(store.resolve_for_playback("tt0000000").unwrap().is_none());
    }

    #[test]
    fn test_resolve_for_playback_tie_breaks_on_hd_then_recency() {
        let store = SqliteStore::in_memory().unwrap();
        let mut sd = movie(Language::Tamil, "sd", "Jailer");
        sd.published_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let mut hd = movie(Language::Tamil, "hd", "Jailer");
        hd.hd_available = true;
        let mut hd_newer = movie(Language::Tamil, "hd2", "Jailer");
        hd_newer.hd_available = true;
        hd_newer.published_at = Some(Utc.with_ymd_and_hms(2023, 9, 1, 0, 0, 0).unwrap());

        for m in [&sd, &hd, &hd_newer] {
            store.upsert_movie(m).unwrap();
            link(&store, m, 1, "tt15354916");
        }

        let resolved = store.resolve_for_playback("tt15354916").unwrap().unwrap();
        assert_eq!(resolved.id, hd_newer.id);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reelcrawl.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.upsert_movie(&movie(Language::Bengali, "b1", "Aparajito")).unwrap();
            store.save_progress(Language::Bengali, 12, false).unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.count_movies(Some(Language::Bengali)).unwrap(), 1);
        assert_eq!(store.get_progress(Language::Bengali).unwrap().last_page_scraped, 12);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(SqliteStore::like_pattern("a%b_c\\"), "%a\\%b\\_c\\\\%");
    }
}
