use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::ReelError;
use crate::domain::{EnrichmentStatus, Language};

/// Prefix shared by every internal id, and the addon's id namespace.
pub const ID_PREFIX: &str = "ein";

/// Internal key of a scraped listing: `ein:<lang>:<native id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MovieId {
    lang: Language,
    native_id: String,
}

impl MovieId {
    pub fn new(lang: Language, native_id: impl Into<String>) -> Self {
        Self {
            lang,
            native_id: native_id.into(),
        }
    }

    pub fn lang(&self) -> Language {
        self.lang
    }

    pub fn native_id(&self) -> &str {
        &self.native_id
    }

    /// Whether a raw id string belongs to this addon's namespace
    pub fn is_internal(raw: &str) -> bool {
        raw.strip_prefix(ID_PREFIX)
            .is_some_and(|rest| rest.starts_with(':'))
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", ID_PREFIX, self.lang, self.native_id)
    }
}

impl FromStr for MovieId {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (prefix, lang, native) = match (parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(l), Some(n)) => (p, l, n),
            _ => return Err(ReelError::InvalidId(s.to_string())),
        };

        if prefix != ID_PREFIX || native.is_empty() {
            return Err(ReelError::InvalidId(s.to_string()));
        }

        let lang = lang
            .parse::<Language>()
            .map_err(|_| ReelError::InvalidId(s.to_string()))?;

        Ok(Self::new(lang, native))
    }
}

impl TryFrom<String> for MovieId {
    type Error = ReelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MovieId> for String {
    fn from(id: MovieId) -> Self {
        id.to_string()
    }
}

/// One scraped listing of a movie in one language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: MovieId,
    pub lang: Language,
    pub title: String,
    pub year: Option<i32>,
    pub poster: Option<String>,
    pub description: Option<String>,
    pub director: Option<String>,
    pub cast: Vec<String>,
    pub page_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub hd_available: bool,
    pub lookup_id: Option<i64>,
    pub external_id: Option<String>,
    pub enrichment: EnrichmentStatus,
    pub last_scraped_at: DateTime<Utc>,
}

impl MovieRecord {
    pub fn new(lang: Language, native_id: &str, title: String, page_url: String) -> Self {
        Self {
            id: MovieId::new(lang, native_id),
            lang,
            title,
            year: None,
            poster: None,
            description: None,
            director: None,
            cast: Vec::new(),
            page_url,
            published_at: None,
            hd_available: false,
            lookup_id: None,
            external_id: None,
            enrichment: EnrichmentStatus::Unprocessed,
            last_scraped_at: Utc::now(),
        }
    }

    /// Id shown to clients: the universal id when known, else the internal one.
    pub fn public_id(&self) -> String {
        self.external_id
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_id_display() {
        let id = MovieId::new(Language::Tamil, "8Xnc");
        assert_eq!(id.to_string(), "ein:tamil:8Xnc");
    }

    #[test]
    fn test_movie_id_parse() {
        let id: MovieId = "ein:hindi:a.b-9".parse().unwrap();
        assert_eq!(id.lang(), Language::Hindi);
        assert_eq!(id.native_id(), "a.b-9");
    }

    #[test]
    fn test_movie_id_parse_rejects_garbage() {
        assert!("tt0111161".parse::<MovieId>().is_err());
        assert!("ein:tamil:".parse::<MovieId>().is_err());
        assert!("ein:klingon:x".parse::<MovieId>().is_err());
        assert!("abc:tamil:x".parse::<MovieId>().is_err());
    }

    #[test]
    fn test_is_internal() {
        assert!(MovieId::is_internal("ein:tamil:x"));
        assert!(!MovieId::is_internal("tt0111161"));
        assert!(!MovieId::is_internal("einstein"));
    }

    #[test]
    fn test_public_id_prefers_external() {
        let mut record = MovieRecord::new(
            Language::Tamil,
            "x1",
            "Vikram".into(),
            "https://example.com/movie/watch/x1/?lang=tamil".into(),
        );
        assert_eq!(record.public_id(), "ein:tamil:x1");
        record.external_id = Some("tt9179430".into());
        assert_eq!(record.public_id(), "tt9179430");
    }
}
