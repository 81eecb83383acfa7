//! Wire types of the addon protocol.

use serde::Serialize;

use crate::domain::{Language, MovieRecord};
use crate::fetcher::StreamDescriptor;

pub const ADDON_ID: &str = "org.einthusan.stremio";
pub const CONTENT_TYPE: &str = "movie";
pub const CATALOG_PREFIX: &str = "einthusan-";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: &'static str,
    pub version: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub resources: Vec<&'static str>,
    pub types: Vec<&'static str>,
    pub catalogs: Vec<CatalogDescriptor>,
    pub id_prefixes: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDescriptor {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub name: String,
    pub extra: Vec<ExtraDescriptor>,
    pub extra_supported: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraDescriptor {
    pub name: &'static str,
    pub is_required: bool,
}

impl Manifest {
    pub fn new(languages: &[Language]) -> Self {
        let catalogs = languages
            .iter()
            .map(|lang| CatalogDescriptor {
                kind: CONTENT_TYPE,
                id: catalog_id(*lang),
                name: format!("Einthusan {}", lang.display_name()),
                extra: vec![
                    ExtraDescriptor {
                        name: "search",
                        is_required: false,
                    },
                    ExtraDescriptor {
                        name: "skip",
                        is_required: false,
                    },
                ],
                extra_supported: vec!["search", "skip"],
            })
            .collect();

        Self {
            id: ADDON_ID,
            version: env!("CARGO_PKG_VERSION"),
            name: "Einthusan",
            description: "Indian cinema from Einthusan, matched to IMDb",
            resources: vec!["catalog", "meta", "stream"],
            types: vec![CONTENT_TYPE],
            catalogs,
            id_prefixes: vec!["ein", "tt"],
        }
    }
}

pub fn catalog_id(lang: Language) -> String {
    format!("{}{}", CATALOG_PREFIX, lang.slug())
}

/// Language of a catalog id, if it names one of ours.
pub fn catalog_language(id: &str) -> Option<Language> {
    id.strip_prefix(CATALOG_PREFIX)?.parse().ok()
}

#[derive(Debug, Serialize)]
pub struct MetaPreview {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl From<&MovieRecord> for MetaPreview {
    fn from(record: &MovieRecord) -> Self {
        Self {
            id: record.public_id(),
            kind: CONTENT_TYPE,
            name: record.title.clone(),
            poster: record.poster.clone(),
            year: record.year,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaDetail {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub director: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cast: Vec<String>,
    pub language: &'static str,
}

impl From<&MovieRecord> for MetaDetail {
    fn from(record: &MovieRecord) -> Self {
        Self {
            id: record.public_id(),
            kind: CONTENT_TYPE,
            name: record.title.clone(),
            poster: record.poster.clone(),
            background: record.poster.clone(),
            description: record.description.clone(),
            year: record.year,
            release_info: record.year.map(|y| y.to_string()),
            director: record.director.iter().cloned().collect(),
            cast: record.cast.clone(),
            language: record.lang.display_name(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub metas: Vec<MetaPreview>,
}

#[derive(Debug, Serialize)]
pub struct MetaResponse {
    pub meta: Option<MetaDetail>,
}

#[derive(Debug, Serialize)]
pub struct StreamResponse {
    pub streams: Vec<StreamDescriptor>,
}
