//! Addon route handlers.
//!
//! Every resource path ends in `.json`; ids are taken from the last path
//! segment with that suffix removed. Failures never surface as error
//! statuses, only as empty payloads.

use axum::extract::{Path, State};
use axum::Json;
use tracing::{debug, warn};

use crate::addon::types::{
    catalog_language, CatalogResponse, Manifest, MetaDetail, MetaPreview, MetaResponse,
    StreamResponse, CONTENT_TYPE,
};
use crate::addon::AddonState;

fn strip_json(segment: &str) -> &str {
    segment.strip_suffix(".json").unwrap_or(segment)
}

/// Search term and skip offset from an extras segment like `search=leo&skip=100`.
pub(crate) fn parse_extra(extra: &str) -> (Option<String>, usize) {
    let mut search = None;
    let mut skip = 0;

    for (key, value) in url::form_urlencoded::parse(extra.as_bytes()) {
        match key.as_ref() {
            "search" if !value.trim().is_empty() => search = Some(value.trim().to_string()),
            "skip" => skip = value.parse().unwrap_or(0),
            _ => {}
        }
    }

    (search, skip)
}

/// GET /manifest.json
pub async fn manifest(State(state): State<AddonState>) -> Json<Manifest> {
    Json(Manifest::new(&state.languages))
}

fn catalog_page(state: &AddonState, kind: &str, id: &str, extra: &str) -> CatalogResponse {
    let lang = match catalog_language(strip_json(id)) {
        Some(lang) if kind == CONTENT_TYPE && state.languages.contains(&lang) => lang,
        _ => {
            debug!(kind, id, "Unknown catalog requested");
            return CatalogResponse { metas: Vec::new() };
        }
    };

    let (search, skip) = parse_extra(strip_json(extra));
    let records = match search {
        Some(term) => state.catalog.search(lang, &term),
        None => state.catalog.list(lang, skip),
    };

    CatalogResponse {
        metas: records.iter().map(MetaPreview::from).collect(),
    }
}

/// GET /catalog/{type}/{id}.json
pub async fn catalog(
    State(state): State<AddonState>,
    Path((kind, id)): Path<(String, String)>,
) -> Json<CatalogResponse> {
    Json(catalog_page(&state, &kind, &id, ""))
}

/// GET /catalog/{type}/{id}/{extra}.json
pub async fn catalog_with_extra(
    State(state): State<AddonState>,
    Path((kind, id, extra)): Path<(String, String, String)>,
) -> Json<CatalogResponse> {
    Json(catalog_page(&state, &kind, &id, &extra))
}

/// GET /meta/{type}/{id}.json
pub async fn meta(
    State(state): State<AddonState>,
    Path((kind, id)): Path<(String, String)>,
) -> Json<MetaResponse> {
    let meta = if kind == CONTENT_TYPE {
        state
            .catalog
            .resolve_meta(strip_json(&id))
            .as_ref()
            .map(MetaDetail::from)
    } else {
        None
    };

    Json(MetaResponse { meta })
}

/// GET /stream/{type}/{id}.json
pub async fn stream(
    State(state): State<AddonState>,
    Path((kind, id)): Path<(String, String)>,
) -> Json<StreamResponse> {
    let id = strip_json(&id);
    let record = if kind == CONTENT_TYPE {
        state.catalog.resolve_meta(id)
    } else {
        None
    };

    let Some(record) = record else {
        debug!(id, "No record for stream request");
        return Json(StreamResponse {
            streams: Vec::new(),
        });
    };

    let streams = match state.streams.fetch_streams(&record).await {
        Ok(streams) => streams,
        Err(e) => {
            warn!(id, record = %record.id, error = %e, "Stream resolution failed");
            Vec::new()
        }
    };

    Json(StreamResponse { streams })
}
