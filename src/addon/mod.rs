//! Stremio addon HTTP surface.

pub mod handlers;
pub mod types;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::Result;
use crate::catalog::Catalog;
use crate::domain::Language;
use crate::fetcher::StreamSource;

/// Shared state of the addon handlers.
#[derive(Clone)]
pub struct AddonState {
    pub catalog: Catalog,
    pub streams: Arc<dyn StreamSource + Send + Sync>,
    pub languages: Vec<Language>,
}

/// Build the addon router.
pub fn build_router(state: AddonState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/manifest.json", get(handlers::manifest))
        .route("/catalog/{kind}/{id}", get(handlers::catalog))
        .route("/catalog/{kind}/{id}/{extra}", get(handlers::catalog_with_extra))
        .route("/meta/{kind}/{id}", get(handlers::meta))
        .route("/stream/{kind}/{id}", get(handlers::stream))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the addon until `shutdown` resolves.
pub async fn serve<F>(state: AddonState, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Addon listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Addon server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::app::ReelError;
    use crate::domain::{EnrichmentStatus, MovieRecord};
    use crate::fetcher::StreamDescriptor;
    use crate::store::{EnrichmentUpdate, SqliteStore, Store};

    struct FakeStreams {
        fail: bool,
    }

    #[async_trait]
    impl StreamSource for FakeStreams {
        async fn fetch_streams(&self, record: &MovieRecord) -> crate::app::Result<Vec<StreamDescriptor>> {
            if self.fail {
                return Err(ReelError::Session("login rejected".into()));
            }
            Ok(vec![StreamDescriptor::new(
                "Einthusan SD",
                format!("https://cdn.example.com/{}.m3u8", record.id.native_id()),
            )])
        }
    }

    fn app(fail_streams: bool) -> Router {
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let movies = [
            (Language::Tamil, "t1", "Vikram", Some(2022), Some("tt100")),
            (Language::Hindi, "h1", "Vikram", Some(2022), Some("tt100")),
            (Language::Hindi, "h2", "Pathaan", Some(2023), Some("tt200")),
            (Language::Hindi, "h3", "Obscure", None, None),
        ];
        for (i, (lang, native, title, year, external)) in movies.into_iter().enumerate() {
            let mut record = MovieRecord::new(
                lang,
                native,
                title.to_string(),
                format!("https://einthusan.tv/movie/watch/{native}/?lang={lang}"),
            );
            record.year = year;
            record.director = Some("A Director".into());
            store.upsert_movie(&record).unwrap();
            if let Some(external) = external {
                store
                    .record_enrichment(
                        &record.id,
                        EnrichmentStatus::Unprocessed,
                        &EnrichmentUpdate::found(i as i64, Some(external.to_string())),
                    )
                    .unwrap();
            }
        }

        build_router(AddonState {
            catalog: Catalog::new(store),
            streams: Arc::new(FakeStreams { fail: fail_streams }),
            languages: vec![Language::Tamil, Language::Hindi],
        })
    }

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_manifest() {
        let json = get_json(app(false), "/manifest.json").await;

        assert_eq!(json["id"], "org.einthusan.stremio");
        assert_eq!(json["resources"], serde_json::json!(["catalog", "meta", "stream"]));
        assert_eq!(json["idPrefixes"], serde_json::json!(["ein", "tt"]));
        assert_eq!(json["catalogs"].as_array().unwrap().len(), 2);
        assert_eq!(json["catalogs"][0]["id"], "einthusan-tamil");
        assert_eq!(json["catalogs"][0]["type"], "movie");
        assert_eq!(json["catalogs"][1]["extra"][0]["name"], "search");
    }

    #[tokio::test]
    async fn test_catalog_shows_canonical_entries() {
        let json = get_json(app(false), "/catalog/movie/einthusan-hindi.json").await;
        let metas = json["metas"].as_array().unwrap();

        // Vikram belongs to the Tamil catalog, Obscure has no external id
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0]["id"], "tt200");
        assert_eq!(metas[0]["name"], "Pathaan");
        assert_eq!(metas[0]["year"], 2023);
    }

    #[tokio::test]
    async fn test_catalog_search_and_skip_extras() {
        let json = get_json(app(false), "/catalog/movie/einthusan-tamil/search=vik.json").await;
        assert_eq!(json["metas"][0]["id"], "tt100");

        let json = get_json(app(false), "/catalog/movie/einthusan-tamil/skip=100.json").await;
        assert!(json["metas"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_catalog_is_empty() {
        let json = get_json(app(false), "/catalog/movie/einthusan-punjabi.json").await;
        assert_eq!(json, serde_json::json!({ "metas": [] }));

        let json = get_json(app(false), "/catalog/series/einthusan-tamil.json").await;
        assert_eq!(json, serde_json::json!({ "metas": [] }));
    }

    #[tokio::test]
    async fn test_meta_by_external_and_internal_id() {
        let json = get_json(app(false), "/meta/movie/tt100.json").await;
        assert_eq!(json["meta"]["name"], "Vikram");
        assert_eq!(json["meta"]["language"], "Tamil");
        assert_eq!(json["meta"]["director"], serde_json::json!(["A Director"]));

        let json = get_json(app(false), "/meta/movie/ein:hindi:h3.json").await;
        assert_eq!(json["meta"]["id"], "ein:hindi:h3");

        let json = get_json(app(false), "/meta/movie/tt404.json").await;
        assert_eq!(json, serde_json::json!({ "meta": null }));
    }

    #[tokio::test]
    async fn test_stream_resolves_canonical_record() {
        let json = get_json(app(false), "/stream/movie/tt100.json").await;
        assert_eq!(json["streams"][0]["url"], "https://cdn.example.com/t1.m3u8");
        assert_eq!(json["streams"][0]["title"], "Einthusan SD");
    }

    #[tokio::test]
    async fn test_stream_failures_are_empty() {
        let json = get_json(app(true), "/stream/movie/tt100.json").await;
        assert_eq!(json, serde_json::json!({ "streams": [] }));

        let json = get_json(app(false), "/stream/movie/tt404.json").await;
        assert_eq!(json, serde_json::json!({ "streams": [] }));
    }

    #[test]
    fn test_parse_extra() {
        assert_eq!(
            handlers::parse_extra("search=the+dark&skip=200"),
            (Some("the dark".to_string()), 200)
        );
        assert_eq!(handlers::parse_extra("skip=abc"), (None, 0));
        assert_eq!(handlers::parse_extra("search=%20"), (None, 0));
    }
}
