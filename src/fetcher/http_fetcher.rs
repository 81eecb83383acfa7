use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::{Client, StatusCode};
use serde_json::json;

use crate::app::Result;

/// One way of reaching the site: directly, or through a page-fetch proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPath {
    Direct,
    Proxy(String),
}

impl std::fmt::Display for FetchPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchPath::Direct => write!(f, "direct"),
            FetchPath::Proxy(url) => write!(f, "proxy {}", url),
        }
    }
}

#[derive(Debug)]
pub enum FetchResult {
    /// Page body fetched successfully
    Content(String),
    /// The path answered HTTP 429
    TooManyRequests,
}

/// Plain page fetcher shared by the listing crawl.
pub struct HttpFetcher {
    client: Client,
    proxies: Vec<String>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str, proxies: Vec<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client, proxies })
    }

    /// Paths to try for the next request, proxies in random order.
    pub fn paths(&self) -> Vec<FetchPath> {
        if self.proxies.is_empty() {
            return vec![FetchPath::Direct];
        }

        let mut paths: Vec<FetchPath> = self
            .proxies
            .iter()
            .cloned()
            .map(FetchPath::Proxy)
            .collect();
        paths.shuffle(&mut rand::rng());
        paths
    }

    pub async fn fetch(&self, path: &FetchPath, url: &str) -> Result<FetchResult> {
        let request = match path {
            FetchPath::Direct => self.client.get(url),
            FetchPath::Proxy(proxy) => self.client.post(proxy).json(&json!({ "pageURL": url })),
        };

        let response = request.send().await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Ok(FetchResult::TooManyRequests);
        }

        response.error_for_status_ref()?;

        Ok(FetchResult::Content(response.text().await?))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fetcher(proxies: Vec<String>) -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5), "reelcrawl-test", proxies).unwrap()
    }

    #[test]
    fn test_paths_without_proxies_is_direct() {
        assert_eq!(fetcher(Vec::new()).paths(), vec![FetchPath::Direct]);
    }

    #[test]
    fn test_paths_cover_every_proxy() {
        let proxies = vec!["http://a".to_string(), "http://b".to_string(), "http://c".to_string()];
        let mut paths = fetcher(proxies.clone()).paths();
        paths.sort_by_key(|p| p.to_string());

        let expected: Vec<FetchPath> = proxies.into_iter().map(FetchPath::Proxy).collect();
        assert_eq!(paths, expected);
    }

    #[tokio::test]
    async fn test_proxy_receives_page_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fetch"))
            .and(body_json(json!({ "pageURL": "https://site.example/page" })))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let proxy = format!("{}/fetch", server.uri());
        let fetcher = fetcher(vec![proxy.clone()]);
        let result = fetcher
            .fetch(&FetchPath::Proxy(proxy), "https://site.example/page")
            .await
            .unwrap();

        assert!(matches!(result, FetchResult::Content(body) if body == "<html>ok</html>"));
    }

    #[tokio::test]
    async fn test_429_and_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = fetcher(Vec::new());
        let slow = fetcher
            .fetch(&FetchPath::Direct, &format!("{}/slow", server.uri()))
            .await
            .unwrap();
        assert!(matches!(slow, FetchResult::TooManyRequests));

        let broken = fetcher
            .fetch(&FetchPath::Direct, &format!("{}/broken", server.uri()))
            .await;
        assert!(broken.is_err());
    }
}
