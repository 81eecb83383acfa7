use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::app::{ReelError, Result};
use crate::config::SiteConfig;
use crate::scraper::extract_login_token;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A cookie-carrying client bound to one site visit.
#[derive(Clone)]
pub struct Session {
    client: Client,
    created_at: Instant,
    premium: bool,
}

impl Session {
    /// Fresh anonymous session with its own cookie jar.
    pub fn anonymous(config: &SiteConfig) -> Result<Self> {
        Ok(Self {
            client: cookie_client(config)?,
            created_at: Instant::now(),
            premium: false,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn is_premium(&self) -> bool {
        self.premium
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

fn cookie_client(config: &SiteConfig) -> Result<Client> {
    Ok(Client::builder()
        .cookie_store(true)
        .timeout(config.timeout())
        .gzip(true)
        .brotli(true)
        .user_agent(&config.user_agent)
        .build()?)
}

/// Encode `fields` as an `application/x-www-form-urlencoded` body.
pub(crate) fn form_body(fields: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// POST a form through `client`.
pub(crate) async fn post_form(
    client: &Client,
    url: Url,
    fields: &[(&str, &str)],
) -> Result<reqwest::Response> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
        .body(form_body(fields))
        .send()
        .await?;
    response.error_for_status_ref()?;
    Ok(response)
}

#[async_trait]
pub trait SessionProvider {
    /// Return a usable session, logging in if needed.
    async fn acquire(&self) -> Result<Session>;
    async fn is_valid(&self) -> bool;
    async fn invalidate(&self);
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "Message", default)]
    message: String,
}

/// Logged-in premium session, cached until invalidated or too old.
pub struct PremiumSession {
    config: SiteConfig,
    base_url: Url,
    current: Mutex<Option<Session>>,
}

impl PremiumSession {
    pub fn new(config: SiteConfig) -> Result<Self> {
        if !config.has_credentials() {
            return Err(ReelError::Session("No premium credentials configured".into()));
        }
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            config,
            base_url,
            current: Mutex::new(None),
        })
    }

    fn fresh(&self, session: &Session) -> bool {
        session.age() < self.config.session_max_age
    }

    async fn login(&self) -> Result<Session> {
        let username = self.config.username.as_deref().unwrap_or_default();
        let password = self.config.password.as_deref().unwrap_or_default();
        let client = cookie_client(&self.config)?;

        let login_page = client
            .get(self.base_url.join("/login/")?)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let csrf_token = extract_login_token(&login_page)
            .ok_or_else(|| ReelError::Session("Login page has no CSRF token".into()))?;

        let credentials = json!({ "Email": username, "Password": password }).to_string();
        let response = post_form(
            &client,
            self.base_url.join("/ajax/login/")?,
            &[
                ("xEvent", "Login"),
                ("xJson", &credentials),
                ("gorilla.csrf.Token", &csrf_token),
            ],
        )
        .await?;

        let outcome: LoginResponse = response.json().await?;
        if outcome.message != "success" {
            return Err(ReelError::Session(format!(
                "Login rejected: {}",
                if outcome.message.is_empty() {
                    "no message"
                } else {
                    outcome.message.as_str()
                }
            )));
        }

        info!(user = %username, "Premium session established");
        Ok(Session {
            client,
            created_at: Instant::now(),
            premium: true,
        })
    }
}

#[async_trait]
impl SessionProvider for PremiumSession {
    async fn acquire(&self) -> Result<Session> {
        let mut current = self.current.lock().await;

        if let Some(session) = current.as_ref() {
            if self.fresh(session) {
                return Ok(session.clone());
            }
            debug!("Premium session expired, logging in again");
        }

        let session = self.login().await?;
        *current = Some(session.clone());
        Ok(session)
    }

    async fn is_valid(&self) -> bool {
        self.current
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| self.fresh(s))
    }

    async fn invalidate(&self) {
        if self.current.lock().await.take().is_some() {
            debug!("Premium session invalidated");
        }
    }
}
