use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::app::{ReelError, Result};
use crate::domain::MovieRecord;
use crate::fetcher::session::{post_form, Session};
use crate::scraper::{decode_stream_link, extract_player_tokens};

#[derive(Debug, Deserialize)]
struct PingResponse {
    #[serde(rename = "Data")]
    data: Option<PingData>,
}

#[derive(Debug, Deserialize)]
struct PingData {
    #[serde(rename = "EJLinks")]
    ej_links: Option<String>,
}

/// Watch page URL, with the UHD switch when asking for the HD stream.
pub(crate) fn watch_url(record: &MovieRecord, hd: bool) -> Result<Url> {
    let mut url = Url::parse(&record.page_url)?;
    if hd {
        url.query_pairs_mut().append_pair("uhd", "true");
    }
    Ok(url)
}

/// Resolve the HLS playlist of `record` through `session`.
///
/// `Ok(None)` means the watch page offered no player, which is what the
/// site serves when the stream needs a premium account.
pub(crate) async fn resolve_stream(
    session: &Session,
    base_url: &Url,
    record: &MovieRecord,
    hd: bool,
) -> Result<Option<String>> {
    let page = session
        .client()
        .get(watch_url(record, hd)?)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let Some(tokens) = extract_player_tokens(&page) else {
        debug!(id = %record.id, hd, "Watch page has no player");
        return Ok(None);
    };

    let mut ping_url = base_url.join(&format!("/ajax/movie/watch/{}/", record.id.native_id()))?;
    ping_url
        .query_pairs_mut()
        .append_pair("lang", record.lang.slug());

    let outcome = json!({ "EJOutcomes": tokens.ejpingables, "NativeHLS": false }).to_string();
    let response = post_form(
        session.client(),
        ping_url,
        &[
            ("xEvent", "UIVideoPlayer.PingOutcome"),
            ("xJson", &outcome),
            ("gorilla.csrf.Token", &tokens.csrf_token),
        ],
    )
    .await?;

    let ping: PingResponse = response.json().await?;
    let links = ping
        .data
        .and_then(|d| d.ej_links)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ReelError::Parse("Ping response carries no stream links".into()))?;

    decode_stream_link(&links)
}
