use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use scraper::{Html, Selector};
use serde::Deserialize;

use crate::app::{ReelError, Result};

/// Tokens the watch page embeds for the player's ping request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerTokens {
    pub ejpingables: String,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
struct DecodedLinks {
    #[serde(rename = "HLSLink")]
    hls_link: Option<String>,
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
        .filter(|v| !v.is_empty())
}

/// Pull the player tokens out of a watch page.
pub fn extract_player_tokens(html: &str) -> Option<PlayerTokens> {
    let document = Html::parse_document(html);
    let ejpingables = first_attr(&document, "#UIVideoPlayer", "data-ejpingables")?;
    let csrf_token = first_attr(&document, "html", "data-pageid")?;
    Some(PlayerTokens {
        ejpingables,
        csrf_token,
    })
}

/// CSRF token of the login form.
pub fn extract_login_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    first_attr(&document, "#login-form", "data-pageid")
}

/// Undo the link scrambling: the last character belongs at index 10 and
/// the two characters after the first ten are padding.
pub fn unscramble_links(scrambled: &str) -> Option<String> {
    const SPLIT: usize = 10;

    if !scrambled.is_ascii() || scrambled.len() < SPLIT + 3 {
        return None;
    }

    let last = &scrambled[scrambled.len() - 1..];
    let mut out = String::with_capacity(scrambled.len() - 2);
    out.push_str(&scrambled[..SPLIT]);
    out.push_str(last);
    out.push_str(&scrambled[SPLIT + 2..scrambled.len() - 1]);
    Some(out)
}

/// Decode the `EJLinks` payload into the HLS playlist URL.
pub fn decode_stream_link(scrambled: &str) -> Result<Option<String>> {
    let encoded = unscramble_links(scrambled)
        .ok_or_else(|| ReelError::Parse("Stream link payload too short".into()))?;
    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| ReelError::Parse(format!("Stream link is not base64: {}", e)))?;
    let links: DecodedLinks = serde_json::from_slice(&bytes)?;
    Ok(links.hls_link.filter(|l| !l.is_empty()))
}
