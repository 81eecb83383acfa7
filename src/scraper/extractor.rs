use chrono::Utc;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::app::{ReelError, Result};
use crate::domain::{Language, MovieRecord};

/// Marker the site puts in the page title when a client is throttled.
pub const RATE_LIMIT_MARKER: &str = "Rate Limited";

/// Result of extracting one listing page
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    pub records: Vec<MovieRecord>,
    pub rate_limited: bool,
}

/// Turns a "Recent" results page into movie records.
pub struct ListingExtractor {
    base_url: Url,
    title: Selector,
    item: Selector,
    item_title: Selector,
    item_link: Selector,
    item_poster: Selector,
    item_info: Selector,
    item_synopsis: Selector,
    item_prof: Selector,
    prof_label: Selector,
    prof_name: Selector,
    item_hd: Selector,
    native_id: Regex,
    year: Regex,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ReelError::Parse(format!("Bad selector {}: {}", css, e)))
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl ListingExtractor {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            title: selector("title")?,
            item: selector("#UIMovieSummary > ul > li")?,
            item_title: selector(".block2 h3")?,
            item_link: selector(".block1 a[href]")?,
            item_poster: selector(".block1 img")?,
            item_info: selector(".info p")?,
            item_synopsis: selector("p.synopsis")?,
            item_prof: selector(".professionals .prof")?,
            prof_label: selector("label")?,
            prof_name: selector("p")?,
            item_hd: selector(".ultrahd, .uhd")?,
            native_id: Regex::new(r"/watch/([a-zA-Z0-9.-]+)/")
                .map_err(|e| ReelError::Parse(e.to_string()))?,
            year: Regex::new(r"\b(\d{4})\b").map_err(|e| ReelError::Parse(e.to_string()))?,
        })
    }

    /// Whether the page is the site's throttling notice.
    pub fn is_rate_limited(&self, html: &str) -> bool {
        self.throttled(&Html::parse_document(html))
    }

    fn throttled(&self, document: &Html) -> bool {
        document
            .select(&self.title)
            .next()
            .map(|t| text_of(t).contains(RATE_LIMIT_MARKER))
            .unwrap_or(false)
    }

    /// Extract every listing on the page. Malformed items are skipped.
    pub fn extract(&self, lang: Language, html: &str) -> ExtractedPage {
        let document = Html::parse_document(html);

        if self.throttled(&document) {
            return ExtractedPage {
                records: Vec::new(),
                rate_limited: true,
            };
        }

        let records = document
            .select(&self.item)
            .filter_map(|item| self.extract_item(lang, item))
            .collect();

        ExtractedPage {
            records,
            rate_limited: false,
        }
    }

    fn extract_item(&self, lang: Language, item: ElementRef<'_>) -> Option<MovieRecord> {
        let title = item.select(&self.item_title).next().map(text_of)?;
        if title.is_empty() {
            return None;
        }

        let href = item
            .select(&self.item_link)
            .next()
            .and_then(|a| a.value().attr("href"))?;
        let native_id = self.native_id.captures(href)?.get(1)?.as_str();
        let page_url = self.base_url.join(href).ok()?.to_string();

        let mut record = MovieRecord::new(lang, native_id, title, page_url);

        record.poster = item
            .select(&self.item_poster)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(normalize_poster);

        record.year = item
            .select(&self.item_info)
            .next()
            .map(text_of)
            .and_then(|info| {
                self.year
                    .captures(&info)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse::<i32>().ok())
            });

        record.description = item
            .select(&self.item_synopsis)
            .next()
            .map(text_of)
            .and_then(non_empty);

        for prof in item.select(&self.item_prof) {
            let label = prof
                .select(&self.prof_label)
                .next()
                .map(text_of)
                .unwrap_or_default();
            let names = prof
                .select(&self.prof_name)
                .map(text_of)
                .filter(|n| !n.is_empty());

            if label.to_lowercase().contains("director") {
                record.director = names.into_iter().next();
            } else {
                record.cast.extend(names);
            }
        }

        record.hd_available = item.select(&self.item_hd).next().is_some();
        record.last_scraped_at = Utc::now();

        Some(record)
    }
}

/// Posters are often protocol-relative (`//img...`).
fn normalize_poster(src: &str) -> String {
    if src.starts_with("//") {
        format!("https:{}", src)
    } else {
        src.to_string()
    }
}
