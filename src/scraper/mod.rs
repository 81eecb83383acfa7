//! HTML extraction for the source site.
//!
//! Pure functions over page text; no network access happens here.
//!
//! ```text
//! listing HTML → ListingExtractor → MovieRecord[] (or rate-limit signal)
//! watch HTML   → PlayerTokens → ping request → decode_stream_link → HLS URL
//! ```

mod extractor;
mod player;

pub use extractor::{ExtractedPage, ListingExtractor, RATE_LIMIT_MARKER};
pub use player::{
    decode_stream_link, extract_login_token, extract_player_tokens, unscramble_links,
    PlayerTokens,
};

#[cfg(test)]
pub(crate) use extractor::tests::{listing_item, listing_page};
