use std::sync::LazyLock;

use regex::Regex;

static TRAILING_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\(\s*\d{4}\s*\)\s*$").expect("trailing year regex should compile")
});

static MOVIE_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\(\s*(?:[a-z]+\s+)?movie\s*\)").expect("annotation regex should compile")
});

static UNCUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\buncut\b").expect("uncut regex should compile"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex should compile"));

/// Reduce a listing title to what an external catalog would call the film.
///
/// `"Her (2024)"` becomes `"Her"`, `"'Vikram' (Tamil Movie) UNCUT"` becomes
/// `"Vikram"`.
pub fn standardize_title(title: &str) -> String {
    let stripped = TRAILING_YEAR.replace(title, "");
    let stripped = MOVIE_ANNOTATION.replace_all(&stripped, "");
    let stripped = UNCUT.replace_all(&stripped, "");
    let collapsed = WHITESPACE.replace_all(stripped.trim(), " ");

    strip_wrapping_quotes(&collapsed).trim().to_string()
}

fn strip_wrapping_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    s
}
