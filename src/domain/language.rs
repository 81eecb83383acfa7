use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::ReelError;

/// Source languages offered by the site.
///
/// Declaration order is the catalog priority order: when the same title is
/// listed in several languages, the earliest variant here is canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Tamil,
    Hindi,
    Telugu,
    Malayalam,
    Kannada,
    Bengali,
    Marathi,
    Punjabi,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::Tamil,
        Language::Hindi,
        Language::Telugu,
        Language::Malayalam,
        Language::Kannada,
        Language::Bengali,
        Language::Marathi,
        Language::Punjabi,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Language::Tamil => "tamil",
            Language::Hindi => "hindi",
            Language::Telugu => "telugu",
            Language::Malayalam => "malayalam",
            Language::Kannada => "kannada",
            Language::Bengali => "bengali",
            Language::Marathi => "marathi",
            Language::Punjabi => "punjabi",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Language::Tamil => "Tamil",
            Language::Hindi => "Hindi",
            Language::Telugu => "Telugu",
            Language::Malayalam => "Malayalam",
            Language::Kannada => "Kannada",
            Language::Bengali => "Bengali",
            Language::Marathi => "Marathi",
            Language::Punjabi => "Punjabi",
        }
    }

    /// Rank in the priority order, 0 being the most preferred.
    pub fn priority(self) -> usize {
        Self::ALL
            .iter()
            .position(|l| *l == self)
            .unwrap_or(Self::ALL.len())
    }

    /// Rank for a raw stored language string; unknown values rank last.
    pub fn priority_of(slug: &str) -> usize {
        slug.parse::<Language>()
            .map(Language::priority)
            .unwrap_or(Self::ALL.len())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.slug())
    }
}

impl FromStr for Language {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|l| l.slug() == s)
            .ok_or_else(|| ReelError::Parse(format!("Unknown language: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_slug() {
        for lang in Language::ALL {
            assert_eq!(lang.slug().parse::<Language>().unwrap(), lang);
        }
        assert_eq!(" Hindi ".parse::<Language>().unwrap(), Language::Hindi);
    }

    #[test]
    fn test_parse_unknown_language() {
        assert!("klingon".parse::<Language>().is_err());
    }

    #[test]
    fn test_priority_follows_declaration_order() {
        assert_eq!(Language::Tamil.priority(), 0);
        assert!(Language::Hindi.priority() < Language::Telugu.priority());
        assert_eq!(Language::priority_of("klingon"), Language::ALL.len());
        assert!(Language::priority_of("punjabi") < Language::priority_of("klingon"));
    }
}
