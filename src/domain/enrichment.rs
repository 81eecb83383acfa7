use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::ReelError;

/// Where a record stands in the external id lookup.
///
/// Transitions only move forward:
/// `Unprocessed -> Found` or
/// `Unprocessed -> NotFoundStrict -> NotFoundCleaned -> NotFoundBroad`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    #[default]
    Unprocessed,
    Found,
    NotFoundStrict,
    NotFoundCleaned,
    NotFoundBroad,
}

impl EnrichmentStatus {
    pub const ALL: [EnrichmentStatus; 5] = [
        EnrichmentStatus::Unprocessed,
        EnrichmentStatus::Found,
        EnrichmentStatus::NotFoundStrict,
        EnrichmentStatus::NotFoundCleaned,
        EnrichmentStatus::NotFoundBroad,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EnrichmentStatus::Unprocessed => "unprocessed",
            EnrichmentStatus::Found => "found",
            EnrichmentStatus::NotFoundStrict => "not_found_strict",
            EnrichmentStatus::NotFoundCleaned => "not_found_cleaned",
            EnrichmentStatus::NotFoundBroad => "not_found_broad",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EnrichmentStatus::Found | EnrichmentStatus::NotFoundBroad
        )
    }
}

impl fmt::Display for EnrichmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EnrichmentStatus {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ReelError::Parse(format!("Unknown enrichment status: {}", s)))
    }
}

/// Progressively looser lookup strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Raw title and exact year.
    Strict,
    /// Standardized title and exact year.
    Cleaned,
    /// Standardized title, any year, regional bias.
    Broad,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Strict, Tier::Cleaned, Tier::Broad];

    /// Status a record must hold to be attempted at this tier.
    pub fn population(self) -> EnrichmentStatus {
        match self {
            Tier::Strict => EnrichmentStatus::Unprocessed,
            Tier::Cleaned => EnrichmentStatus::NotFoundStrict,
            Tier::Broad => EnrichmentStatus::NotFoundCleaned,
        }
    }

    /// Status written when this tier finds no candidate.
    pub fn failure_status(self) -> EnrichmentStatus {
        match self {
            Tier::Strict => EnrichmentStatus::NotFoundStrict,
            Tier::Cleaned => EnrichmentStatus::NotFoundCleaned,
            Tier::Broad => EnrichmentStatus::NotFoundBroad,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Strict => "strict",
            Tier::Cleaned => "cleaned",
            Tier::Broad => "broad",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in EnrichmentStatus::ALL {
            assert_eq!(status.as_str().parse::<EnrichmentStatus>().unwrap(), status);
        }
        assert!("-1".parse::<EnrichmentStatus>().is_err());
    }

    #[test]
    fn test_tiers_chain_into_each_other() {
        assert_eq!(Tier::Strict.failure_status(), Tier::Cleaned.population());
        assert_eq!(Tier::Cleaned.failure_status(), Tier::Broad.population());
        assert!(Tier::Broad.failure_status().is_terminal());
        assert!(!Tier::Strict.failure_status().is_terminal());
    }
}
