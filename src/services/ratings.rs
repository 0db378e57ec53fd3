//! Content rating tables
//!
//! A bundled table maps per-country rating labels to the codes the
//! iTunes `itunescatalog` rating atom wants. Providers look ratings up
//! by country name or by iTunes storefront code.

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::warn;

use crate::ConfigError;
use crate::media::result::MediaKind;

const RATINGS_JSON: &str = include_str!("../../data/ratings.json");

#[derive(Debug, Clone, Deserialize)]
pub struct Rating {
    /// "movie" or "TV"
    pub media: String,
    /// Rating system identifier, e.g. "mpaa" or "us-tv"
    pub prefix: String,
    #[serde(rename = "itunes-code")]
    pub itunes_code: String,
    #[serde(rename = "itunes-value")]
    pub itunes_value: i64,
    pub description: String,
}

impl Rating {
    /// The full annotation string written into the rating atom.
    pub fn itunes_annotation(&self) -> String {
        format!("{}|{}|{}|", self.prefix, self.itunes_code, self.itunes_value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Country {
    pub country: String,
    #[serde(rename = "storeCode")]
    pub store_code: Option<i64>,
    pub ratings: Vec<Rating>,
}

static COUNTRIES: Lazy<Vec<Country>> = Lazy::new(|| {
    serde_json::from_str(RATINGS_JSON).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to decode bundled ratings table");
        Vec::new()
    })
});

/// Re-decode the bundled table, surfacing corruption as a fatal error.
pub fn verify() -> Result<(), ConfigError> {
    serde_json::from_str::<Vec<Country>>(RATINGS_JSON)
        .map(|_| ())
        .map_err(|source| ConfigError::Table {
            name: "ratings",
            source,
        })
}

pub fn countries() -> &'static [Country] {
    &COUNTRIES
}

/// Look up a rating by country name, media kind and rating label.
pub fn rating(country: &str, kind: MediaKind, label: &str) -> Option<&'static Rating> {
    COUNTRIES
        .iter()
        .find(|c| c.country.eq_ignore_ascii_case(country))
        .and_then(|c| find_rating(&c.ratings, kind, label))
}

/// Look up a rating by iTunes storefront code, media kind and rating label.
pub fn rating_by_store(store_code: i64, kind: MediaKind, label: &str) -> Option<&'static Rating> {
    COUNTRIES
        .iter()
        .find(|c| c.store_code == Some(store_code))
        .and_then(|c| find_rating(&c.ratings, kind, label))
}

fn find_rating<'a>(ratings: &'a [Rating], kind: MediaKind, label: &str) -> Option<&'a Rating> {
    ratings
        .iter()
        .filter(|r| r.media == kind.ratings_label())
        .find(|r| {
            r.description.eq_ignore_ascii_case(label) || r.itunes_code.eq_ignore_ascii_case(label)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_by_country() {
        let r = rating("USA", MediaKind::Movie, "PG-13").unwrap();
        assert_eq!(r.prefix, "mpaa");
        assert_eq!(r.itunes_value, 300);
        assert_eq!(r.itunes_annotation(), "mpaa|PG-13|300|");
    }

    #[test]
    fn test_rating_respects_media_kind() {
        let tv = rating("USA", MediaKind::TvShow, "TV-14").unwrap();
        assert_eq!(tv.prefix, "us-tv");
        assert!(rating("USA", MediaKind::Movie, "TV-14").is_none());
    }

    #[test]
    fn test_rating_by_store() {
        let r = rating_by_store(143444, MediaKind::Movie, "12A").unwrap();
        assert_eq!(r.prefix, "uk-movie");
        assert_eq!(r.itunes_value, 325);
    }

    #[test]
    fn test_unknown_lookups() {
        assert!(rating("Atlantis", MediaKind::Movie, "PG").is_none());
        assert!(rating("USA", MediaKind::Movie, "PG-99").is_none());
        assert!(rating_by_store(1, MediaKind::Movie, "PG").is_none());
    }

    #[test]
    fn test_table_verifies() {
        verify().unwrap();
        assert!(!countries().is_empty());
    }
}
