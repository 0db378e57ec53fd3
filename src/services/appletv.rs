//! Apple TV catalog artwork search (uts/v2 endpoints)
//!
//! The v2 incremental search endpoint returns image URL templates per
//! show and movie. This module only serves artwork enrichment for the
//! other providers; the full Apple TV metadata provider lives in
//! [`super::appletv_v3`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;
use url::Url;

use crate::media::result::{Artwork, ArtworkKind, ArtworkSize};
use crate::services::appletv_v3::storefront;
use crate::services::rate_limiter::RateLimitedClient;
use crate::services::text_utils::levenshtein_distance;

const SEARCH_URL: &str = "https://uts-api.itunes.apple.com/uts/v2/search/incremental";
const SHOW_URL: &str = "https://uts-api.itunes.apple.com/uts/v2/show";

/// Titles within this edit distance of the query count as the same item.
const NAME_DISTANCE: usize = 8;

pub const SERVICE_NAME: &str = "Apple TV";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: SearchData,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    canvas: Option<Canvas>,
}

#[derive(Debug, Deserialize)]
struct Canvas {
    shelves: Vec<Shelf>,
}

#[derive(Debug, Deserialize)]
struct Shelf {
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    id: Option<String>,
    title: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    images: HashMap<String, ImageTemplate>,
}

#[derive(Debug, Deserialize)]
struct ImageTemplate {
    url: String,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct SeasonsResponse {
    data: SeasonsData,
}

#[derive(Debug, Deserialize)]
struct SeasonsData {
    #[serde(default)]
    seasons: HashMap<String, Vec<Season>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Season {
    season_number: Option<u32>,
    #[serde(default)]
    images: HashMap<String, ImageTemplate>,
}

static EDITION_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r" \((Dubbed|Subtitled|Ex-?tended Edition)\)$").expect("valid regex")
});

/// Strip the edition markers the catalog appends to localized titles.
fn normalize_title(title: &str) -> String {
    EDITION_SUFFIX.replace(title, "").to_string()
}

fn titles_close(searched: &str, candidate: &str) -> bool {
    let candidate = normalize_title(candidate);
    candidate.eq_ignore_ascii_case(searched)
        || levenshtein_distance(&searched.to_lowercase(), &candidate.to_lowercase())
            < NAME_DISTANCE
}

/// Resolve an image template into a concrete artwork, when the template
/// and the requested dimensions agree on aspect.
fn artwork_from_template(
    template: &ImageTemplate,
    kind: ArtworkKind,
) -> Option<Artwork> {
    let size = ArtworkSize::from_dimensions(template.width, template.height);
    let (full, thumb) = match size {
        ArtworkSize::Square => ("1600x1600.jpg", "329x329.jpg"),
        ArtworkSize::Rectangle | ArtworkSize::Widescreen | ArtworkSize::Fullscreen => {
            ("1920x1080.jpg", "329x185.jpg")
        }
        _ => ("1200x1800.jpg", "185x329.jpg"),
    };

    let url = Url::parse(&template.url.replace("{w}x{h}.{f}", full)).ok()?;
    let thumb_url = Url::parse(&template.url.replace("{w}x{h}.{f}", thumb)).ok()?;
    Some(Artwork::new(url, thumb_url, SERVICE_NAME, kind).with_size(size))
}

/// Artwork lookup against the Apple TV catalog.
pub struct AppleTvArt {
    client: RateLimitedClient,
}

impl Default for AppleTvArt {
    fn default() -> Self {
        Self::new()
    }
}

impl AppleTvArt {
    pub fn new() -> Self {
        Self {
            client: RateLimitedClient::for_appletv(),
        }
    }

    fn base_query(country: &str) -> Option<Vec<(&'static str, String)>> {
        let store = storefront(country)?;
        Some(vec![
            ("sf", store.storefront_id.to_string()),
            ("locale", store.locale.clone()),
            ("caller", "wta".to_string()),
            ("utsk", "0".to_string()),
            ("v", "58".to_string()),
            ("pfm", "appletv".to_string()),
        ])
    }

    async fn search_items(&self, term: &str, country: &str) -> Vec<Item> {
        let Some(mut query) = Self::base_query(country) else {
            return Vec::new();
        };
        query.push(("q", term.to_string()));

        let response = match self.client.get_with_query(SEARCH_URL, &query).await {
            Ok(response) => response,
            Err(e) => {
                warn!(term = %term, error = %e, "Apple TV search request failed");
                return Vec::new();
            }
        };

        match response.json::<SearchResponse>().await {
            Ok(parsed) => parsed
                .data
                .canvas
                .map(|c| c.shelves.into_iter().flat_map(|s| s.items).collect())
                .unwrap_or_default(),
            Err(e) => {
                warn!(term = %term, error = %e, "Failed to parse Apple TV search response");
                Vec::new()
            }
        }
    }

    /// Square and poster artwork for shows or movies matching a title.
    pub async fn search_artwork(&self, title: &str, country: &str, kind: ArtworkKind) -> Vec<Artwork> {
        let items = self.search_items(title, country).await;
        let mut artworks = Vec::new();
        for item in items {
            let Some(name) = &item.title else { continue };
            if !titles_close(title, name) {
                continue;
            }
            for template in item.images.values() {
                if let Some(artwork) = artwork_from_template(template, kind) {
                    // Wide material is collected separately.
                    if !matches!(
                        artwork.size,
                        ArtworkSize::Rectangle | ArtworkSize::Widescreen | ArtworkSize::Fullscreen
                    ) {
                        artworks.push(artwork);
                    }
                }
            }
        }
        Artwork::unique(artworks)
    }

    /// 16:9 artwork for shows or movies matching a title.
    pub async fn search_wide_artwork(&self, title: &str, country: &str) -> Vec<Artwork> {
        let items = self.search_items(title, country).await;
        let mut artworks = Vec::new();
        for item in items {
            let Some(name) = &item.title else { continue };
            if !titles_close(title, name) {
                continue;
            }
            for template in item.images.values() {
                if let Some(artwork) = artwork_from_template(template, ArtworkKind::Rectangle) {
                    if matches!(
                        artwork.size,
                        ArtworkSize::Rectangle | ArtworkSize::Widescreen | ArtworkSize::Fullscreen
                    ) {
                        artworks.push(artwork);
                    }
                }
            }
        }
        Artwork::unique(artworks)
    }

    /// Season artwork for one season of a show.
    pub async fn search_seasons(&self, series: &str, season: u32, country: &str) -> Vec<Artwork> {
        let items = self.search_items(series, country).await;
        let show_id = items.into_iter().find_map(|item| {
            let name = item.title.as_deref()?;
            (item.kind.as_deref() == Some("Show") && titles_close(series, name))
                .then_some(item.id)?
        });
        let Some(show_id) = show_id else {
            return Vec::new();
        };

        let Some(query) = Self::base_query(country) else {
            return Vec::new();
        };
        let url = format!("{SHOW_URL}/{show_id}/itunesSeasons");
        let response = match self.client.get_with_query(&url, &query).await {
            Ok(response) => response,
            Err(e) => {
                warn!(series = %series, error = %e, "Apple TV seasons request failed");
                return Vec::new();
            }
        };

        let parsed: SeasonsResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(series = %series, error = %e, "Failed to parse Apple TV seasons response");
                return Vec::new();
            }
        };

        let mut artworks = Vec::new();
        for seasons in parsed.data.seasons.into_values() {
            for entry in seasons {
                if entry.season_number != Some(season) {
                    continue;
                }
                for template in entry.images.values() {
                    if let Some(artwork) = artwork_from_template(template, ArtworkKind::Season) {
                        artworks.push(artwork);
                    }
                }
            }
        }
        Artwork::unique(artworks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Heat (Dubbed)"), "Heat");
        assert_eq!(normalize_title("Heat (Subtitled)"), "Heat");
        assert_eq!(normalize_title("Heat (Extended Edition)"), "Heat");
        assert_eq!(normalize_title("Heat"), "Heat");
        assert_eq!(normalize_title("(Dubbed) Heat"), "(Dubbed) Heat");
    }

    #[test]
    fn test_titles_close() {
        assert!(titles_close("heat", "Heat (Dubbed)"));
        assert!(titles_close("The Office", "The Office (US)"));
        assert!(!titles_close("Heat", "An Entirely Different Movie"));
    }

    #[test]
    fn test_artwork_from_template_square() {
        let template = ImageTemplate {
            url: "https://is1.mzstatic.com/image/thumb/abc/{w}x{h}.{f}".to_string(),
            width: 3840,
            height: 3840,
        };
        let artwork = artwork_from_template(&template, ArtworkKind::Square).unwrap();
        assert_eq!(artwork.size, ArtworkSize::Square);
        assert!(artwork.url.as_str().ends_with("1600x1600.jpg"));
        assert!(artwork.thumb_url.as_str().ends_with("329x329.jpg"));
    }

    #[test]
    fn test_artwork_from_template_wide() {
        let template = ImageTemplate {
            url: "https://is1.mzstatic.com/image/thumb/abc/{w}x{h}.{f}".to_string(),
            width: 1920,
            height: 1080,
        };
        let artwork = artwork_from_template(&template, ArtworkKind::Rectangle).unwrap();
        assert_eq!(artwork.size, ArtworkSize::Widescreen);
        assert!(artwork.url.as_str().ends_with("1920x1080.jpg"));
    }
}
