//! Square TV artwork from the Squared TV Art Tumblr blog
//!
//! Posts are tagged with the TheTVDB series id and a per-season tag, so
//! the primary lookup goes through the Tumblr API. When the API returns
//! nothing the blog's HTML search page is scraped instead.

use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::media::result::{Artwork, ArtworkKind, ArtworkSize};
use crate::services::rate_limiter::RateLimitedClient;

const API_URL: &str = "https://api.tumblr.com/v2/blog/squaredtvart.tumblr.com/posts/photo";
const SEARCH_URL: &str = "https://squaredtvart.tumblr.com/search";
const API_KEY: &str = "ZbYXwG2CtSECdqttl7rUU076pj5fqhMsV84BwnhK2GSMaJXutJ";

pub const SERVICE_NAME: &str = "Squared TV Art";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    response: PostsResponse,
}

#[derive(Debug, Deserialize)]
struct PostsResponse {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    original_size: PhotoSize,
    #[serde(default)]
    alt_sizes: Vec<PhotoSize>,
}

#[derive(Debug, Deserialize)]
struct PhotoSize {
    url: String,
    width: u32,
    #[allow(dead_code)]
    height: u32,
}

impl Photo {
    /// Pick a mid-size rendition for the thumbnail, falling back to the
    /// original.
    fn thumb(&self) -> &PhotoSize {
        self.alt_sizes
            .iter()
            .find(|s| s.width > 200 && s.width < 400)
            .unwrap_or(&self.original_size)
    }
}

pub struct SquaredTvArt {
    client: RateLimitedClient,
}

impl Default for SquaredTvArt {
    fn default() -> Self {
        Self::new()
    }
}

impl SquaredTvArt {
    pub fn new() -> Self {
        Self {
            client: RateLimitedClient::for_tumblr(),
        }
    }

    /// Season artwork for a show, preferring the TheTVDB id tag over the
    /// free-form show name tag, then the HTML search page.
    pub async fn search(
        &self,
        series: &str,
        tvdb_series_id: Option<u64>,
        season: Option<u32>,
    ) -> Vec<Artwork> {
        if let Some(id) = tvdb_series_id {
            let tag = format!("thetvdb series {id}");
            let artworks = self.search_api(&tag, season).await;
            if !artworks.is_empty() {
                return artworks;
            }
        }

        let artworks = self.search_api(series, season).await;
        if !artworks.is_empty() {
            return artworks;
        }

        self.search_html(series, tvdb_series_id, season).await
    }

    async fn search_api(&self, tag: &str, season: Option<u32>) -> Vec<Artwork> {
        let query = [("api_key", API_KEY), ("tag", tag)];
        let response = match self.client.get_with_query(API_URL, &query).await {
            Ok(response) => response,
            Err(e) => {
                warn!(tag = %tag, error = %e, "Squared TV Art API request failed");
                return Vec::new();
            }
        };

        let parsed: ApiResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(tag = %tag, error = %e, "Failed to parse Squared TV Art response");
                return Vec::new();
            }
        };

        let season_tag = season.map(|n| format!("Season {n}"));
        let mut artworks = Vec::new();
        for post in parsed.response.posts {
            if let Some(season_tag) = &season_tag {
                let matches = post
                    .tags
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(season_tag));
                if !matches {
                    continue;
                }
            }
            for photo in &post.photos {
                let Ok(url) = Url::parse(&photo.original_size.url) else {
                    continue;
                };
                let Ok(thumb) = Url::parse(&photo.thumb().url) else {
                    continue;
                };
                artworks.push(
                    Artwork::new(url, thumb, SERVICE_NAME, ArtworkKind::Square)
                        .with_size(ArtworkSize::Square),
                );
            }
        }
        Artwork::unique(artworks)
    }

    async fn search_html(
        &self,
        series: &str,
        tvdb_series_id: Option<u64>,
        season: Option<u32>,
    ) -> Vec<Artwork> {
        let url = format!("{SEARCH_URL}/{}", urlencoding::encode(series));
        let response = match self.client.get(&url).await {
            Ok(response) => response,
            Err(e) => {
                warn!(series = %series, error = %e, "Squared TV Art page request failed");
                return Vec::new();
            }
        };
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(series = %series, error = %e, "Failed to read Squared TV Art page");
                return Vec::new();
            }
        };

        parse_search_page(&body, tvdb_series_id, season)
    }
}

/// Posts carry their series and season as class tokens:
/// `thetvdb_series_{id}`, `thetvdb_season_{id}` and `season_{n}`.
fn parse_search_page(
    html: &str,
    tvdb_series_id: Option<u64>,
    season: Option<u32>,
) -> Vec<Artwork> {
    let document = Html::parse_document(html);
    let Ok(post_selector) = Selector::parse(r#"div[class^="Post "]"#) else {
        return Vec::new();
    };
    let Ok(img_selector) = Selector::parse("img") else {
        return Vec::new();
    };

    let mut artworks = Vec::new();
    for post in document.select(&post_selector) {
        let classes: Vec<&str> = post.value().classes().collect();

        if let Some(id) = tvdb_series_id {
            let tag = format!("thetvdb_series_{id}");
            if !classes.iter().any(|c| *c == tag) {
                continue;
            }
        }
        if let Some(n) = season {
            let tag = format!("season_{n}");
            if !classes.iter().any(|c| *c == tag) {
                continue;
            }
        }

        for img in post.select(&img_selector) {
            let Some(src) = img.value().attr("src") else {
                continue;
            };
            let full = src.replace("_250.jpg", "_1280.jpg");
            let (Ok(url), Ok(thumb)) = (Url::parse(&full), Url::parse(src)) else {
                continue;
            };
            artworks.push(
                Artwork::new(url, thumb, SERVICE_NAME, ArtworkKind::Square)
                    .with_size(ArtworkSize::Square),
            );
        }
    }
    Artwork::unique(artworks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <div class="Post photo thetvdb_series_81189 thetvdb_season_27272 season_2">
          <img src="https://64.media.tumblr.com/abc/tumblr_x_250.jpg">
        </div>
        <div class="Post photo thetvdb_series_81189 thetvdb_season_27273 season_3">
          <img src="https://64.media.tumblr.com/def/tumblr_y_250.jpg">
        </div>
        <div class="sidebar"><img src="https://64.media.tumblr.com/logo_250.jpg"></div>
        </body></html>
    "#;

    #[test]
    fn test_parse_search_page_filters_by_series_and_season() {
        let artworks = parse_search_page(PAGE, Some(81189), Some(2));
        assert_eq!(artworks.len(), 1);
        assert!(artworks[0].url.as_str().ends_with("tumblr_x_1280.jpg"));
        assert!(artworks[0].thumb_url.as_str().ends_with("tumblr_x_250.jpg"));
        assert_eq!(artworks[0].kind, ArtworkKind::Square);
    }

    #[test]
    fn test_parse_search_page_without_season_returns_all_posts() {
        let artworks = parse_search_page(PAGE, Some(81189), None);
        assert_eq!(artworks.len(), 2);
    }

    #[test]
    fn test_parse_search_page_wrong_series() {
        assert!(parse_search_page(PAGE, Some(99999), None).is_empty());
    }

    #[test]
    fn test_photo_thumb_selection() {
        let photo = Photo {
            original_size: PhotoSize {
                url: "https://example.com/full.jpg".to_string(),
                width: 1280,
                height: 1280,
            },
            alt_sizes: vec![
                PhotoSize {
                    url: "https://example.com/tiny.jpg".to_string(),
                    width: 100,
                    height: 100,
                },
                PhotoSize {
                    url: "https://example.com/mid.jpg".to_string(),
                    width: 250,
                    height: 250,
                },
            ],
        };
        assert_eq!(photo.thumb().url, "https://example.com/mid.jpg");
    }
}
