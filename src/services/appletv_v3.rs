//! Apple TV catalog metadata provider (uts/v3 endpoints)
//!
//! The v3 API pages a show's episodes through an opaque-looking
//! `nextToken` that is really a "start:end" window over the flattened
//! episode list, so season lookups first fetch the per-season episode
//! counts and compute the window. Storefront ids and locales come from a
//! bundled table.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use once_cell::sync::Lazy;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::warn;
use url::Url;

use crate::ConfigError;
use crate::media::result::{
    Artwork, ArtworkKind, ArtworkSize, Key, MediaKind, MetadataResult, Value,
};
use crate::services::metadata::{LanguageType, MetadataService};
use crate::services::rate_limiter::RateLimitedClient;
use crate::services::text_utils::{clean_list, titles_match};

const BASE_URL: &str = "https://uts-api.itunes.apple.com/uts/v3";
const STOREFRONTS_JSON: &str = include_str!("../../data/storefronts.json");

const MOVIES_SHELF: &str = "uts.col.search.MV";
const SHOWS_SHELF: &str = "uts.col.search.SH";
const CAST_SHELF: &str = "uts.col.CastAndCrew";

pub const SERVICE_NAME: &str = "Apple TV";

/// One Apple TV storefront.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Storefront {
    pub country: String,
    pub country2: String,
    pub storefront_id: i64,
    pub locale: String,
}

static STOREFRONTS: Lazy<Vec<Storefront>> = Lazy::new(|| {
    serde_json::from_str(STOREFRONTS_JSON).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to decode bundled storefronts table");
        Vec::new()
    })
});

/// Re-decode the bundled storefront table, surfacing corruption as fatal.
pub fn verify_storefronts() -> Result<(), ConfigError> {
    serde_json::from_str::<Vec<Storefront>>(STOREFRONTS_JSON)
        .map(|_| ())
        .map_err(|source| ConfigError::Table {
            name: "storefronts",
            source,
        })
}

pub fn storefronts() -> &'static [Storefront] {
    &STOREFRONTS
}

/// Look up a storefront by ISO country code.
pub fn storefront(country2: &str) -> Option<&'static Storefront> {
    STOREFRONTS
        .iter()
        .find(|s| s.country2.eq_ignore_ascii_case(country2))
}

/// Resolve a language picker selection (country display name) to a
/// storefront, defaulting to the United States.
pub fn storefront_for_language(language: &str) -> Option<&'static Storefront> {
    STOREFRONTS
        .iter()
        .find(|s| s.country.eq_ignore_ascii_case(language))
        .or_else(|| storefront("US"))
}

/// Compute the "start:end" episode window for one season (or one episode
/// of it) given the per-season episode counts in airing order.
fn episode_window(seasons: &[(u32, u32)], season: u32, episode: Option<u32>) -> (u32, u32) {
    let base: u32 = seasons
        .iter()
        .filter(|(number, _)| *number < season)
        .map(|(_, count)| count)
        .sum();
    let count = seasons
        .iter()
        .find(|(number, _)| *number == season)
        .map(|(_, count)| *count)
        .unwrap_or(0);

    match episode {
        Some(e) => {
            let index = base + e.saturating_sub(1);
            (index, index)
        }
        None => (base, base + count.saturating_sub(1)),
    }
}

fn next_token(start: u32, end: u32) -> String {
    format!("{start}:{end}")
}

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
    id: String,
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    /// Epoch milliseconds.
    release_date: Option<i64>,
    rating: Option<Rating>,
    #[serde(default)]
    genres: Vec<Genre>,
    studio: Option<String>,
    #[serde(default)]
    images: HashMap<String, ImageTemplate>,
    role_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Rating {
    system: Option<String>,
    display_name: Option<String>,
    value: Option<i64>,
}

impl Rating {
    /// The annotation written into the rating atom, e.g.
    /// "US-TV|TV-14|500|".
    fn annotation(&self) -> Option<String> {
        let system = self.system.as_deref()?;
        let name = self.display_name.as_deref()?;
        let value = self.value?;
        Some(format!("{}|{}|{}|", system.to_uppercase(), name, value))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Genre {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ImageTemplate {
    url: String,
    width: u32,
    height: u32,
}

fn artwork_from_template(template: &ImageTemplate, kind: ArtworkKind) -> Option<Artwork> {
    let size = ArtworkSize::from_dimensions(template.width, template.height);
    let (full, thumb) = match size {
        ArtworkSize::Square => ("1600x1600.jpg", "330x330.jpg"),
        ArtworkSize::Rectangle | ArtworkSize::Widescreen | ArtworkSize::Fullscreen => {
            ("1920x1080.jpg", "329x185.jpg")
        }
        _ => ("1200x1800.jpg", "185x329.jpg"),
    };
    let url = Url::parse(&template.url.replace("{w}x{h}.{f}", full)).ok()?;
    let thumb_url = Url::parse(&template.url.replace("{w}x{h}.{f}", thumb)).ok()?;
    Some(Artwork::new(url, thumb_url, SERVICE_NAME, kind).with_size(size))
}

#[derive(Debug, Deserialize)]
struct ShowResponse {
    data: ShowData,
}

#[derive(Debug, Deserialize)]
struct ShowData {
    content: Option<Item>,
    #[serde(default)]
    shelves: Vec<Shelf>,
}

#[derive(Debug, Deserialize)]
struct SeasonsResponse {
    data: SeasonsData,
}

#[derive(Debug, Deserialize)]
struct SeasonsData {
    #[serde(default)]
    seasons: Vec<SeasonSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeasonSummary {
    season_number: u32,
    episode_count: u32,
    #[serde(default)]
    images: HashMap<String, ImageTemplate>,
}

#[derive(Debug, Deserialize)]
struct EpisodesResponse {
    data: EpisodesData,
}

#[derive(Debug, Deserialize)]
struct EpisodesData {
    #[serde(default)]
    episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Episode {
    id: Option<String>,
    title: Option<String>,
    show_title: Option<String>,
    season_id: Option<String>,
    season_number: Option<u32>,
    episode_number: Option<u32>,
    description: Option<String>,
    release_date: Option<i64>,
    rating: Option<Rating>,
    #[serde(default)]
    images: HashMap<String, ImageTemplate>,
}

/// Session parameters returned by the configurations endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
struct SessionConfig {
    #[serde(default)]
    utsk: Option<String>,
    #[serde(default)]
    utscf: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigResponse {
    data: SessionConfig,
}

pub struct AppleTv {
    client: RateLimitedClient,
    session: Mutex<Option<SessionConfig>>,
}

impl Default for AppleTv {
    fn default() -> Self {
        Self::new()
    }
}

impl AppleTv {
    pub fn new() -> Self {
        Self {
            client: RateLimitedClient::for_appletv(),
            session: Mutex::new(None),
        }
    }

    /// Base query parameters, fetching the session tokens once.
    async fn base_query(&self, store: &Storefront) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("caller", "js".to_string()),
            ("v", "82".to_string()),
            ("pfm", "web".to_string()),
            ("sf", store.storefront_id.to_string()),
            ("locale", store.locale.clone()),
        ];

        let mut session = self.session.lock().await;
        if session.is_none() {
            let url = format!("{BASE_URL}/configurations");
            let fetched = match self.client.get_with_query(&url, &query).await {
                Ok(response) => response
                    .json::<ConfigResponse>()
                    .await
                    .map(|c| c.data)
                    .unwrap_or_default(),
                Err(e) => {
                    warn!(error = %e, "Apple TV configurations request failed");
                    SessionConfig::default()
                }
            };
            *session = Some(fetched);
        }
        if let Some(config) = session.as_ref() {
            if let Some(utsk) = &config.utsk {
                query.push(("utsk", utsk.clone()));
            }
            if let Some(utscf) = &config.utscf {
                query.push(("utscf", utscf.clone()));
            }
        }
        query
    }

    async fn search_shelves(&self, term: &str, store: &Storefront) -> Vec<Shelf> {
        let mut query = self.base_query(store).await;
        query.push(("searchTerm", term.to_string()));

        let url = format!("{BASE_URL}/search");
        let response = match self.client.get_with_query(&url, &query).await {
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
                .map(|c| c.shelves)
                .unwrap_or_default(),
            Err(e) => {
                warn!(term = %term, error = %e, "Failed to parse Apple TV search response");
                Vec::new()
            }
        }
    }

    async fn search_shelf(&self, term: &str, shelf_id: &str, store: &Storefront) -> Vec<Item> {
        self.search_shelves(term, store)
            .await
            .into_iter()
            .filter(|s| s.id.starts_with(shelf_id))
            .flat_map(|s| s.items)
            .collect()
    }

    async fn find_show_id(&self, series: &str, store: &Storefront) -> Option<String> {
        self.search_shelf(series, SHOWS_SHELF, store)
            .await
            .into_iter()
            .find(|item| {
                item.title
                    .as_deref()
                    .is_some_and(|title| titles_match(series, title))
            })
            .and_then(|item| item.id)
    }

    async fn fetch_seasons(&self, show_id: &str, store: &Storefront) -> Vec<SeasonSummary> {
        let query = self.base_query(store).await;
        let url = format!("{BASE_URL}/shows/{show_id}/seasons");
        let response = match self.client.get_with_query(&url, &query).await {
            Ok(response) => response,
            Err(e) => {
                warn!(show = %show_id, error = %e, "Apple TV seasons request failed");
                return Vec::new();
            }
        };
        match response.json::<SeasonsResponse>().await {
            Ok(parsed) => parsed.data.seasons,
            Err(e) => {
                warn!(show = %show_id, error = %e, "Failed to parse Apple TV seasons");
                Vec::new()
            }
        }
    }

    async fn fetch_episodes(
        &self,
        show_id: &str,
        token: &str,
        store: &Storefront,
    ) -> Vec<Episode> {
        let mut query = self.base_query(store).await;
        query.push(("nextToken", token.to_string()));

        let url = format!("{BASE_URL}/shows/{show_id}/episodes");
        let response = match self.client.get_with_query(&url, &query).await {
            Ok(response) => response,
            Err(e) => {
                warn!(show = %show_id, error = %e, "Apple TV episodes request failed");
                return Vec::new();
            }
        };
        match response.json::<EpisodesResponse>().await {
            Ok(parsed) => parsed.data.episodes,
            Err(e) => {
                warn!(show = %show_id, error = %e, "Failed to parse Apple TV episodes");
                Vec::new()
            }
        }
    }

    fn map_episode(
        &self,
        episode: &Episode,
        series: &str,
        show_id: &str,
        store: &Storefront,
    ) -> MetadataResult {
        let mut result = MetadataResult::new(MediaKind::TvShow);

        result.set_opt(Key::Name, episode.title.clone());
        result.set(
            Key::SeriesName,
            episode.show_title.clone().unwrap_or_else(|| series.to_string()),
        );
        result.set_opt(Key::Season, episode.season_number.map(i64::from));
        result.set_opt(Key::EpisodeNumber, episode.episode_number.map(i64::from));
        result.set_opt(Key::TrackNumber, episode.episode_number.map(i64::from));
        if let (Some(s), Some(e)) = (episode.season_number, episode.episode_number) {
            result.set(Key::EpisodeId, format!("{s}{e:02}"));
        }
        if let Some(date) = episode.release_date.and_then(epoch_ms_to_date) {
            result.set(Key::ReleaseDate, Value::Date(date));
        }
        result.set_opt(Key::Description, episode.description.clone());
        result.set_opt(Key::LongDescription, episode.description.clone());
        if let Some(annotation) = episode.rating.as_ref().and_then(Rating::annotation) {
            result.set(Key::Rating, annotation);
        }
        result.set(Key::ItunesCountry, store.storefront_id);
        result.set(Key::ServiceContentId, show_id.to_string());
        // The season id drives the season-metadata fetch at load time.
        result.set_opt(Key::ServiceAdditionalContentId, episode.season_id.clone());
        result.set_opt(Key::ServiceEpisodeId, episode.id.clone());

        for template in episode.images.values() {
            if let Some(artwork) = artwork_from_template(template, ArtworkKind::Episode) {
                result.remote_artworks.push(artwork);
            }
        }
        result
    }

    fn map_movie_item(&self, item: &Item, store: &Storefront) -> MetadataResult {
        let mut result = MetadataResult::new(MediaKind::Movie);

        result.set_opt(Key::Name, item.title.clone());
        result.set_opt(Key::Description, item.description.clone());
        result.set_opt(Key::LongDescription, item.description.clone());
        if let Some(date) = item.release_date.and_then(epoch_ms_to_date) {
            result.set(Key::ReleaseDate, Value::Date(date));
        }
        if let Some(genre) = item.genres.first() {
            result.set(Key::Genre, genre.name.clone());
        }
        result.set_opt(Key::Studio, item.studio.clone());
        if let Some(annotation) = item.rating.as_ref().and_then(Rating::annotation) {
            result.set(Key::Rating, annotation);
        }
        result.set(Key::ItunesCountry, store.storefront_id);
        result.set_opt(Key::ServiceContentId, item.id.clone());

        for template in item.images.values() {
            if let Some(artwork) = artwork_from_template(template, ArtworkKind::Poster) {
                result.remote_artworks.push(artwork);
            }
        }
        result
    }
}

fn epoch_ms_to_date(ms: i64) -> Option<chrono::NaiveDate> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.date_naive())
}

/// Split the Cast & Crew shelf into cast members and directors.
fn cast_and_directors(shelves: &[Shelf]) -> (Vec<String>, Vec<String>) {
    let mut cast = Vec::new();
    let mut directors = Vec::new();
    for shelf in shelves {
        if !shelf.id.starts_with(CAST_SHELF) {
            continue;
        }
        for person in &shelf.items {
            let Some(name) = person.title.clone() else {
                continue;
            };
            match person.role_title.as_deref() {
                Some("Director") => directors.push(name),
                _ => cast.push(name),
            }
        }
    }
    (cast, directors)
}

#[async_trait]
impl MetadataService for AppleTv {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    fn language_type(&self) -> LanguageType {
        LanguageType::Custom
    }

    fn languages(&self) -> Vec<String> {
        STOREFRONTS.iter().map(|s| s.country.clone()).collect()
    }

    fn default_language(&self) -> String {
        "United States".to_string()
    }

    async fn search_tv_show_names(&self, series: &str, language: &str) -> Vec<String> {
        let Some(store) = storefront_for_language(language) else {
            return Vec::new();
        };
        let mut names = Vec::new();
        for item in self.search_shelf(series, SHOWS_SHELF, store).await {
            if let Some(title) = item.title {
                if !names.contains(&title) {
                    names.push(title);
                }
            }
        }
        names
    }

    async fn search_tv_show(
        &self,
        series: &str,
        language: &str,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> Vec<MetadataResult> {
        let Some(store) = storefront_for_language(language) else {
            return Vec::new();
        };
        let Some(show_id) = self.find_show_id(series, store).await else {
            return Vec::new();
        };

        let seasons = self.fetch_seasons(&show_id, store).await;
        let counts: Vec<(u32, u32)> = seasons
            .iter()
            .map(|s| (s.season_number, s.episode_count))
            .collect();

        let token = match season {
            Some(s) => {
                let (start, end) = episode_window(&counts, s, episode);
                next_token(start, end)
            }
            None => {
                let total: u32 = counts.iter().map(|(_, count)| count).sum();
                next_token(0, total)
            }
        };

        self.fetch_episodes(&show_id, &token, store)
            .await
            .iter()
            .filter(|e| {
                season.is_none_or(|s| e.season_number == Some(s))
                    && episode.is_none_or(|n| e.episode_number == Some(n))
            })
            .map(|e| self.map_episode(e, series, &show_id, store))
            .collect()
    }

    async fn load_tv_metadata(&self, mut result: MetadataResult, language: &str) -> MetadataResult {
        if result.loaded {
            return result;
        }
        let Some(store) = storefront_for_language(language) else {
            result.loaded = true;
            return result;
        };

        // The season record carries the series description and the
        // season artwork.
        if let Some(season_id) = result
            .text(Key::ServiceAdditionalContentId)
            .map(str::to_string)
        {
            let query = self.base_query(store).await;
            let url = format!("{BASE_URL}/seasons/{season_id}/metadata");
            if let Ok(response) = self.client.get_with_query(&url, &query).await {
                if let Ok(detail) = response.json::<ShowResponse>().await {
                    if let Some(content) = detail.data.content {
                        result.set_opt(Key::SeriesDescription, content.description);
                        for template in content.images.values() {
                            if let Some(artwork) =
                                artwork_from_template(template, ArtworkKind::Season)
                            {
                                result.remote_artworks.push(artwork);
                            }
                        }
                    }
                }
            }
        }

        // Cast and crew come from the show page shelf.
        let show_id = match result.text(Key::ServiceContentId).map(str::to_string) {
            Some(id) => Some(id),
            None => match result.text(Key::SeriesName).map(str::to_string) {
                Some(series) => self.find_show_id(&series, store).await,
                None => None,
            },
        };
        if let Some(show_id) = show_id {
            let query = self.base_query(store).await;
            let url = format!("{BASE_URL}/shows/{show_id}");
            if let Ok(response) = self.client.get_with_query(&url, &query).await {
                if let Ok(show) = response.json::<ShowResponse>().await {
                    if let Some(content) = show.data.content {
                        if !result.contains(Key::SeriesDescription) {
                            result.set_opt(Key::SeriesDescription, content.description);
                        }
                        for template in content.images.values() {
                            if let Some(artwork) =
                                artwork_from_template(template, ArtworkKind::Poster)
                            {
                                result.remote_artworks.push(artwork);
                            }
                        }
                    }
                    let (cast, directors) = cast_and_directors(&show.data.shelves);
                    result.set_opt(Key::Cast, clean_list(&cast));
                    result.set_opt(Key::Director, clean_list(&directors));
                }
            }
        }

        result.remote_artworks = Artwork::unique(std::mem::take(&mut result.remote_artworks));
        result.loaded = true;
        result
    }

    async fn search_movie(&self, title: &str, language: &str) -> Vec<MetadataResult> {
        let Some(store) = storefront_for_language(language) else {
            return Vec::new();
        };
        self.search_shelf(title, MOVIES_SHELF, store)
            .await
            .iter()
            .filter(|item| item.title.is_some())
            .map(|item| self.map_movie_item(item, store))
            .collect()
    }

    async fn load_movie_metadata(
        &self,
        mut result: MetadataResult,
        language: &str,
    ) -> MetadataResult {
        if result.loaded {
            return result;
        }
        let Some(store) = storefront_for_language(language) else {
            result.loaded = true;
            return result;
        };
        let Some(movie_id) = result.text(Key::ServiceContentId).map(str::to_string) else {
            result.loaded = true;
            return result;
        };

        let query = self.base_query(store).await;
        let url = format!("{BASE_URL}/movies/{movie_id}");
        match self.client.get_with_query(&url, &query).await {
            Ok(response) => match response.json::<ShowResponse>().await {
                Ok(detail) => {
                    if let Some(content) = detail.data.content {
                        result.set_opt(Key::LongDescription, content.description);
                        result.set_opt(Key::Studio, content.studio);
                        for template in content.images.values() {
                            if let Some(artwork) =
                                artwork_from_template(template, ArtworkKind::Poster)
                            {
                                result.remote_artworks.push(artwork);
                            }
                        }
                    }
                    let (cast, directors) = cast_and_directors(&detail.data.shelves);
                    result.set_opt(Key::Cast, clean_list(&cast));
                    result.set_opt(Key::Director, clean_list(&directors));
                }
                Err(e) => warn!(movie = %movie_id, error = %e, "Failed to parse Apple TV movie"),
            },
            Err(e) => warn!(movie = %movie_id, error = %e, "Apple TV movie request failed"),
        }

        result.remote_artworks = Artwork::unique(std::mem::take(&mut result.remote_artworks));
        result.loaded = true;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storefront_table() {
        verify_storefronts().unwrap();
        let us = storefront("US").unwrap();
        assert_eq!(us.storefront_id, 143441);
        assert_eq!(us.locale, "en-US");
    }

    #[test]
    fn test_storefront_for_language_falls_back_to_us() {
        assert_eq!(
            storefront_for_language("Atlantis").unwrap().country2,
            "US"
        );
        assert_eq!(storefront_for_language("Germany").unwrap().country2, "DE");
    }

    #[test]
    fn test_episode_window_for_whole_season() {
        let seasons = [(1, 10), (2, 8)];
        assert_eq!(episode_window(&seasons, 2, None), (10, 17));
        assert_eq!(episode_window(&seasons, 1, None), (0, 9));
    }

    #[test]
    fn test_episode_window_for_single_episode() {
        let seasons = [(1, 10), (2, 8)];
        assert_eq!(episode_window(&seasons, 2, Some(3)), (12, 12));
        assert_eq!(episode_window(&seasons, 1, Some(1)), (0, 0));
    }

    #[test]
    fn test_next_token_format() {
        assert_eq!(next_token(10, 17), "10:17");
    }

    #[test]
    fn test_rating_annotation() {
        let rating = Rating {
            system: Some("us-tv".to_string()),
            display_name: Some("TV-14".to_string()),
            value: Some(500),
        };
        assert_eq!(rating.annotation(), Some("US-TV|TV-14|500|".to_string()));

        let incomplete = Rating {
            system: None,
            display_name: Some("TV-14".to_string()),
            value: Some(500),
        };
        assert_eq!(incomplete.annotation(), None);
    }

    #[test]
    fn test_map_episode_records_service_ids() {
        let service = AppleTv::new();
        let store = storefront("US").unwrap();
        let episode = Episode {
            title: Some("Pilot".to_string()),
            season_id: Some("umc.cse.season2".to_string()),
            season_number: Some(2),
            episode_number: Some(3),
            ..Default::default()
        };
        let result = service.map_episode(&episode, "Some Show", "umc.cmc.show1", store);
        assert_eq!(result.text(Key::ServiceContentId), Some("umc.cmc.show1"));
        assert_eq!(
            result.text(Key::ServiceAdditionalContentId),
            Some("umc.cse.season2")
        );
        assert_eq!(result.text(Key::EpisodeId), Some("203"));
    }

    #[test]
    fn test_cast_and_directors_from_shelf() {
        let person = |name: &str, role: Option<&str>| Item {
            title: Some(name.to_string()),
            role_title: role.map(str::to_string),
            ..Default::default()
        };
        let shelves = vec![
            Shelf {
                id: "uts.col.search.SH".to_string(),
                items: vec![person("Not A Person", None)],
            },
            Shelf {
                id: "uts.col.CastAndCrew.abc".to_string(),
                items: vec![
                    person("Jane Doe", Some("Director")),
                    person("Actor One", Some("Actor")),
                    person("Actor Two", None),
                ],
            },
        ];
        let (cast, directors) = cast_and_directors(&shelves);
        assert_eq!(cast, vec!["Actor One", "Actor Two"]);
        assert_eq!(directors, vec!["Jane Doe"]);
    }

    #[test]
    fn test_artwork_template_sizing() {
        let square = ImageTemplate {
            url: "https://is1.mzstatic.com/image/thumb/x/{w}x{h}.{f}".to_string(),
            width: 3000,
            height: 3000,
        };
        let artwork = artwork_from_template(&square, ArtworkKind::Square).unwrap();
        assert!(artwork.url.as_str().ends_with("1600x1600.jpg"));
        assert!(artwork.thumb_url.as_str().ends_with("330x330.jpg"));
    }
}
