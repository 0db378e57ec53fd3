//! TheMovieDB metadata provider
//!
//! Base URL: https://api.themoviedb.org/3
//!
//! Movie searches walk every result page (capped at 20). Detail loads
//! use `append_to_response` to collect credits, certifications and
//! images in one request, then fan out concurrently to the secondary
//! artwork sources. Merged artwork keeps a fixed source order: Apple TV
//! first, then Squared TV Art, the iTunes Store, this provider's own
//! images, and whatever the result already carried.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::media::result::{
    Artwork, ArtworkKind, ArtworkSize, Key, MediaKind, MetadataResult, Value,
};
use crate::services::artwork::{self, ArtworkQuery, ArtworkSource};
use crate::services::metadata::{LanguageType, MetadataService};
use crate::services::rate_limiter::RateLimitedClient;
use crate::services::ratings;
use crate::services::text_utils::{clean_list, titles_match};

const BASE_URL: &str = "https://api.themoviedb.org/3";
const API_KEY: &str = "b0073bafb08b4f68df101eb2325f27dc";
const MAX_SEARCH_PAGES: i64 = 20;

pub const SERVICE_NAME: &str = "TheMovieDB";

const LANGUAGES: &[&str] = &[
    "en", "fr", "de", "es", "it", "pt", "nl", "sv", "no", "da", "fi", "pl", "cs", "hu", "ru",
    "tr", "el", "he", "ar", "ja", "ko", "zh", "th",
];

#[derive(Debug, Deserialize)]
struct SearchPage<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    total_pages: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbMovie {
    id: i64,
    title: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    tagline: Option<String>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    #[serde(default)]
    production_companies: Vec<TmdbCompany>,
    casts: Option<TmdbCredits>,
    releases: Option<TmdbReleases>,
    images: Option<TmdbImages>,
    poster_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbGenre {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbCompany {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbCredits {
    #[serde(default)]
    cast: Vec<TmdbCastMember>,
    #[serde(default)]
    crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbCastMember {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbCrewMember {
    name: String,
    job: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbReleases {
    #[serde(default)]
    countries: Vec<TmdbReleaseCountry>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbReleaseCountry {
    iso_3166_1: String,
    certification: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbImages {
    #[serde(default)]
    posters: Vec<TmdbImage>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbImage {
    file_path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbShow {
    id: i64,
    name: Option<String>,
    overview: Option<String>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    #[serde(default)]
    networks: Vec<TmdbCompany>,
    #[serde(default)]
    production_companies: Vec<TmdbCompany>,
    #[serde(default)]
    seasons: Vec<TmdbSeasonSummary>,
    content_ratings: Option<TmdbContentRatings>,
    credits: Option<TmdbCredits>,
    images: Option<TmdbImages>,
    external_ids: Option<TmdbExternalIds>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbSeasonSummary {
    season_number: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbContentRatings {
    #[serde(default)]
    results: Vec<TmdbContentRating>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbContentRating {
    iso_3166_1: String,
    rating: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbExternalIds {
    tvdb_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbSeason {
    #[serde(default)]
    episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbEpisode {
    id: i64,
    name: Option<String>,
    overview: Option<String>,
    air_date: Option<String>,
    season_number: Option<u32>,
    episode_number: Option<u32>,
    crew: Option<Vec<TmdbCrewMember>>,
    credits: Option<TmdbCredits>,
    still_path: Option<String>,
}

fn image_url(path: &str, size: &str) -> Option<Url> {
    Url::parse(&format!("https://image.tmdb.org/t/p/{size}{path}")).ok()
}

fn poster_artwork(path: &str, kind: ArtworkKind) -> Option<Artwork> {
    let full = image_url(path, "original")?;
    let thumb = image_url(path, "w342")?;
    Some(Artwork::new(full, thumb, SERVICE_NAME, kind))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn crew_names(crew: &[TmdbCrewMember], jobs: &[&str]) -> Vec<String> {
    crew.iter()
        .filter(|m| m.job.as_deref().is_some_and(|j| jobs.contains(&j)))
        .map(|m| m.name.clone())
        .collect()
}

pub struct TheMovieDb {
    client: RateLimitedClient,
    artwork_sources: Vec<Arc<dyn ArtworkSource>>,
}

impl Default for TheMovieDb {
    fn default() -> Self {
        Self::new()
    }
}

impl TheMovieDb {
    pub fn new() -> Self {
        Self::with_artwork_sources(artwork::default_sources())
    }

    pub fn with_artwork_sources(sources: Vec<Arc<dyn ArtworkSource>>) -> Self {
        Self {
            client: RateLimitedClient::for_tmdb(),
            artwork_sources: sources,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Option<T> {
        let url = format!("{BASE_URL}/{path}");
        let mut query = query.to_vec();
        query.push(("api_key", API_KEY.to_string()));

        let response = match self.client.get_with_query(&url, &query).await {
            Ok(response) => response,
            Err(e) => {
                warn!(path = %path, error = %e, "TheMovieDB request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(path = %path, status = %response.status(), "TheMovieDB request rejected");
            return None;
        }
        match response.json().await {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to parse TheMovieDB response");
                None
            }
        }
    }

    async fn search_movie_page(&self, title: &str, language: &str, page: i64) -> SearchPage<TmdbMovie> {
        self.get_json(
            "search/movie",
            &[
                ("query", title.to_string()),
                ("language", language.to_string()),
                ("page", page.to_string()),
                ("include_adult", "false".to_string()),
            ],
        )
        .await
        .unwrap_or(SearchPage {
            results: Vec::new(),
            total_pages: None,
        })
    }

    fn map_movie_brief(&self, movie: &TmdbMovie) -> MetadataResult {
        let mut result = MetadataResult::new(MediaKind::Movie);
        result.set_opt(Key::Name, movie.title.clone());
        if let Some(date) = movie.release_date.as_deref().and_then(parse_date) {
            result.set(Key::ReleaseDate, Value::Date(date));
        }
        result.set_opt(Key::Description, movie.overview.clone());
        result.set(Key::ServiceContentId, movie.id);
        if let Some(artwork) = movie
            .poster_path
            .as_deref()
            .and_then(|p| poster_artwork(p, ArtworkKind::Poster))
        {
            result.remote_artworks.push(artwork);
        }
        result
    }

    fn apply_movie_detail(&self, result: &mut MetadataResult, movie: &TmdbMovie) {
        result.set_opt(Key::Name, movie.title.clone());
        if let Some(date) = movie.release_date.as_deref().and_then(parse_date) {
            result.set(Key::ReleaseDate, Value::Date(date));
        }
        result.set_opt(Key::Description, movie.overview.clone());
        result.set_opt(Key::LongDescription, movie.overview.clone());
        if !movie.genres.is_empty() {
            let names: Vec<String> = movie.genres.iter().map(|g| g.name.clone()).collect();
            result.set_opt(Key::Genre, clean_list(&names));
        }
        if let Some(company) = movie.production_companies.first() {
            result.set(Key::Studio, company.name.clone());
        }
        if let Some(tagline) = &movie.tagline {
            if !tagline.is_empty() && !result.contains(Key::Description) {
                result.set(Key::Description, tagline.clone());
            }
        }
        if let Some(credits) = &movie.casts {
            let cast: Vec<String> = credits.cast.iter().map(|c| c.name.clone()).collect();
            result.set_opt(Key::Cast, clean_list(&cast));
            result.set_opt(Key::Director, clean_list(&crew_names(&credits.crew, &["Director"])));
            result.set_opt(
                Key::Producers,
                clean_list(&crew_names(&credits.crew, &["Producer"])),
            );
            result.set_opt(
                Key::Screenwriters,
                clean_list(&crew_names(&credits.crew, &["Screenplay", "Writer"])),
            );
            result.set_opt(
                Key::ExecutiveProducer,
                clean_list(&crew_names(&credits.crew, &["Executive Producer"])),
            );
        }
        if let Some(releases) = &movie.releases {
            let cert = releases
                .countries
                .iter()
                .find(|c| c.iso_3166_1 == "US")
                .and_then(|c| c.certification.clone())
                .filter(|c| !c.is_empty());
            if let Some(cert) = cert {
                let annotation = ratings::rating("USA", MediaKind::Movie, &cert)
                    .map(|r| r.itunes_annotation())
                    .unwrap_or(cert);
                result.set(Key::Rating, annotation);
            }
        }
    }

    fn map_episode_brief(&self, episode: &TmdbEpisode, show: &TmdbShow) -> MetadataResult {
        let mut result = MetadataResult::new(MediaKind::TvShow);
        result.set_opt(Key::Name, episode.name.clone());
        result.set_opt(Key::SeriesName, show.name.clone());
        result.set_opt(Key::Season, episode.season_number.map(i64::from));
        result.set_opt(Key::EpisodeNumber, episode.episode_number.map(i64::from));
        result.set_opt(Key::TrackNumber, episode.episode_number.map(i64::from));
        if let (Some(s), Some(e)) = (episode.season_number, episode.episode_number) {
            result.set(Key::EpisodeId, format!("{s}{e:02}"));
        }
        if let Some(date) = episode.air_date.as_deref().and_then(parse_date) {
            result.set(Key::ReleaseDate, Value::Date(date));
        }
        result.set_opt(Key::Description, episode.overview.clone());
        result.set_opt(Key::LongDescription, episode.overview.clone());
        result.set(Key::ServiceContentId, show.id);
        result.set(Key::ServiceEpisodeId, episode.id);
        if let Some(artwork) = episode
            .still_path
            .as_deref()
            .and_then(|p| poster_artwork(p, ArtworkKind::Episode))
        {
            result
                .remote_artworks
                .push(artwork.with_size(ArtworkSize::Rectangle));
        }
        result
    }

    async fn find_show(&self, series: &str, language: &str) -> Option<TmdbShow> {
        let page: SearchPage<TmdbShow> = self
            .get_json(
                "search/tv",
                &[
                    ("query", series.to_string()),
                    ("language", language.to_string()),
                ],
            )
            .await?;
        let brief = page.results.into_iter().find(|show| {
            show.name
                .as_deref()
                .is_some_and(|name| titles_match(series, name))
        })?;

        self.get_json(
            &format!("tv/{}", brief.id),
            &[
                ("language", language.to_string()),
                (
                    "append_to_response",
                    "content_ratings,credits,images,external_ids".to_string(),
                ),
            ],
        )
        .await
    }

    async fn season_episodes(
        &self,
        show_id: i64,
        season: u32,
        language: &str,
    ) -> Vec<TmdbEpisode> {
        let detail: Option<TmdbSeason> = self
            .get_json(
                &format!("tv/{show_id}/season/{season}"),
                &[("language", language.to_string())],
            )
            .await;
        detail.map(|s| s.episodes).unwrap_or_default()
    }

    fn apply_show_detail(&self, result: &mut MetadataResult, show: &TmdbShow) {
        result.set_opt(Key::SeriesDescription, show.overview.clone());
        if !show.genres.is_empty() {
            let names: Vec<String> = show.genres.iter().map(|g| g.name.clone()).collect();
            result.set_opt(Key::Genre, clean_list(&names));
        }
        if let Some(network) = show.networks.first() {
            result.set(Key::Network, network.name.clone());
        }
        if let Some(company) = show.production_companies.first() {
            result.set(Key::Studio, company.name.clone());
        }
        if let Some(credits) = &show.credits {
            let cast: Vec<String> = credits.cast.iter().map(|c| c.name.clone()).collect();
            result.set_opt(Key::Cast, clean_list(&cast));
        }
        if let Some(content_ratings) = &show.content_ratings {
            let cert = content_ratings
                .results
                .iter()
                .find(|r| r.iso_3166_1 == "US")
                .and_then(|r| r.rating.clone())
                .filter(|r| !r.is_empty());
            if let Some(cert) = cert {
                let annotation = ratings::rating("USA", MediaKind::TvShow, &cert)
                    .map(|r| r.itunes_annotation())
                    .unwrap_or(cert);
                result.set(Key::Rating, annotation);
            }
        }
    }
}

#[async_trait]
impl MetadataService for TheMovieDb {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    fn language_type(&self) -> LanguageType {
        LanguageType::Iso
    }

    fn languages(&self) -> Vec<String> {
        LANGUAGES.iter().map(|l| l.to_string()).collect()
    }

    fn default_language(&self) -> String {
        "en".to_string()
    }

    async fn search_tv_show_names(&self, series: &str, language: &str) -> Vec<String> {
        let page: Option<SearchPage<TmdbShow>> = self
            .get_json(
                "search/tv",
                &[
                    ("query", series.to_string()),
                    ("language", language.to_string()),
                ],
            )
            .await;
        let mut names = Vec::new();
        for show in page.map(|p| p.results).unwrap_or_default() {
            if let Some(name) = show.name {
                if !names.contains(&name) {
                    names.push(name);
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
        let mut show = self.find_show(series, language).await;
        if show.is_none() && language != "en" {
            show = self.find_show(series, "en").await;
        }
        let Some(show) = show else {
            return Vec::new();
        };

        let seasons: Vec<u32> = match season {
            Some(s) => vec![s],
            None => show.seasons.iter().map(|s| s.season_number).collect(),
        };

        let fetches = seasons
            .iter()
            .map(|s| self.season_episodes(show.id, *s, language));
        let episodes: Vec<TmdbEpisode> = join_all(fetches).await.into_iter().flatten().collect();

        let mut results: Vec<MetadataResult> = episodes
            .iter()
            .filter(|e| episode.is_none_or(|n| e.episode_number == Some(n)))
            .map(|e| self.map_episode_brief(e, &show))
            .collect();

        // Backfill sparse localized episodes from the English listing.
        if language != "en"
            && results
                .iter()
                .any(|r| !r.contains(Key::Name) || !r.contains(Key::Description))
        {
            let fetches = seasons.iter().map(|s| self.season_episodes(show.id, *s, "en"));
            let english: Vec<TmdbEpisode> =
                join_all(fetches).await.into_iter().flatten().collect();
            for result in results.iter_mut() {
                let fallback = english.iter().find(|e| {
                    e.season_number.map(i64::from) == result.integer(Key::Season)
                        && e.episode_number.map(i64::from) == result.integer(Key::EpisodeNumber)
                });
                if let Some(fallback) = fallback {
                    result.fill_missing_from(&self.map_episode_brief(fallback, &show));
                }
            }
        }

        results
    }

    async fn load_tv_metadata(&self, mut result: MetadataResult, language: &str) -> MetadataResult {
        if result.loaded {
            return result;
        }

        let Some(show_id) = result.integer(Key::ServiceContentId) else {
            result.loaded = true;
            return result;
        };

        let show: Option<TmdbShow> = self
            .get_json(
                &format!("tv/{show_id}"),
                &[
                    ("language", language.to_string()),
                    (
                        "append_to_response",
                        "content_ratings,credits,images,external_ids".to_string(),
                    ),
                ],
            )
            .await;
        let Some(show) = show else {
            result.loaded = true;
            return result;
        };
        self.apply_show_detail(&mut result, &show);

        // Per-episode crew.
        if let (Some(season), Some(episode)) = (
            result.integer(Key::Season),
            result.integer(Key::EpisodeNumber),
        ) {
            let detail: Option<TmdbEpisode> = self
                .get_json(
                    &format!("tv/{show_id}/season/{season}/episode/{episode}"),
                    &[
                        ("language", language.to_string()),
                        ("append_to_response", "credits,images".to_string()),
                    ],
                )
                .await;
            if let Some(detail) = detail {
                let crew = detail
                    .credits
                    .as_ref()
                    .map(|c| c.crew.clone())
                    .or(detail.crew)
                    .unwrap_or_default();
                result.set_opt(Key::Director, clean_list(&crew_names(&crew, &["Director"])));
                result.set_opt(
                    Key::Screenwriters,
                    clean_list(&crew_names(&crew, &["Screenplay", "Writer"])),
                );
            }
        }

        let series = result.text(Key::SeriesName).unwrap_or_default().to_string();
        let season = result
            .integer(Key::Season)
            .and_then(|s| u32::try_from(s).ok());
        let tvdb_id = show.external_ids.as_ref().and_then(|ids| ids.tvdb_id);

        // Secondary artwork sources run concurrently; the merge order is
        // fixed regardless of which source answers first.
        let query = ArtworkQuery::tv_show(&series, season, tvdb_id);
        let fetched = artwork::collect(&self.artwork_sources, &query).await;

        let own: Vec<Artwork> = show
            .images
            .as_ref()
            .map(|images| {
                images
                    .posters
                    .iter()
                    .filter_map(|i| poster_artwork(&i.file_path, ArtworkKind::Poster))
                    .collect()
            })
            .unwrap_or_default();

        let existing = std::mem::take(&mut result.remote_artworks);
        let mut merged = Vec::new();
        merged.extend(fetched);
        merged.extend(own);
        merged.extend(existing);
        result.remote_artworks = merged;

        result.loaded = true;
        result
    }

    async fn search_movie(&self, title: &str, language: &str) -> Vec<MetadataResult> {
        let first = self.search_movie_page(title, language, 1).await;
        let total = first.total_pages.unwrap_or(1).min(MAX_SEARCH_PAGES);

        let mut movies = first.results;
        if total > 1 {
            let fetches = (2..=total).map(|page| self.search_movie_page(title, language, page));
            for page in join_all(fetches).await {
                movies.extend(page.results);
            }
        }

        movies
            .iter()
            .filter(|m| m.title.is_some())
            .map(|m| self.map_movie_brief(m))
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

        let Some(movie_id) = result.integer(Key::ServiceContentId) else {
            result.loaded = true;
            return result;
        };

        let movie: Option<TmdbMovie> = self
            .get_json(
                &format!("movie/{movie_id}"),
                &[
                    ("language", language.to_string()),
                    ("append_to_response", "casts,releases,images".to_string()),
                ],
            )
            .await;
        let Some(movie) = movie else {
            result.loaded = true;
            return result;
        };
        self.apply_movie_detail(&mut result, &movie);

        let title = result.text(Key::Name).unwrap_or_default().to_string();

        let query = ArtworkQuery::movie(&title);
        let fetched = artwork::collect(&self.artwork_sources, &query).await;

        let own: Vec<Artwork> = movie
            .images
            .as_ref()
            .map(|images| {
                images
                    .posters
                    .iter()
                    .filter_map(|i| poster_artwork(&i.file_path, ArtworkKind::Poster))
                    .collect()
            })
            .unwrap_or_default();

        let existing = std::mem::take(&mut result.remote_artworks);
        let mut merged = Vec::new();
        merged.extend(fetched);
        merged.extend(own);
        merged.extend(existing);
        result.remote_artworks = Artwork::unique(merged);

        result.loaded = true;
        result
    }
}
