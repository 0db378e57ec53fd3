//! TheTVDB metadata provider
//!
//! Base URL: https://api.thetvdb.com
//!
//! The JWT login token is good for 24 hours upstream but is refreshed
//! here after 4; the language list barely ever changes and is cached
//! for 30 days. Both live in the preference store so they survive
//! restarts. Refreshes are serialized behind one async lock so parallel
//! searches never log in twice.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use tokio::sync::Mutex;
use serde::Deserialize;
use tracing::warn;

use crate::config::Prefs;
use crate::media::result::{Artwork, ArtworkKind, Key, MediaKind, MetadataResult, Value};
use crate::services::artwork::{self, ArtworkQuery, ArtworkSource};
use crate::services::metadata::{LanguageType, MetadataService};
use crate::services::rate_limiter::RateLimitedClient;
use crate::services::ratings;
use crate::services::text_utils::{clean_list, titles_match};
use url::Url;

const BASE_URL: &str = "https://api.thetvdb.com";
const BANNER_URL: &str = "https://thetvdb.com/banners/";
const API_KEY: &str = "3498815BE9484A62";

const TOKEN_KEY: &str = "tvdb.token";
const TOKEN_TIMESTAMP_KEY: &str = "tvdb.token.timestamp";
const LANGUAGES_KEY: &str = "tvdb.languages";
const LANGUAGES_TIMESTAMP_KEY: &str = "tvdb.languages.timestamp";

const FALLBACK_LANGUAGES: &[&str] = &[
    "en", "de", "fr", "es", "it", "pt", "nl", "sv", "no", "da", "fi", "pl", "cs", "hu", "ru",
    "tr", "el", "he", "ja", "ko", "zh",
];

pub const SERVICE_NAME: &str = "TheTVDB";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct DataList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct DataItem<T> {
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbLanguage {
    abbreviation: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbSeries {
    id: u64,
    series_name: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    overview: Option<String>,
    network: Option<String>,
    genre: Option<Vec<String>>,
    rating: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbEpisode {
    id: u64,
    aired_season: Option<u32>,
    aired_episode_number: Option<u32>,
    episode_name: Option<String>,
    overview: Option<String>,
    first_aired: Option<String>,
    #[serde(default)]
    directors: Vec<String>,
    #[serde(default)]
    writers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbActor {
    name: String,
    sort_order: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbImage {
    file_name: Option<String>,
    thumbnail: Option<String>,
    sub_key: Option<String>,
}

// TheMovieDB fallback lookup for shows TheTVDB's own search misses.
#[derive(Debug, Deserialize)]
struct TmdbSearchPage {
    #[serde(default)]
    results: Vec<TmdbShowBrief>,
}

#[derive(Debug, Deserialize)]
struct TmdbShowBrief {
    id: i64,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbExternalIds {
    tvdb_id: Option<u64>,
}

fn banner_artwork(file_name: &str, thumbnail: Option<&str>, kind: ArtworkKind) -> Option<Artwork> {
    let url = Url::parse(&format!("{BANNER_URL}{file_name}")).ok()?;
    let thumb = match thumbnail {
        Some(t) => Url::parse(&format!("{BANNER_URL}{t}")).ok()?,
        None => url.clone(),
    };
    Some(Artwork::new(url, thumb, SERVICE_NAME, kind))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Series whose name or one of whose aliases equals the search exactly
/// win over every fuzzier candidate; without an exact hit all candidates
/// are kept in the order the search returned them.
fn preferred_series_ids(found: &[TvdbSeries], series: &str) -> Vec<u64> {
    let exact: Vec<u64> = found
        .iter()
        .filter(|s| {
            s.series_name
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(series))
                || s.aliases.iter().any(|a| a.eq_ignore_ascii_case(series))
        })
        .map(|s| s.id)
        .collect();
    if !exact.is_empty() {
        return exact;
    }
    found.iter().map(|s| s.id).collect()
}

pub struct TheTvDb {
    client: RateLimitedClient,
    tmdb_client: RateLimitedClient,
    token_lock: Mutex<()>,
    artwork_sources: Vec<Arc<dyn ArtworkSource>>,
}

impl Default for TheTvDb {
    fn default() -> Self {
        Self::new()
    }
}

impl TheTvDb {
    pub fn new() -> Self {
        Self::with_artwork_sources(artwork::default_sources())
    }

    pub fn with_artwork_sources(sources: Vec<Arc<dyn ArtworkSource>>) -> Self {
        Self {
            client: RateLimitedClient::for_tvdb(),
            tmdb_client: RateLimitedClient::for_tmdb(),
            token_lock: Mutex::new(()),
            artwork_sources: sources,
        }
    }

    /// The cached login token, refreshed when older than 4 hours.
    async fn token(&self) -> Option<String> {
        let _guard = self.token_lock.lock().await;
        let prefs = Prefs::shared();

        if let (Some(token), Some(stamp)) = (
            prefs.string(TOKEN_KEY),
            prefs.string(TOKEN_TIMESTAMP_KEY),
        ) {
            if let Ok(stamp) = DateTime::parse_from_rfc3339(&stamp) {
                if Utc::now().signed_duration_since(stamp) < Duration::hours(4) {
                    return Some(token);
                }
            }
        }

        let body = serde_json::json!({ "apikey": API_KEY });
        let response = match self
            .client
            .post_json(&format!("{BASE_URL}/login"), &body)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "TheTVDB login request failed");
                return None;
            }
        };
        let login: LoginResponse = match response.json().await {
            Ok(login) => login,
            Err(e) => {
                warn!(error = %e, "Failed to parse TheTVDB login response");
                return None;
            }
        };

        prefs.set(TOKEN_KEY, &login.token);
        prefs.set(TOKEN_TIMESTAMP_KEY, &Utc::now().to_rfc3339());
        Some(login.token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        language: &str,
        query: &[(&str, String)],
    ) -> Option<T> {
        let token = self.token().await?;
        let bearer = format!("Bearer {token}");
        let headers = [
            ("Authorization", bearer.as_str()),
            ("Accept-Language", language),
        ];
        let url = format!("{BASE_URL}/{path}");
        let response = match self
            .client
            .get_with_headers_and_query(&url, &headers, query)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(path = %path, error = %e, "TheTVDB request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            // 404 is the API's way of saying "no results".
            return None;
        }
        match response.json().await {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to parse TheTVDB response");
                None
            }
        }
    }

    async fn cached_languages(&self) -> Vec<String> {
        let prefs = Prefs::shared();
        if let (Some(languages), Some(stamp)) = (
            prefs.get::<Vec<String>>(LANGUAGES_KEY),
            prefs.string(LANGUAGES_TIMESTAMP_KEY),
        ) {
            if let Ok(stamp) = DateTime::parse_from_rfc3339(&stamp) {
                if Utc::now().signed_duration_since(stamp) < Duration::days(30)
                    && !languages.is_empty()
                {
                    return languages;
                }
            }
        }

        let fetched: Option<DataList<TvdbLanguage>> =
            self.get_json("languages", "en", &[]).await;
        if let Some(list) = fetched {
            let languages: Vec<String> =
                list.data.into_iter().map(|l| l.abbreviation).collect();
            if !languages.is_empty() {
                prefs.set(LANGUAGES_KEY, &languages);
                prefs.set(LANGUAGES_TIMESTAMP_KEY, &Utc::now().to_rfc3339());
                return languages;
            }
        }
        FALLBACK_LANGUAGES.iter().map(|l| l.to_string()).collect()
    }

    /// Series candidates for a name, preferring exact name or alias
    /// matches, retrying in English, then asking TheMovieDB for the
    /// TheTVDB id as a last resort.
    async fn find_series(&self, series: &str, language: &str) -> Vec<u64> {
        let query = [("name", series.to_string())];
        let mut found: Vec<TvdbSeries> = self
            .get_json::<DataList<TvdbSeries>>("search/series", language, &query)
            .await
            .map(|l| l.data)
            .unwrap_or_default();

        if found.is_empty() && language != "en" {
            found = self
                .get_json::<DataList<TvdbSeries>>("search/series", "en", &query)
                .await
                .map(|l| l.data)
                .unwrap_or_default();
        }

        let preferred = preferred_series_ids(&found, series);
        if !preferred.is_empty() {
            return preferred;
        }

        match self.tvdb_id_via_tmdb(series).await {
            Some(id) => vec![id],
            None => Vec::new(),
        }
    }

    async fn tvdb_id_via_tmdb(&self, series: &str) -> Option<u64> {
        let search_url = "https://api.themoviedb.org/3/search/tv";
        let query = [
            ("api_key", "b0073bafb08b4f68df101eb2325f27dc".to_string()),
            ("query", series.to_string()),
        ];
        let response = self.tmdb_client.get_with_query(search_url, &query).await.ok()?;
        let page: TmdbSearchPage = response.json().await.ok()?;
        let show = page.results.into_iter().find(|s| {
            s.name
                .as_deref()
                .is_some_and(|n| titles_match(series, n))
        })?;

        let ids_url = format!(
            "https://api.themoviedb.org/3/tv/{}/external_ids",
            show.id
        );
        let query = [("api_key", "b0073bafb08b4f68df101eb2325f27dc".to_string())];
        let response = self.tmdb_client.get_with_query(&ids_url, &query).await.ok()?;
        let ids: TmdbExternalIds = response.json().await.ok()?;
        ids.tvdb_id
    }

    async fn episodes(
        &self,
        series_id: u64,
        language: &str,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> Vec<TvdbEpisode> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(season) = season {
            query.push(("airedSeason", season.to_string()));
        }
        if let Some(episode) = episode {
            query.push(("airedEpisode", episode.to_string()));
        }

        let path = format!("series/{series_id}/episodes/query");
        self.get_json::<DataList<TvdbEpisode>>(&path, language, &query)
            .await
            .map(|l| l.data)
            .unwrap_or_default()
    }

    fn map_episode(&self, episode: &TvdbEpisode, series_id: u64, series: &str) -> MetadataResult {
        let mut result = MetadataResult::new(MediaKind::TvShow);

        result.set_opt(Key::Name, episode.episode_name.clone());
        result.set(Key::SeriesName, series.to_string());
        result.set_opt(Key::Season, episode.aired_season.map(i64::from));
        result.set_opt(
            Key::EpisodeNumber,
            episode.aired_episode_number.map(i64::from),
        );
        result.set_opt(
            Key::TrackNumber,
            episode.aired_episode_number.map(i64::from),
        );
        if let (Some(s), Some(e)) = (episode.aired_season, episode.aired_episode_number) {
            result.set(Key::EpisodeId, format!("{s}{e:02}"));
        }
        if let Some(date) = episode.first_aired.as_deref().and_then(parse_date) {
            result.set(Key::ReleaseDate, Value::Date(date));
        }
        result.set_opt(Key::Description, episode.overview.clone());
        result.set_opt(Key::LongDescription, episode.overview.clone());
        result.set_opt(Key::Director, clean_list(&episode.directors));
        result.set_opt(Key::Screenwriters, clean_list(&episode.writers));
        result.set(Key::ServiceContentId, i64::try_from(series_id).unwrap_or(0));
        result.set(Key::ServiceEpisodeId, i64::try_from(episode.id).unwrap_or(0));
        result
    }

    async fn series_images(
        &self,
        series_id: u64,
        language: &str,
        key_type: &str,
        season: Option<i64>,
        kind: ArtworkKind,
    ) -> Vec<Artwork> {
        let query = [("keyType", key_type.to_string())];
        let path = format!("series/{series_id}/images/query");
        let images = self
            .get_json::<DataList<TvdbImage>>(&path, language, &query)
            .await
            .map(|l| l.data)
            .unwrap_or_default();

        images
            .iter()
            .filter(|i| {
                season.is_none()
                    || i.sub_key
                        .as_deref()
                        .and_then(|k| k.parse::<i64>().ok())
                        == season
            })
            .filter_map(|i| {
                banner_artwork(i.file_name.as_deref()?, i.thumbnail.as_deref(), kind)
            })
            .collect()
    }
}

#[async_trait]
impl MetadataService for TheTvDb {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    fn language_type(&self) -> LanguageType {
        LanguageType::Iso
    }

    fn languages(&self) -> Vec<String> {
        // The provider-reported list needs a network round trip; callers
        // get the cached or fallback set synchronously.
        let prefs = Prefs::shared();
        prefs
            .get::<Vec<String>>(LANGUAGES_KEY)
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| FALLBACK_LANGUAGES.iter().map(|l| l.to_string()).collect())
    }

    fn default_language(&self) -> String {
        "en".to_string()
    }

    async fn search_tv_show_names(&self, series: &str, language: &str) -> Vec<String> {
        // Refreshes the language cache opportunistically.
        let _ = self.cached_languages().await;

        let query = [("name", series.to_string())];
        let found = self
            .get_json::<DataList<TvdbSeries>>("search/series", language, &query)
            .await
            .map(|l| l.data)
            .unwrap_or_default();

        let mut names = Vec::new();
        for show in found {
            if let Some(name) = show.series_name {
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
        let candidates = self.find_series(series, language).await;

        // Candidates are tried in order; the first one with matching
        // episodes wins.
        for series_id in candidates {
            let episodes = self.episodes(series_id, language, season, episode).await;
            if episodes.is_empty() {
                continue;
            }
            let mut results: Vec<MetadataResult> = episodes
                .iter()
                .map(|e| self.map_episode(e, series_id, series))
                .collect();

            // Localized records are often sparse. Backfill missing fields
            // from the English episodes when searching another language.
            if language != "en"
                && results
                    .iter()
                    .any(|r| !r.contains(Key::Name) || !r.contains(Key::Description))
            {
                let english = self.episodes(series_id, "en", season, episode).await;
                for result in results.iter_mut() {
                    let fallback = english.iter().find(|e| {
                        e.aired_season.map(i64::from) == result.integer(Key::Season)
                            && e.aired_episode_number.map(i64::from)
                                == result.integer(Key::EpisodeNumber)
                    });
                    if let Some(fallback) = fallback {
                        result.fill_missing_from(&self.map_episode(fallback, series_id, series));
                    }
                }
            }

            results.sort_by_key(|r| {
                (
                    r.integer(Key::Season).unwrap_or(0),
                    r.integer(Key::EpisodeNumber).unwrap_or(0),
                )
            });
            return results;
        }
        Vec::new()
    }

    async fn load_tv_metadata(&self, mut result: MetadataResult, language: &str) -> MetadataResult {
        if result.loaded {
            return result;
        }
        let Some(series_id) = result
            .integer(Key::ServiceContentId)
            .and_then(|id| u64::try_from(id).ok())
        else {
            result.loaded = true;
            return result;
        };

        let mut detail: Option<DataItem<TvdbSeries>> = self
            .get_json(&format!("series/{series_id}"), language, &[])
            .await;
        if language != "en"
            && detail
                .as_ref()
                .is_none_or(|d| d.data.overview.is_none())
        {
            if let Some(english) = self
                .get_json::<DataItem<TvdbSeries>>(&format!("series/{series_id}"), "en", &[])
                .await
            {
                match detail.as_mut() {
                    Some(d) if d.data.overview.is_none() => {
                        d.data.overview = english.data.overview;
                    }
                    Some(_) => {}
                    None => detail = Some(english),
                }
            }
        }
        if let Some(DataItem { data: show }) = detail {
            result.set_opt(Key::SeriesDescription, show.overview);
            result.set_opt(Key::Network, show.network.clone());
            result.set_opt(Key::Studio, show.network);
            if let Some(genres) = show.genre {
                result.set_opt(Key::Genre, clean_list(&genres));
            }
            if let Some(label) = show.rating.filter(|r| !r.is_empty()) {
                let annotation = ratings::rating("USA", MediaKind::TvShow, &label)
                    .map(|r| r.itunes_annotation())
                    .unwrap_or(label);
                result.set(Key::Rating, annotation);
            }
        }

        let actors: Option<DataList<TvdbActor>> = self
            .get_json(&format!("series/{series_id}/actors"), language, &[])
            .await;
        if let Some(mut list) = actors.map(|l| l.data) {
            list.sort_by_key(|a| a.sort_order.unwrap_or(i64::MAX));
            let names: Vec<String> = list.into_iter().map(|a| a.name).collect();
            result.set_opt(Key::Cast, clean_list(&names));
        }

        let series = result.text(Key::SeriesName).unwrap_or_default().to_string();
        let season = result.integer(Key::Season);
        let season_u32 = season.and_then(|s| u32::try_from(s).ok());

        let query = ArtworkQuery::tv_show(&series, season_u32, Some(series_id));
        let (fetched, own_season, own_posters) = tokio::join!(
            artwork::collect(&self.artwork_sources, &query),
            self.series_images(series_id, language, "season", season, ArtworkKind::Season),
            self.series_images(series_id, language, "poster", None, ArtworkKind::Poster),
        );

        let existing = std::mem::take(&mut result.remote_artworks);
        let mut merged = Vec::new();
        merged.extend(fetched);
        merged.extend(own_season);
        merged.extend(own_posters);
        merged.extend(existing);
        result.remote_artworks = merged;

        result.loaded = true;
        result
    }

    async fn search_movie(&self, _title: &str, _language: &str) -> Vec<MetadataResult> {
        // TheTVDB only carries series.
        Vec::new()
    }

    async fn load_movie_metadata(
        &self,
        mut result: MetadataResult,
        _language: &str,
    ) -> MetadataResult {
        result.loaded = true;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(id: u64, name: &str, aliases: &[&str]) -> TvdbSeries {
        TvdbSeries {
            id,
            series_name: Some(name.to_string()),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            overview: None,
            network: None,
            genre: None,
            rating: None,
        }
    }

    #[test]
    fn test_preferred_series_ids_exact_name_wins() {
        let found = vec![series(1, "Foo Bar", &[]), series(2, "Foo Baz", &[])];
        // "Foo Bar" comes first in the search answer, but the exact
        // name match beats it regardless of rank.
        assert_eq!(preferred_series_ids(&found, "foo baz"), vec![2]);
    }

    #[test]
    fn test_preferred_series_ids_alias_counts_as_exact() {
        let found = vec![
            series(1, "Foo Bar", &[]),
            series(2, "Some Other Name", &["Foo Baz"]),
        ];
        assert_eq!(preferred_series_ids(&found, "Foo Baz"), vec![2]);
    }

    #[test]
    fn test_preferred_series_ids_keeps_rank_without_exact_hit() {
        let found = vec![series(1, "Foo Bar (2005)", &[]), series(2, "Foo Baz", &[])];
        assert_eq!(preferred_series_ids(&found, "Foo Bar"), vec![1, 2]);
    }

    #[test]
    fn test_banner_artwork_urls() {
        let artwork = banner_artwork(
            "seasons/81189-2.jpg",
            Some("_cache/seasons/81189-2.jpg"),
            ArtworkKind::Season,
        )
        .unwrap();
        assert_eq!(
            artwork.url.as_str(),
            "https://thetvdb.com/banners/seasons/81189-2.jpg"
        );
        assert_eq!(
            artwork.thumb_url.as_str(),
            "https://thetvdb.com/banners/_cache/seasons/81189-2.jpg"
        );
    }

    #[test]
    fn test_banner_artwork_without_thumbnail() {
        let artwork = banner_artwork("posters/x.jpg", None, ArtworkKind::Poster).unwrap();
        assert_eq!(artwork.url, artwork.thumb_url);
    }

    #[test]
    fn test_map_episode() {
        let service = TheTvDb::new();
        let episode = TvdbEpisode {
            id: 5555,
            aired_season: Some(2),
            aired_episode_number: Some(3),
            episode_name: Some("The One With the Test".to_string()),
            overview: Some("Things happen.".to_string()),
            first_aired: Some("2009-04-20".to_string()),
            directors: vec!["Jane Doe".to_string()],
            writers: vec!["John Roe".to_string(), String::new()],
        };
        let result = service.map_episode(&episode, 81189, "Some Show");
        assert_eq!(result.text(Key::Name), Some("The One With the Test"));
        assert_eq!(result.text(Key::EpisodeId), Some("203"));
        assert_eq!(result.integer(Key::ServiceContentId), Some(81189));
        assert_eq!(result.text(Key::Screenwriters), Some("John Roe"));
        assert_eq!(result.integer(Key::Season), Some(2));
    }
}
