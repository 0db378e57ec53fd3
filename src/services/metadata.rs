//! Provider-independent metadata search interface
//!
//! Every upstream catalog implements [`MetadataService`]. The trait is
//! deliberately infallible at the edges: providers log upstream failures
//! and return empty collections, so callers only ever see "no results".

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Prefs;
use crate::media::result::{MediaKind, MetadataResult};
use crate::services::{appletv_v3, itunes, tmdb, tvdb};

/// How a provider expresses its supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageType {
    /// ISO 639-1 codes, e.g. "en".
    Iso,
    /// Provider-specific display names, e.g. "USA (English)".
    Custom,
}

/// A remote metadata catalog.
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Display name, also the identifier persisted in preferences.
    fn name(&self) -> &'static str;

    fn language_type(&self) -> LanguageType;

    /// The full set of languages (or stores) this provider accepts.
    fn languages(&self) -> Vec<String>;

    fn default_language(&self) -> String;

    /// Series names matching a query, for type-ahead completion.
    async fn search_tv_show_names(&self, series: &str, language: &str) -> Vec<String>;

    /// Episode-level TV search. `season`/`episode` narrow the result set
    /// when present.
    async fn search_tv_show(
        &self,
        series: &str,
        language: &str,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> Vec<MetadataResult>;

    /// Fill in the full record (cast, descriptions, artwork) for a TV
    /// search hit. Idempotent: a fully loaded result passes through
    /// unchanged.
    async fn load_tv_metadata(&self, result: MetadataResult, language: &str) -> MetadataResult;

    /// Partial-match movie search.
    async fn search_movie(&self, title: &str, language: &str) -> Vec<MetadataResult>;

    /// Fill in the full record for a movie search hit. Idempotent.
    async fn load_movie_metadata(&self, result: MetadataResult, language: &str) -> MetadataResult;
}

/// Providers that can search movies, in display order.
pub fn movie_providers() -> Vec<&'static str> {
    vec!["TheMovieDB", "iTunes Store", "Apple TV"]
}

/// Providers that can search TV shows, in display order.
pub fn tv_providers() -> Vec<&'static str> {
    vec!["TheTVDB", "TheMovieDB", "iTunes Store", "Apple TV"]
}

/// Resolve a provider by name. Unknown names fall back to TheMovieDB.
pub fn service(name: &str) -> Arc<dyn MetadataService> {
    match name {
        "TheTVDB" => Arc::new(tvdb::TheTvDb::new()),
        "iTunes Store" => Arc::new(itunes::ItunesStore::new()),
        "Apple TV" => Arc::new(appletv_v3::AppleTv::new()),
        _ => Arc::new(tmdb::TheMovieDb::new()),
    }
}

/// The provider selected in preferences for a media kind.
pub fn default_service(kind: MediaKind) -> Arc<dyn MetadataService> {
    let prefs = Prefs::shared();
    let name = prefs.metadata_provider(kind).unwrap_or_else(|| {
        match kind {
            MediaKind::Movie => "TheMovieDB",
            MediaKind::TvShow => "TheTVDB",
        }
        .to_string()
    });
    service(&name)
}

/// The language selected in preferences for a provider and media kind,
/// falling back to the provider's own default.
pub fn default_language(service: &dyn MetadataService, kind: MediaKind) -> String {
    Prefs::shared()
        .metadata_language(kind, service.name())
        .unwrap_or_else(|| service.default_language())
}
