//! Integration tests for the search layer
//!
//! These tests verify the provider-independent behavior:
//! - Completion delivery and cancellation of search tasks
//! - Name search union across the selected and default languages
//! - Idempotence of the metadata load operations

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use async_trait::async_trait;
use vidmeta::services::metadata::{LanguageType, MetadataService};
use vidmeta::services::search::{MetadataNameSearch, MetadataSearch};
use vidmeta::{Key, MediaKind, MetadataResult};

/// A provider with canned answers and call counters.
struct FakeService {
    name_searches: AtomicUsize,
    search_delay: Duration,
}

impl FakeService {
    fn new() -> Self {
        Self {
            name_searches: AtomicUsize::new(0),
            search_delay: Duration::ZERO,
        }
    }

    fn slow() -> Self {
        Self {
            name_searches: AtomicUsize::new(0),
            search_delay: Duration::from_millis(50),
        }
    }
}

#[async_trait]
impl MetadataService for FakeService {
    fn name(&self) -> &'static str {
        "Fake"
    }

    fn language_type(&self) -> LanguageType {
        LanguageType::Iso
    }

    fn languages(&self) -> Vec<String> {
        vec!["en".to_string(), "fr".to_string()]
    }

    fn default_language(&self) -> String {
        "en".to_string()
    }

    async fn search_tv_show_names(&self, _series: &str, language: &str) -> Vec<String> {
        self.name_searches.fetch_add(1, Ordering::SeqCst);
        match language {
            "fr" => vec!["Docteur Qui".to_string(), "Doctor Who".to_string()],
            _ => vec!["Doctor Who".to_string(), "Doctor Who (2005)".to_string()],
        }
    }

    async fn search_tv_show(
        &self,
        series: &str,
        _language: &str,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> Vec<MetadataResult> {
        tokio::time::sleep(self.search_delay).await;
        let mut result = MetadataResult::new(MediaKind::TvShow);
        result.set(Key::SeriesName, series);
        result.set_opt(Key::Season, season.map(i64::from));
        result.set_opt(Key::EpisodeNumber, episode.map(i64::from));
        vec![result]
    }

    async fn load_tv_metadata(&self, mut result: MetadataResult, _language: &str) -> MetadataResult {
        if result.loaded {
            return result;
        }
        result.set(Key::SeriesDescription, "A long-running show.");
        result.loaded = true;
        result
    }

    async fn search_movie(&self, title: &str, _language: &str) -> Vec<MetadataResult> {
        tokio::time::sleep(self.search_delay).await;
        let mut result = MetadataResult::new(MediaKind::Movie);
        result.set(Key::Name, title);
        vec![result]
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

#[tokio::test]
async fn test_movie_search_delivers_results() {
    let service: Arc<dyn MetadataService> = Arc::new(FakeService::new());
    let search = MetadataSearch::movie(service, "Heat", "en");

    let (tx, rx) = mpsc::channel();
    let task = search.run(move |results| {
        let _ = tx.send(results);
    });
    task.wait().await;

    let results = rx.try_recv().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text(Key::Name), Some("Heat"));
    assert_eq!(search.media_kind(), MediaKind::Movie);
}

#[tokio::test]
async fn test_tv_search_passes_season_and_episode() {
    let service: Arc<dyn MetadataService> = Arc::new(FakeService::new());
    let search = MetadataSearch::tv_show(service, "Doctor Who", Some(2), Some(3), "en");

    let (tx, rx) = mpsc::channel();
    let task = search.run(move |results| {
        let _ = tx.send(results);
    });
    task.wait().await;

    let results = rx.try_recv().unwrap();
    assert_eq!(results[0].integer(Key::Season), Some(2));
    assert_eq!(results[0].integer(Key::EpisodeNumber), Some(3));
}

#[tokio::test]
async fn test_cancelled_search_never_calls_completion() {
    let service: Arc<dyn MetadataService> = Arc::new(FakeService::slow());
    let search = MetadataSearch::movie(service, "Heat", "en");

    let (tx, rx) = mpsc::channel::<Vec<MetadataResult>>();
    let task = search.run(move |results| {
        let _ = tx.send(results);
    });
    task.cancel();
    task.wait().await;

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_name_search_unions_selected_and_default_language() {
    let service = Arc::new(FakeService::new());
    let search = MetadataNameSearch::tv_series(service.clone(), "doctor", "fr");

    let (tx, rx) = mpsc::channel();
    let task = search.run(move |names| {
        let _ = tx.send(names);
    });
    task.wait().await;

    let names = rx.try_recv().unwrap();
    // French answers first, then the English-only extras, no duplicates.
    assert_eq!(
        names,
        vec![
            "Docteur Qui".to_string(),
            "Doctor Who".to_string(),
            "Doctor Who (2005)".to_string(),
        ]
    );
    assert_eq!(service.name_searches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_name_search_in_default_language_queries_once() {
    let service = Arc::new(FakeService::new());
    let search = MetadataNameSearch::tv_series(service.clone(), "doctor", "en");

    let (tx, rx) = mpsc::channel();
    let task = search.run(move |names| {
        let _ = tx.send(names);
    });
    task.wait().await;

    assert_eq!(rx.try_recv().unwrap().len(), 2);
    assert_eq!(service.name_searches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_load_additional_is_idempotent() {
    let service: Arc<dyn MetadataService> = Arc::new(FakeService::new());
    let search = MetadataSearch::tv_show(service.clone(), "Doctor Who", Some(1), None, "en");

    let mut result = MetadataResult::new(MediaKind::TvShow);
    result.set(Key::SeriesName, "Doctor Who");

    let loaded = service.load_tv_metadata(result, "en").await;
    assert!(loaded.loaded);
    assert_eq!(
        loaded.text(Key::SeriesDescription),
        Some("A long-running show.")
    );

    let mut tampered = loaded.clone();
    tampered.remove(Key::SeriesDescription);
    // A loaded result passes through unchanged, even via the task API.
    let (tx, rx) = mpsc::channel();
    let task = search.load_additional(tampered.clone(), move |r| {
        let _ = tx.send(r);
    });
    task.wait().await;

    let reloaded = rx.try_recv().unwrap();
    assert_eq!(reloaded, tampered);
}
