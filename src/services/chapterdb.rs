//! ChapterDB chapter search
//!
//! Base URL: https://chapterdb.plex.tv/chapters/
//!
//! The search endpoint answers XML summaries; chapter lists are then
//! fetched per set. Sets whose duration falls within 20 seconds of the
//! local file's win outright; otherwise sets whose last chapter still
//! fits inside the file are preferred. Non-monotonic chapter lists are
//! truncated at the first out-of-order marker.

use std::sync::Arc;

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::warn;

use crate::media::chapter::{Chapter, ChapterResult, monotonic_prefix};
use crate::services::rate_limiter::RateLimitedClient;
use crate::services::search::SearchTask;

const BASE_URL: &str = "https://chapterdb.plex.tv/chapters";
const API_KEY: &str = "7WXY7WRDFBT33L1UX7OO";

/// Durations within this of the file's are considered the same cut.
const DURATION_TOLERANCE_MS: u64 = 20_000;

/// A chapter database.
#[async_trait]
pub trait ChapterService: Send + Sync {
    /// Chapter sets matching a title, best match first. `duration_ms` is
    /// the local file's duration and drives the ranking.
    async fn search(&self, title: &str, duration_ms: u64) -> Vec<ChapterResult>;
}

/// Parse a "H:MM:SS.mmm" timestamp into milliseconds.
fn parse_timestamp_ms(raw: &str) -> Option<u64> {
    let mut parts = raw.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds_part = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let (seconds, millis) = match seconds_part.split_once('.') {
        Some((s, ms)) => {
            let ms_padded = format!("{ms:0<3}");
            (s.parse::<u64>().ok()?, ms_padded.get(..3)?.parse::<u64>().ok()?)
        }
        None => (seconds_part.parse::<u64>().ok()?, 0),
    };

    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

/// Parse every `chapterInfo` element from a search or detail document.
/// Namespaces vary between endpoints, so matching is by local name.
fn parse_chapter_infos(xml: &str) -> Vec<ChapterResult> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut results = Vec::new();
    let mut current: Option<ChapterResult> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "chapterInfo" {
                    let mut result = ChapterResult {
                        title: String::new(),
                        duration_ms: 0,
                        id: 0,
                        confirmations: 0,
                        chapters: Vec::new(),
                    };
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"confirmations" {
                            if let Ok(value) = attr.unescape_value() {
                                result.confirmations = value.parse().unwrap_or(0);
                            }
                        }
                    }
                    current = Some(result);
                }
                path.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"chapter" {
                    if let Some(result) = current.as_mut() {
                        let mut time_ms = None;
                        let mut name = String::new();
                        for attr in e.attributes().flatten() {
                            let Ok(value) = attr.unescape_value() else {
                                continue;
                            };
                            match attr.key.local_name().as_ref() {
                                b"time" => time_ms = parse_timestamp_ms(&value),
                                b"name" => name = value.to_string(),
                                _ => {}
                            }
                        }
                        if let Some(time_ms) = time_ms {
                            result.chapters.push(Chapter::new(name, time_ms));
                        }
                    }
                }
            }
            Ok(Event::Text(ref t)) => {
                let Some(result) = current.as_mut() else {
                    continue;
                };
                let Ok(text) = t.unescape() else { continue };
                let text = text.trim();
                match path.last().map(String::as_str) {
                    // Direct child of chapterInfo only; chapters also
                    // carry their own nested titles on some sets.
                    Some("title") if path.ends_with(&["chapterInfo".into(), "title".into()]) => {
                        result.title = text.to_string();
                    }
                    Some("chapterSetId") => {
                        result.id = text.parse().unwrap_or(0);
                    }
                    Some("duration") => {
                        if let Some(ms) = parse_timestamp_ms(text) {
                            result.duration_ms = ms;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                if e.local_name().as_ref() == b"chapterInfo" {
                    if let Some(mut result) = current.take() {
                        result.chapters = monotonic_prefix(result.chapters);
                        results.push(result);
                    }
                }
                path.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Failed to parse ChapterDB XML");
                break;
            }
        }
    }

    results
}

/// Pick the best tier of candidates: sets whose total duration is within
/// the tolerance of the file's, else sets whose last chapter still fits
/// inside the file, else everything as-is.
fn rank(results: Vec<ChapterResult>, duration_ms: u64) -> Vec<ChapterResult> {
    let mut matching: Vec<ChapterResult> = results
        .iter()
        .filter(|r| r.duration_ms.abs_diff(duration_ms) <= DURATION_TOLERANCE_MS)
        .cloned()
        .collect();
    if !matching.is_empty() {
        matching.sort_by_key(|r| {
            (
                std::cmp::Reverse(r.confirmations),
                r.duration_ms.abs_diff(duration_ms),
            )
        });
        return matching;
    }

    let mut fitting: Vec<ChapterResult> = results
        .iter()
        .filter(|r| {
            r.chapters
                .last()
                .is_some_and(|c| c.timestamp_ms < duration_ms)
        })
        .cloned()
        .collect();
    if !fitting.is_empty() {
        fitting.sort_by_key(|r| std::cmp::Reverse(r.confirmations));
        return fitting;
    }

    results
}

pub struct ChapterDb {
    client: RateLimitedClient,
}

impl Default for ChapterDb {
    fn default() -> Self {
        Self::new()
    }
}

impl ChapterDb {
    pub fn new() -> Self {
        Self {
            client: RateLimitedClient::for_chapterdb(),
        }
    }

    async fn get_xml(&self, url: &str, query: &[(&str, String)]) -> Option<String> {
        let headers = [("ApiKey", API_KEY)];
        let response = match self
            .client
            .get_with_headers_and_query(url, &headers, query)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "ChapterDB request failed");
                return None;
            }
        };
        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to read ChapterDB response");
                None
            }
        }
    }
}

#[async_trait]
impl ChapterService for ChapterDb {
    async fn search(&self, title: &str, duration_ms: u64) -> Vec<ChapterResult> {
        let url = format!("{BASE_URL}/search");
        let query = [("title", title.to_string())];
        let Some(body) = self.get_xml(&url, &query).await else {
            return Vec::new();
        };

        let mut results = parse_chapter_infos(&body);

        // Search summaries may omit the chapter lists.
        for result in results.iter_mut() {
            if !result.chapters.is_empty() || result.id == 0 {
                continue;
            }
            let detail_url = format!("{BASE_URL}/{}", result.id);
            if let Some(detail) = self.get_xml(&detail_url, &[]).await {
                if let Some(full) = parse_chapter_infos(&detail).into_iter().next() {
                    result.chapters = full.chapters;
                    if result.duration_ms == 0 {
                        result.duration_ms = full.duration_ms;
                    }
                }
            }
        }

        results.retain(|r| !r.chapters.is_empty());
        rank(results, duration_ms)
    }
}

/// A chapter search bound to one database.
#[derive(Clone)]
pub struct ChapterSearch {
    pub service: Arc<dyn ChapterService>,
    pub title: String,
    pub duration_ms: u64,
}

impl ChapterSearch {
    pub fn new(service: Arc<dyn ChapterService>, title: &str, duration_ms: u64) -> Self {
        Self {
            service,
            title: title.to_string(),
            duration_ms,
        }
    }

    pub fn run(
        &self,
        completion: impl FnOnce(Vec<ChapterResult>) + Send + 'static,
    ) -> SearchTask<Vec<ChapterResult>> {
        let search = self.clone();
        SearchTask::spawn(
            async move { search.service.search(&search.title, search.duration_ms).await },
            completion,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<results xmlns="http://jvance.com/2008/ChapterGrabber">
  <chapterInfo version="3" confirmations="4">
    <title>Some Movie</title>
    <ref><chapterSetId>1234</chapterSetId></ref>
    <source><duration>1:51:11.360</duration></source>
    <chapters>
      <chapter time="0:00:00.000" name="Opening"/>
      <chapter time="0:10:30.500" name="The Heist"/>
      <chapter time="0:05:00.000" name="Out of Order"/>
    </chapters>
  </chapterInfo>
  <chapterInfo version="3" confirmations="0">
    <title>Some Movie (Director's Cut)</title>
    <ref><chapterSetId>5678</chapterSetId></ref>
    <source><duration>2:05:00.000</duration></source>
    <chapters>
      <chapter time="0:00:00.000" name="Start"/>
    </chapters>
  </chapterInfo>
</results>"#;

    #[test]
    fn test_parse_timestamp_ms() {
        assert_eq!(parse_timestamp_ms("1:51:11.360"), Some(6_671_360));
        assert_eq!(parse_timestamp_ms("0:00:00.000"), Some(0));
        assert_eq!(parse_timestamp_ms("0:01:00"), Some(60_000));
        assert_eq!(parse_timestamp_ms("garbage"), None);
    }

    #[test]
    fn test_parse_chapter_infos() {
        let results = parse_chapter_infos(SEARCH_XML);
        assert_eq!(results.len(), 2);

        let first = &results[0];
        assert_eq!(first.title, "Some Movie");
        assert_eq!(first.id, 1234);
        assert_eq!(first.confirmations, 4);
        assert_eq!(first.duration_ms, 6_671_360);
        // The out-of-order marker and everything after it is dropped.
        assert_eq!(first.chapters.len(), 2);
        assert_eq!(first.chapters[1].name, "The Heist");
        assert_eq!(first.chapters[1].timestamp_ms, 630_500);
    }

    fn set(title: &str, duration_ms: u64, confirmations: u64, last_ms: Option<u64>) -> ChapterResult {
        ChapterResult {
            title: title.to_string(),
            duration_ms,
            id: 0,
            confirmations,
            chapters: last_ms
                .map(|ms| vec![Chapter::new("Start", 0), Chapter::new("End", ms)])
                .unwrap_or_default(),
        }
    }

    #[test]
    fn test_rank_returns_tolerance_matches_alone() {
        let results = vec![
            set("far", 7_200_000, 10, Some(7_100_000)),
            set("close", 6_675_000, 0, Some(6_500_000)),
        ];
        let ranked = rank(results, 6_671_360);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].title, "close");
    }

    #[test]
    fn test_rank_breaks_ties_by_confirmations() {
        let results = vec![
            set("unconfirmed", 6_671_000, 0, None),
            set("confirmed", 6_672_000, 5, None),
        ];
        let ranked = rank(results, 6_671_360);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].title, "confirmed");
    }

    #[test]
    fn test_rank_falls_back_to_fitting_chapter_lists() {
        let results = vec![
            set("overruns", 9_000_000, 3, Some(8_000_000)),
            set("fits", 3_600_000, 1, Some(3_500_000)),
        ];
        let ranked = rank(results, 6_671_360);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].title, "fits");
    }

    #[test]
    fn test_rank_without_any_match_keeps_everything() {
        let results = vec![
            set("a", 9_000_000, 0, Some(8_000_000)),
            set("b", 8_000_000, 0, Some(7_500_000)),
        ];
        let ranked = rank(results, 6_671_360);
        assert_eq!(ranked.len(), 2);
    }
}
