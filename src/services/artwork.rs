//! Secondary artwork fan-out
//!
//! Primary providers query every secondary artwork source concurrently
//! when loading full metadata and block until all of them have
//! answered. Merge order is the source order, never completion order,
//! so display priority stays stable no matter which upstream is slow.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::media::result::{Artwork, ArtworkKind, MediaKind};
use crate::services::appletv::AppleTvArt;
use crate::services::itunes::ItunesStore;
use crate::services::squared_tv_art::SquaredTvArt;

/// What a primary provider already knows when it asks for more artwork.
#[derive(Debug, Clone)]
pub struct ArtworkQuery {
    pub title: String,
    pub kind: MediaKind,
    pub season: Option<u32>,
    pub tvdb_series_id: Option<u64>,
}

impl ArtworkQuery {
    pub fn movie(title: &str) -> Self {
        Self {
            title: title.to_string(),
            kind: MediaKind::Movie,
            season: None,
            tvdb_series_id: None,
        }
    }

    pub fn tv_show(title: &str, season: Option<u32>, tvdb_series_id: Option<u64>) -> Self {
        Self {
            title: title.to_string(),
            kind: MediaKind::TvShow,
            season,
            tvdb_series_id,
        }
    }
}

/// A catalog that can contribute artwork for an already-resolved title.
#[async_trait]
pub trait ArtworkSource: Send + Sync {
    async fn artwork(&self, query: &ArtworkQuery) -> Vec<Artwork>;
}

#[async_trait]
impl ArtworkSource for AppleTvArt {
    async fn artwork(&self, query: &ArtworkQuery) -> Vec<Artwork> {
        match query.kind {
            MediaKind::Movie => {
                self.search_artwork(&query.title, "US", ArtworkKind::Poster)
                    .await
            }
            MediaKind::TvShow => {
                let (mut artworks, wide, seasons) = tokio::join!(
                    self.search_artwork(&query.title, "US", ArtworkKind::Square),
                    self.search_wide_artwork(&query.title, "US"),
                    async {
                        match query.season {
                            Some(s) => self.search_seasons(&query.title, s, "US").await,
                            None => Vec::new(),
                        }
                    },
                );
                artworks.extend(wide);
                artworks.extend(seasons);
                artworks
            }
        }
    }
}

#[async_trait]
impl ArtworkSource for SquaredTvArt {
    async fn artwork(&self, query: &ArtworkQuery) -> Vec<Artwork> {
        match query.kind {
            // Square season art only exists for series.
            MediaKind::Movie => Vec::new(),
            MediaKind::TvShow => {
                self.search(&query.title, query.tvdb_series_id, query.season)
                    .await
            }
        }
    }
}

#[async_trait]
impl ArtworkSource for ItunesStore {
    async fn artwork(&self, query: &ArtworkQuery) -> Vec<Artwork> {
        self.search_artwork(&query.title, "USA (English)", query.season, query.kind)
            .await
    }
}

/// The standard source set, in merge order: Apple TV, then Squared TV
/// Art, then the iTunes Store.
pub fn default_sources() -> Vec<Arc<dyn ArtworkSource>> {
    vec![
        Arc::new(AppleTvArt::new()),
        Arc::new(SquaredTvArt::new()),
        Arc::new(ItunesStore::new()),
    ]
}

/// Query every source concurrently and concatenate the answers in
/// source order once the last one has finished.
pub async fn collect(sources: &[Arc<dyn ArtworkSource>], query: &ArtworkQuery) -> Vec<Artwork> {
    join_all(sources.iter().map(|source| source.artwork(query)))
        .await
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;

    struct SlowSource {
        delay: Duration,
        url: &'static str,
    }

    #[async_trait]
    impl ArtworkSource for SlowSource {
        async fn artwork(&self, _query: &ArtworkQuery) -> Vec<Artwork> {
            tokio::time::sleep(self.delay).await;
            let url = Url::parse(self.url).unwrap();
            vec![Artwork::new(
                url.clone(),
                url,
                "test",
                ArtworkKind::Poster,
            )]
        }
    }

    fn source(delay_ms: u64, url: &'static str) -> Arc<dyn ArtworkSource> {
        Arc::new(SlowSource {
            delay: Duration::from_millis(delay_ms),
            url,
        })
    }

    #[tokio::test]
    async fn test_collect_waits_for_every_source() {
        let sources = vec![
            source(40, "https://example.com/a.jpg"),
            source(5, "https://example.com/b.jpg"),
            source(80, "https://example.com/c.jpg"),
        ];
        let query = ArtworkQuery::tv_show("Some Show", Some(2), None);

        let collected = collect(&sources, &query).await;

        // All three answers are present, in source order, even though
        // the sources finished in a different order.
        let urls: Vec<&str> = collected.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/a.jpg",
                "https://example.com/b.jpg",
                "https://example.com/c.jpg",
            ]
        );
    }

    #[tokio::test]
    async fn test_collect_with_no_sources() {
        let query = ArtworkQuery::movie("Heat");
        assert!(collect(&[], &query).await.is_empty());
    }
}
