//! Multi-provider video metadata search and aggregation.
//!
//! Searches movie and TV show metadata across TheMovieDB, TheTVDB, the
//! iTunes Store and Apple TV, normalizes every provider's answers into a
//! single result model, enriches results with artwork from secondary
//! sources, and maps the merged result onto a flat tag collection ready
//! for writing into a media file.

pub mod config;
pub mod media;
pub mod services;

use thiserror::Error;

/// Fatal startup error: one of the JSON tables compiled into the crate
/// failed to decode. Everything else in this crate degrades to empty
/// results; a corrupt bundled table is a packaging bug and must abort.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bundled {name} table is corrupt: {source}")]
    Table {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Validate every bundled data table. Hosts should call this once at
/// startup and treat an error as fatal.
pub fn verify_bundled_tables() -> Result<(), ConfigError> {
    services::ratings::verify()?;
    services::itunes::verify_stores()?;
    services::appletv_v3::verify_storefronts()?;
    Ok(())
}

pub use media::chapter::{Chapter, ChapterResult};
pub use media::map::{MetadataResultMap, MetadataResultMapItem, TagItem, TagValue, Token};
pub use media::result::{Artwork, ArtworkKind, ArtworkSize, Key, MediaKind, MetadataResult, Value};
pub use services::chapterdb::{ChapterDb, ChapterSearch, ChapterService};
pub use services::metadata::{LanguageType, MetadataService};
pub use services::search::{MetadataNameSearch, MetadataSearch, SearchTask};
