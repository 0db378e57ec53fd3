//! External metadata service integrations
//!
//! Each provider module wraps one upstream API behind the shared
//! [`MetadataService`] trait (or, for chapters, [`ChapterService`]).
//! Network and decode failures inside a provider are absorbed and
//! surfaced as empty result sets so one broken upstream never takes the
//! whole search down.

pub mod appletv;
pub mod appletv_v3;
pub mod artwork;
pub mod chapterdb;
pub mod itunes;
pub mod logging;
pub mod metadata;
pub mod rate_limiter;
pub mod ratings;
pub mod search;
pub mod squared_tv_art;
pub mod text_utils;
pub mod tmdb;
pub mod tvdb;

pub use chapterdb::{ChapterDb, ChapterService};
pub use metadata::{LanguageType, MetadataService};
pub use rate_limiter::{RateLimitConfig, RateLimitedClient};
pub use search::{MetadataNameSearch, MetadataSearch, SearchTask};
