//! Result model, tag mapping and chapter types

pub mod chapter;
pub mod map;
pub mod result;

pub use chapter::{Chapter, ChapterResult};
pub use map::{MetadataResultMap, MetadataResultMapItem, TagItem, TagValue, Token};
pub use result::{Artwork, ArtworkKind, ArtworkSize, Key, MediaKind, MetadataResult, Value};
