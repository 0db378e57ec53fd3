//! Template-based mapping of results onto tag collections
//!
//! A mapping table turns a [`MetadataResult`] into a flat list of tag
//! items keyed by the container's atom identifiers. Each tag value is a
//! sequence of tokens: placeholders that expand to result fields, and
//! literal separators. Users can edit the table, so it round-trips
//! through the preference store.

use serde::{Deserialize, Serialize};

use super::result::{Key, MediaKind, MetadataResult, Value};

/// Tag atom identifiers understood by the downstream file writer.
pub mod tag_id {
    pub const NAME: &str = "Name";
    pub const ARTIST: &str = "Artist";
    pub const ALBUM_ARTIST: &str = "Album Artist";
    pub const ALBUM: &str = "Album";
    pub const COMPOSER: &str = "Composer";
    pub const GENRE: &str = "Genre";
    pub const RELEASE_DATE: &str = "Release Date";
    pub const TRACK_NUMBER: &str = "Track #";
    pub const DISK_NUMBER: &str = "Disk #";
    pub const TV_SHOW: &str = "TV Show";
    pub const TV_EPISODE_NUMBER: &str = "TV Episode #";
    pub const TV_NETWORK: &str = "TV Network";
    pub const TV_EPISODE_ID: &str = "TV Episode ID";
    pub const TV_SEASON: &str = "TV Season";
    pub const DESCRIPTION: &str = "Description";
    pub const LONG_DESCRIPTION: &str = "Long Description";
    pub const SERIES_DESCRIPTION: &str = "Series Description";
    pub const RATING: &str = "Rating";
    pub const STUDIO: &str = "Studio";
    pub const CAST: &str = "Cast";
    pub const DIRECTOR: &str = "Director";
    pub const PRODUCERS: &str = "Producers";
    pub const SCREENWRITERS: &str = "Screenwriters";
    pub const EXEC_PRODUCER: &str = "Executive Producer";
    pub const COPYRIGHT: &str = "Copyright";
    pub const CONTENT_ID: &str = "contentID";
    pub const ARTIST_ID: &str = "artistID";
    pub const PLAYLIST_ID: &str = "playlistID";
    pub const ACCOUNT_COUNTRY: &str = "iTunes Account Country";
    pub const MEDIA_KIND: &str = "Media Kind";
    pub const CONTENT_RATING: &str = "Content Rating";
    pub const COVER_ART: &str = "Cover Art";
}

/// Case transform applied to an expanded token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenCase {
    #[default]
    None,
    Capitalize,
    Lower,
    Upper,
    Camel,
    Snake,
    Train,
    Dot,
}

/// Numeric padding applied to an expanded token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPadding {
    #[default]
    None,
    LeadingZero,
}

/// One component of a tag value template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub is_placeholder: bool,
    #[serde(default)]
    pub case: TokenCase,
    #[serde(default)]
    pub padding: TokenPadding,
}

impl Token {
    pub fn placeholder(key: Key) -> Self {
        Self {
            text: key.placeholder().to_string(),
            is_placeholder: true,
            case: TokenCase::None,
            padding: TokenPadding::None,
        }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_placeholder: false,
            case: TokenCase::None,
            padding: TokenPadding::None,
        }
    }

    /// Apply the token's case and padding transforms to an expanded value.
    pub fn format(&self, text: &str) -> String {
        let formatted = match self.case {
            TokenCase::None => text.to_string(),
            TokenCase::Capitalize => text
                .split(' ')
                .map(capitalize_first)
                .collect::<Vec<_>>()
                .join(" "),
            TokenCase::Lower => text.to_lowercase(),
            TokenCase::Upper => text.to_uppercase(),
            TokenCase::Camel => text
                .split(' ')
                .map(|w| capitalize_first(&w.to_lowercase()))
                .collect(),
            TokenCase::Snake => text.to_lowercase().split(' ').collect::<Vec<_>>().join("_"),
            TokenCase::Train => text.to_lowercase().split(' ').collect::<Vec<_>>().join("-"),
            TokenCase::Dot => text.to_lowercase().split(' ').collect::<Vec<_>>().join("."),
        };

        match self.padding {
            TokenPadding::None => formatted,
            TokenPadding::LeadingZero => match formatted.parse::<i64>() {
                Ok(n) => format!("{n:02}"),
                Err(_) => formatted,
            },
        }
    }
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// One row of the mapping table: a tag identifier and its value template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataResultMapItem {
    pub key: String,
    pub tokens: Vec<Token>,
}

impl MetadataResultMapItem {
    pub fn new(key: &str, tokens: Vec<Token>) -> Self {
        Self {
            key: key.to_string(),
            tokens,
        }
    }

    fn single(key: &str, result_key: Key) -> Self {
        Self::new(key, vec![Token::placeholder(result_key)])
    }
}

/// The full mapping table for one media kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataResultMap {
    pub items: Vec<MetadataResultMapItem>,
    pub kind: MediaKind,
}

impl MetadataResultMap {
    pub fn movie_default() -> Self {
        let items = vec![
            MetadataResultMapItem::single(tag_id::NAME, Key::Name),
            MetadataResultMapItem::single(tag_id::ARTIST, Key::Director),
            MetadataResultMapItem::single(tag_id::COMPOSER, Key::Composer),
            MetadataResultMapItem::single(tag_id::GENRE, Key::Genre),
            MetadataResultMapItem::single(tag_id::RELEASE_DATE, Key::ReleaseDate),
            MetadataResultMapItem::single(tag_id::DESCRIPTION, Key::Description),
            MetadataResultMapItem::single(tag_id::LONG_DESCRIPTION, Key::LongDescription),
            MetadataResultMapItem::single(tag_id::RATING, Key::Rating),
            MetadataResultMapItem::single(tag_id::STUDIO, Key::Studio),
            MetadataResultMapItem::single(tag_id::CAST, Key::Cast),
            MetadataResultMapItem::single(tag_id::DIRECTOR, Key::Director),
            MetadataResultMapItem::single(tag_id::PRODUCERS, Key::Producers),
            MetadataResultMapItem::single(tag_id::SCREENWRITERS, Key::Screenwriters),
            MetadataResultMapItem::single(tag_id::COPYRIGHT, Key::Copyright),
            MetadataResultMapItem::single(tag_id::CONTENT_ID, Key::ContentId),
            MetadataResultMapItem::single(tag_id::ACCOUNT_COUNTRY, Key::ItunesCountry),
            MetadataResultMapItem::single(tag_id::EXEC_PRODUCER, Key::ExecutiveProducer),
        ];
        Self {
            items,
            kind: MediaKind::Movie,
        }
    }

    pub fn tv_show_default() -> Self {
        let items = vec![
            MetadataResultMapItem::single(tag_id::NAME, Key::Name),
            MetadataResultMapItem::single(tag_id::ARTIST, Key::SeriesName),
            MetadataResultMapItem::single(tag_id::ALBUM_ARTIST, Key::SeriesName),
            MetadataResultMapItem::new(
                tag_id::ALBUM,
                vec![
                    Token::placeholder(Key::SeriesName),
                    Token::literal(", Season "),
                    Token::placeholder(Key::Season),
                ],
            ),
            MetadataResultMapItem::single(tag_id::COMPOSER, Key::Composer),
            MetadataResultMapItem::single(tag_id::GENRE, Key::Genre),
            MetadataResultMapItem::single(tag_id::RELEASE_DATE, Key::ReleaseDate),
            MetadataResultMapItem::single(tag_id::TRACK_NUMBER, Key::TrackNumber),
            MetadataResultMapItem::single(tag_id::DISK_NUMBER, Key::DiskNumber),
            MetadataResultMapItem::single(tag_id::TV_SHOW, Key::SeriesName),
            MetadataResultMapItem::single(tag_id::TV_EPISODE_NUMBER, Key::EpisodeNumber),
            MetadataResultMapItem::single(tag_id::TV_NETWORK, Key::Network),
            MetadataResultMapItem::single(tag_id::TV_EPISODE_ID, Key::EpisodeId),
            MetadataResultMapItem::single(tag_id::TV_SEASON, Key::Season),
            MetadataResultMapItem::single(tag_id::DESCRIPTION, Key::Description),
            MetadataResultMapItem::single(tag_id::LONG_DESCRIPTION, Key::LongDescription),
            MetadataResultMapItem::single(tag_id::SERIES_DESCRIPTION, Key::SeriesDescription),
            MetadataResultMapItem::single(tag_id::RATING, Key::Rating),
            MetadataResultMapItem::single(tag_id::STUDIO, Key::Studio),
            MetadataResultMapItem::single(tag_id::CAST, Key::Cast),
            MetadataResultMapItem::single(tag_id::DIRECTOR, Key::Director),
            MetadataResultMapItem::single(tag_id::PRODUCERS, Key::Producers),
            MetadataResultMapItem::single(tag_id::SCREENWRITERS, Key::Screenwriters),
            MetadataResultMapItem::single(tag_id::EXEC_PRODUCER, Key::ExecutiveProducer),
            MetadataResultMapItem::single(tag_id::COPYRIGHT, Key::Copyright),
            MetadataResultMapItem::single(tag_id::CONTENT_ID, Key::ContentId),
            MetadataResultMapItem::single(tag_id::ARTIST_ID, Key::ArtistId),
            MetadataResultMapItem::single(tag_id::PLAYLIST_ID, Key::PlaylistId),
            MetadataResultMapItem::single(tag_id::ACCOUNT_COUNTRY, Key::ItunesCountry),
        ];
        Self {
            items,
            kind: MediaKind::TvShow,
        }
    }

    pub fn default_for(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Movie => Self::movie_default(),
            MediaKind::TvShow => Self::tv_show_default(),
        }
    }
}

/// A tag value ready for the file writer.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Text(String),
    Integer(i64),
    Image(Vec<u8>),
}

/// A tag identifier/value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TagItem {
    pub identifier: String,
    pub value: TagValue,
}

/// Hard iTunes limit on the short description atom.
const SHORT_DESCRIPTION_BUDGET: usize = 254;

/// Truncate to a word boundary within the budget and terminate with an
/// ellipsis. Text already within budget + 1 passes through untouched.
pub fn truncated_description(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= SHORT_DESCRIPTION_BUDGET + 1 {
        return text.to_string();
    }

    let prefix: String = chars[..SHORT_DESCRIPTION_BUDGET].iter().collect();
    let cut = match prefix.rfind(char::is_whitespace) {
        Some(pos) => prefix[..pos].trim_end().to_string(),
        None => prefix,
    };
    format!("{cut}…")
}

impl MetadataResult {
    /// Expand a mapping table against this result.
    ///
    /// Empty expansions are skipped unless `keep_empty_keys` is set. The
    /// media kind is always emitted; the content rating only when set.
    /// A missing short description falls back to a truncated long
    /// description.
    pub fn mapped_tags(&self, map: &MetadataResultMap, keep_empty_keys: bool) -> Vec<TagItem> {
        let mut tags = Vec::with_capacity(map.items.len() + self.artworks.len() + 2);

        for item in &map.items {
            let mut expanded = String::new();
            for token in &item.tokens {
                if token.is_placeholder {
                    if let Some(key) = Key::from_placeholder(&token.text) {
                        match self.get(key) {
                            Some(value) => expanded.push_str(&token.format(&value.to_string())),
                            None => {
                                if key == Key::Description {
                                    if let Some(Value::Text(long)) = self.get(Key::LongDescription)
                                    {
                                        expanded
                                            .push_str(&token.format(&truncated_description(long)));
                                    }
                                }
                            }
                        }
                    }
                } else {
                    expanded.push_str(&token.format(&token.text));
                }
            }

            if !expanded.is_empty() || keep_empty_keys {
                tags.push(TagItem {
                    identifier: item.key.clone(),
                    value: TagValue::Text(expanded),
                });
            }
        }

        for artwork in &self.artworks {
            tags.push(TagItem {
                identifier: tag_id::COVER_ART.to_string(),
                value: TagValue::Image(artwork.clone()),
            });
        }

        tags.push(TagItem {
            identifier: tag_id::MEDIA_KIND.to_string(),
            value: TagValue::Integer(self.media_kind.tag_value()),
        });

        if self.content_rating > 0 || keep_empty_keys {
            tags.push(TagItem {
                identifier: tag_id::CONTENT_RATING.to_string(),
                value: TagValue::Integer(self.content_rating),
            });
        }

        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tv_result() -> MetadataResult {
        let mut result = MetadataResult::new(MediaKind::TvShow);
        result.set(Key::SeriesName, "Foo");
        result.set(Key::Season, 2i64);
        result.set(Key::Name, "The One With the Test");
        result
    }

    fn find<'a>(tags: &'a [TagItem], id: &str) -> Option<&'a TagItem> {
        tags.iter().find(|t| t.identifier == id)
    }

    #[test]
    fn test_album_token_expansion() {
        let tags = tv_result().mapped_tags(&MetadataResultMap::tv_show_default(), false);
        let album = find(&tags, tag_id::ALBUM).unwrap();
        assert_eq!(album.value, TagValue::Text("Foo, Season 2".to_string()));
    }

    #[test]
    fn test_missing_fields_are_skipped() {
        let tags = tv_result().mapped_tags(&MetadataResultMap::tv_show_default(), false);
        assert!(find(&tags, tag_id::TV_NETWORK).is_none());
    }

    #[test]
    fn test_keep_empty_keys() {
        let tags = tv_result().mapped_tags(&MetadataResultMap::tv_show_default(), true);
        let network = find(&tags, tag_id::TV_NETWORK).unwrap();
        assert_eq!(network.value, TagValue::Text(String::new()));
    }

    #[test]
    fn test_media_kind_always_emitted() {
        let tags = tv_result().mapped_tags(&MetadataResultMap::tv_show_default(), false);
        let kind = find(&tags, tag_id::MEDIA_KIND).unwrap();
        assert_eq!(kind.value, TagValue::Integer(10));
        assert!(find(&tags, tag_id::CONTENT_RATING).is_none());
    }

    #[test]
    fn test_content_rating_emitted_when_set() {
        let mut result = tv_result();
        result.content_rating = 4;
        let tags = result.mapped_tags(&MetadataResultMap::tv_show_default(), false);
        let rating = find(&tags, tag_id::CONTENT_RATING).unwrap();
        assert_eq!(rating.value, TagValue::Integer(4));
    }

    #[test]
    fn test_short_description_fallback() {
        let long: String = "word ".repeat(100);
        let mut result = MetadataResult::new(MediaKind::Movie);
        result.set(Key::Name, "A Movie");
        result.set(Key::LongDescription, long.trim_end());

        let tags = result.mapped_tags(&MetadataResultMap::movie_default(), false);
        let desc = find(&tags, tag_id::DESCRIPTION).unwrap();
        let TagValue::Text(text) = &desc.value else {
            panic!("expected text")
        };
        assert!(text.chars().count() <= 255);
        assert!(text.ends_with('…'));
        // Cut falls on a word boundary.
        assert!(!text.trim_end_matches('…').ends_with(' '));
        assert!(text.trim_end_matches('…').ends_with("word"));
    }

    #[test]
    fn test_short_description_passthrough() {
        assert_eq!(truncated_description("short"), "short");
        let exactly = "a".repeat(255);
        assert_eq!(truncated_description(&exactly), exactly);
    }

    #[test]
    fn test_token_cases() {
        let mut token = Token::literal("Some Show Name");
        token.case = TokenCase::Snake;
        assert_eq!(token.format("Some Show Name"), "some_show_name");
        token.case = TokenCase::Dot;
        assert_eq!(token.format("Some Show Name"), "some.show.name");
        token.case = TokenCase::Camel;
        assert_eq!(token.format("some show name"), "SomeShowName");
        token.case = TokenCase::Train;
        assert_eq!(token.format("Some Show Name"), "some-show-name");
    }

    #[test]
    fn test_token_padding() {
        let mut token = Token::placeholder(Key::EpisodeNumber);
        token.padding = TokenPadding::LeadingZero;
        assert_eq!(token.format("3"), "03");
        assert_eq!(token.format("12"), "12");
        assert_eq!(token.format("not a number"), "not a number");
    }

    #[test]
    fn test_map_roundtrips_through_json() {
        let map = MetadataResultMap::tv_show_default();
        let json = serde_json::to_string(&map).unwrap();
        let back: MetadataResultMap = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }
}
