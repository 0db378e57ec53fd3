//! Normalized metadata result model
//!
//! Every provider adapter maps its wire format onto `MetadataResult`: a
//! closed set of semantic keys with discriminated values, plus remote
//! artwork references. Display ordering of keys is fixed per media kind.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

/// Media kind of a result. Written as the iTunes "stik" values
/// (9 = movie, 10 = TV show).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    TvShow,
}

impl MediaKind {
    pub fn tag_value(self) -> i64 {
        match self {
            MediaKind::Movie => 9,
            MediaKind::TvShow => 10,
        }
    }

    /// Label used by the ratings table.
    pub fn ratings_label(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::TvShow => "TV",
        }
    }

    pub(crate) fn pref_key(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::TvShow => "tv",
        }
    }
}

/// A metadata field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Date(NaiveDate),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// The closed set of semantic metadata fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Name,
    Composer,
    Genre,
    ReleaseDate,
    Description,
    LongDescription,
    Rating,
    Studio,
    Cast,
    Director,
    Producers,
    Screenwriters,
    ExecutiveProducer,
    Copyright,

    // iTunes keys
    ContentId,
    ArtistId,
    PlaylistId,
    ItunesCountry,
    ItunesUrl,

    // TV show keys
    SeriesName,
    SeriesDescription,
    TrackNumber,
    DiskNumber,
    EpisodeNumber,
    EpisodeId,
    Season,
    Network,

    // Provider-internal identifiers, never shown to the user
    ServiceContentId,
    ServiceAdditionalContentId,
    ServiceEpisodeId,
}

/// Key display order for movie results.
const MOVIE_KEYS: &[Key] = &[
    Key::Name,
    Key::Composer,
    Key::Genre,
    Key::ReleaseDate,
    Key::Description,
    Key::LongDescription,
    Key::Rating,
    Key::Studio,
    Key::Cast,
    Key::Director,
    Key::Producers,
    Key::Screenwriters,
    Key::ExecutiveProducer,
    Key::Copyright,
    Key::ContentId,
    Key::ArtistId,
];

/// Key display order for TV show results.
const TV_SHOW_KEYS: &[Key] = &[
    Key::Name,
    Key::SeriesName,
    Key::Composer,
    Key::Genre,
    Key::ReleaseDate,
    Key::TrackNumber,
    Key::DiskNumber,
    Key::EpisodeNumber,
    Key::Network,
    Key::EpisodeId,
    Key::Season,
    Key::Description,
    Key::LongDescription,
    Key::SeriesDescription,
    Key::Rating,
    Key::Studio,
    Key::Cast,
    Key::Director,
    Key::Producers,
    Key::Screenwriters,
    Key::ExecutiveProducer,
    Key::Copyright,
    Key::ContentId,
    Key::ArtistId,
    Key::PlaylistId,
    Key::ItunesCountry,
];

impl Key {
    /// Placeholder string used in mapping templates.
    pub fn placeholder(self) -> &'static str {
        match self {
            Key::Name => "{Name}",
            Key::Composer => "{Composer}",
            Key::Genre => "{Genre}",
            Key::ReleaseDate => "{Release Date}",
            Key::Description => "{Description}",
            Key::LongDescription => "{Long Description}",
            Key::Rating => "{Rating}",
            Key::Studio => "{Studio}",
            Key::Cast => "{Cast}",
            Key::Director => "{Director}",
            Key::Producers => "{Producers}",
            Key::Screenwriters => "{Screenwriters}",
            Key::ExecutiveProducer => "{Executive Producer}",
            Key::Copyright => "{Copyright}",
            Key::ContentId => "{contentID}",
            Key::ArtistId => "{artistID}",
            Key::PlaylistId => "{playlistID}",
            Key::ItunesCountry => "{iTunes Country}",
            Key::ItunesUrl => "{iTunes URL}",
            Key::SeriesName => "{Series Name}",
            Key::SeriesDescription => "{Series Description}",
            Key::TrackNumber => "{Track #}",
            Key::DiskNumber => "{Disk #}",
            Key::EpisodeNumber => "{Episode #}",
            Key::EpisodeId => "{Episode ID}",
            Key::Season => "{Season}",
            Key::Network => "{Network}",
            Key::ServiceContentId => "ServiceContentID",
            Key::ServiceAdditionalContentId => "ServiceAdditionalContentID",
            Key::ServiceEpisodeId => "ServiceEpisodeID",
        }
    }

    /// Reverse of [`Key::placeholder`].
    pub fn from_placeholder(text: &str) -> Option<Key> {
        const ALL: &[Key] = &[
            Key::Name,
            Key::Composer,
            Key::Genre,
            Key::ReleaseDate,
            Key::Description,
            Key::LongDescription,
            Key::Rating,
            Key::Studio,
            Key::Cast,
            Key::Director,
            Key::Producers,
            Key::Screenwriters,
            Key::ExecutiveProducer,
            Key::Copyright,
            Key::ContentId,
            Key::ArtistId,
            Key::PlaylistId,
            Key::ItunesCountry,
            Key::ItunesUrl,
            Key::SeriesName,
            Key::SeriesDescription,
            Key::TrackNumber,
            Key::DiskNumber,
            Key::EpisodeNumber,
            Key::EpisodeId,
            Key::Season,
            Key::Network,
            Key::ServiceContentId,
            Key::ServiceAdditionalContentId,
            Key::ServiceEpisodeId,
        ];
        ALL.iter().copied().find(|k| k.placeholder() == text)
    }

    pub fn is_service_id(self) -> bool {
        matches!(
            self,
            Key::ServiceContentId | Key::ServiceAdditionalContentId | Key::ServiceEpisodeId
        )
    }
}

/// Artwork semantic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkKind {
    Poster,
    Season,
    Square,
    Episode,
    Backdrop,
    Rectangle,
    Person,
}

/// Artwork aspect class, inferred from pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkSize {
    Standard,
    Square,
    Rectangle,
    Vertical,
    Fullscreen,
    Widescreen,
}

impl ArtworkSize {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height == 0 {
            return ArtworkSize::Standard;
        }
        match 100 * width / height {
            46 => ArtworkSize::Vertical,
            144 => ArtworkSize::Fullscreen,
            177 => ArtworkSize::Widescreen,
            _ if width == height => ArtworkSize::Square,
            _ if width > height => ArtworkSize::Rectangle,
            _ => ArtworkSize::Standard,
        }
    }
}

/// A reference to a remote image. Two artworks are the same artwork when
/// they point at the same full-size URL.
#[derive(Debug, Clone)]
pub struct Artwork {
    pub url: Url,
    pub thumb_url: Url,
    pub service: String,
    pub kind: ArtworkKind,
    pub size: ArtworkSize,
}

impl Artwork {
    pub fn new(url: Url, thumb_url: Url, service: impl Into<String>, kind: ArtworkKind) -> Self {
        Self {
            url,
            thumb_url,
            service: service.into(),
            kind,
            size: ArtworkSize::Standard,
        }
    }

    pub fn with_size(mut self, size: ArtworkSize) -> Self {
        self.size = size;
        self
    }

    /// Drop duplicates by full-size URL, keeping first occurrences.
    pub fn unique(artworks: Vec<Artwork>) -> Vec<Artwork> {
        let mut seen: Vec<Url> = Vec::with_capacity(artworks.len());
        artworks
            .into_iter()
            .filter(|a| {
                if seen.contains(&a.url) {
                    false
                } else {
                    seen.push(a.url.clone());
                    true
                }
            })
            .collect()
    }
}

impl PartialEq for Artwork {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Artwork {}

/// A single normalized search or detail result.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataResult {
    pub media_kind: MediaKind,
    /// iTunes advisory flag: 0 = none, 2 = cleaned, 4 = explicit.
    pub content_rating: i64,
    /// Set once the full record has been fetched. Load operations pass
    /// a loaded result through unchanged.
    pub loaded: bool,
    values: HashMap<Key, Value>,
    pub remote_artworks: Vec<Artwork>,
    /// Downloaded artwork payloads, filled by the host after the user
    /// picks from `remote_artworks`.
    pub artworks: Vec<Vec<u8>>,
}

impl MetadataResult {
    pub fn new(media_kind: MediaKind) -> Self {
        Self {
            media_kind,
            content_rating: 0,
            loaded: false,
            values: HashMap::new(),
            remote_artworks: Vec::new(),
            artworks: Vec::new(),
        }
    }

    pub fn get(&self, key: Key) -> Option<&Value> {
        self.values.get(&key)
    }

    pub fn text(&self, key: Key) -> Option<&str> {
        self.values.get(&key).and_then(Value::as_text)
    }

    pub fn integer(&self, key: Key) -> Option<i64> {
        self.values.get(&key).and_then(Value::as_integer)
    }

    pub fn set(&mut self, key: Key, value: impl Into<Value>) {
        self.values.insert(key, value.into());
    }

    /// Insert only when the value is present; `None` leaves the field
    /// untouched.
    pub fn set_opt(&mut self, key: Key, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            self.values.insert(key, value.into());
        }
    }

    pub fn remove(&mut self, key: Key) -> Option<Value> {
        self.values.remove(&key)
    }

    pub fn contains(&self, key: Key) -> bool {
        self.values.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge another result into this one. The other result's values win
    /// on conflict.
    pub fn merge(&mut self, other: MetadataResult) {
        self.values.extend(other.values);
    }

    /// Copy a field from `other` only when missing here. Used to backfill
    /// sparse localized results from the provider's default language.
    pub fn fill_missing_from(&mut self, other: &MetadataResult) {
        for (key, value) in &other.values {
            self.values.entry(*key).or_insert_with(|| value.clone());
        }
    }

    /// Present keys in display order: the per-kind table order first,
    /// untracked keys after those, the service ID keys always last.
    pub fn ordered_keys(&self) -> Vec<Key> {
        let table = match self.media_kind {
            MediaKind::Movie => MOVIE_KEYS,
            MediaKind::TvShow => TV_SHOW_KEYS,
        };

        let rank = |key: &Key| -> (usize, &'static str) {
            let index = table
                .iter()
                .position(|k| k == key)
                .unwrap_or(if key.is_service_id() {
                    table.len() + 1
                } else {
                    table.len()
                });
            (index, key.placeholder())
        };

        let mut keys: Vec<Key> = self.values.keys().copied().collect();
        keys.sort_by_key(rank);
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_merge_overwrites() {
        let mut a = MetadataResult::new(MediaKind::Movie);
        a.set(Key::Name, "Old Title");
        a.set(Key::Genre, "Drama");

        let mut b = MetadataResult::new(MediaKind::Movie);
        b.set(Key::Name, "New Title");

        a.merge(b);
        assert_eq!(a.text(Key::Name), Some("New Title"));
        assert_eq!(a.text(Key::Genre), Some("Drama"));
    }

    #[test]
    fn test_fill_missing_keeps_existing() {
        let mut localized = MetadataResult::new(MediaKind::TvShow);
        localized.set(Key::Name, "Localized");

        let mut fallback = MetadataResult::new(MediaKind::TvShow);
        fallback.set(Key::Name, "English");
        fallback.set(Key::Description, "English description");

        localized.fill_missing_from(&fallback);
        assert_eq!(localized.text(Key::Name), Some("Localized"));
        assert_eq!(localized.text(Key::Description), Some("English description"));
    }

    #[test]
    fn test_ordered_keys_service_ids_last() {
        let mut result = MetadataResult::new(MediaKind::TvShow);
        result.set(Key::ServiceContentId, "x");
        result.set(Key::Season, 2i64);
        result.set(Key::Name, "Pilot");
        result.set(Key::ItunesUrl, "https://example.com");
        result.set(Key::ServiceEpisodeId, "y");

        let keys = result.ordered_keys();
        assert_eq!(keys[0], Key::Name);
        assert_eq!(keys[1], Key::Season);
        // ItunesUrl is not in the TV table: after tracked keys, before
        // the service IDs.
        assert_eq!(keys[2], Key::ItunesUrl);
        assert!(keys[3].is_service_id());
        assert!(keys[4].is_service_id());
    }

    #[test]
    fn test_artwork_equality_by_url() {
        let a = Artwork::new(
            url("https://img.example.com/a.jpg"),
            url("https://img.example.com/a_thumb.jpg"),
            "TheMovieDB",
            ArtworkKind::Poster,
        );
        let b = Artwork::new(
            url("https://img.example.com/a.jpg"),
            url("https://img.example.com/other_thumb.jpg"),
            "iTunes Store",
            ArtworkKind::Square,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_artwork_unique_preserves_order() {
        let a = Artwork::new(
            url("https://img.example.com/a.jpg"),
            url("https://img.example.com/a.jpg"),
            "A",
            ArtworkKind::Poster,
        );
        let b = Artwork::new(
            url("https://img.example.com/b.jpg"),
            url("https://img.example.com/b.jpg"),
            "B",
            ArtworkKind::Poster,
        );
        let dup = Artwork::new(
            url("https://img.example.com/a.jpg"),
            url("https://img.example.com/a.jpg"),
            "C",
            ArtworkKind::Season,
        );

        let unique = Artwork::unique(vec![a.clone(), b.clone(), dup]);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].service, "A");
        assert_eq!(unique[1].service, "B");
    }

    #[test]
    fn test_artwork_size_classes() {
        assert_eq!(ArtworkSize::from_dimensions(600, 600), ArtworkSize::Square);
        assert_eq!(ArtworkSize::from_dimensions(1920, 1080), ArtworkSize::Widescreen);
        assert_eq!(ArtworkSize::from_dimensions(640, 480), ArtworkSize::Rectangle);
        assert_eq!(ArtworkSize::from_dimensions(600, 900), ArtworkSize::Standard);
    }

    #[test]
    fn test_placeholder_roundtrip() {
        assert_eq!(Key::from_placeholder("{Series Name}"), Some(Key::SeriesName));
        assert_eq!(Key::from_placeholder("{Name}"), Some(Key::Name));
        assert_eq!(Key::from_placeholder(", Season "), None);
    }
}
