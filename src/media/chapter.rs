//! Chapter list types

use serde::{Deserialize, Serialize};

/// A single chapter marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub name: String,
    /// Offset from the start of the file, in milliseconds.
    pub timestamp_ms: u64,
}

impl Chapter {
    pub fn new(name: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            name: name.into(),
            timestamp_ms,
        }
    }
}

/// One chapter set returned by a chapter database search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterResult {
    pub title: String,
    pub duration_ms: u64,
    pub id: u64,
    pub confirmations: u64,
    pub chapters: Vec<Chapter>,
}

/// Keep the leading run of chapters with strictly increasing timestamps.
/// Downstream writers reject out-of-order markers, so everything from the
/// first regression onward is dropped.
pub fn monotonic_prefix(chapters: Vec<Chapter>) -> Vec<Chapter> {
    let mut kept: Vec<Chapter> = Vec::with_capacity(chapters.len());
    for chapter in chapters {
        if let Some(last) = kept.last() {
            if chapter.timestamp_ms <= last.timestamp_ms {
                break;
            }
        }
        kept.push(chapter);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_prefix_truncates_at_regression() {
        let chapters = vec![
            Chapter::new("A", 0),
            Chapter::new("B", 1000),
            Chapter::new("C", 500),
            Chapter::new("D", 2000),
        ];
        let kept = monotonic_prefix(chapters);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].name, "A");
        assert_eq!(kept[1].name, "B");
    }

    #[test]
    fn test_monotonic_prefix_drops_duplicates() {
        let chapters = vec![
            Chapter::new("A", 0),
            Chapter::new("B", 1000),
            Chapter::new("B2", 1000),
        ];
        assert_eq!(monotonic_prefix(chapters).len(), 2);
    }

    #[test]
    fn test_monotonic_prefix_keeps_ordered_lists() {
        let chapters = vec![
            Chapter::new("A", 0),
            Chapter::new("B", 1),
            Chapter::new("C", 2),
        ];
        assert_eq!(monotonic_prefix(chapters.clone()), chapters);
        assert!(monotonic_prefix(Vec::new()).is_empty());
    }
}
