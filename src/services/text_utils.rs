//! Shared text normalization and comparison utilities
//!
//! Fuzzy matching helpers used when reconciling user-supplied titles
//! with the names providers return.

use regex::Regex;

/// Two titles are considered the same show when their edit distance is
/// below this.
pub const MATCH_THRESHOLD: usize = 30;

/// Calculate Levenshtein distance between two strings.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    strsim::levenshtein(s1, s2)
}

/// Build a whitespace-tolerant regex from a plain title: every space run
/// matches any run of characters, everything else is taken literally.
/// Anchored on both ends and case-insensitive.
pub fn wildcard_regex(title: &str) -> Option<Regex> {
    let escaped: Vec<String> = title.split_whitespace().map(regex::escape).collect();
    if escaped.is_empty() {
        return None;
    }
    Regex::new(&format!("(?i)^{}$", escaped.join(".*?"))).ok()
}

/// Whether a candidate name is close enough to the searched title,
/// either by wildcard match or edit distance under [`MATCH_THRESHOLD`].
pub fn titles_match(searched: &str, candidate: &str) -> bool {
    if let Some(re) = wildcard_regex(searched) {
        if re.is_match(candidate) {
            return true;
        }
    }
    levenshtein_distance(&searched.to_lowercase(), &candidate.to_lowercase()) < MATCH_THRESHOLD
}

/// Join a list of names into the comma-separated form used in tag values,
/// skipping empty entries.
pub fn clean_list(names: &[String]) -> Option<String> {
    let joined = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}

/// Strip the boilerplate suffixes stores append to copyright lines.
pub fn clean_copyright(text: &str) -> String {
    let mut cleaned = text.trim().to_string();
    for suffix in [". All Rights Reserved.", ". All Rights Reserved", " by"] {
        if let Some(stripped) = cleaned.strip_suffix(suffix) {
            cleaned = stripped.to_string();
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("saturday", "sunday"), 3);
        assert_eq!(levenshtein_distance("", "hello"), 5);
        assert_eq!(levenshtein_distance("hello", ""), 5);
        assert_eq!(levenshtein_distance("", ""), 0);
    }

    #[test]
    fn test_levenshtein_symmetry() {
        assert_eq!(
            levenshtein_distance("doctor who", "Doctor Who (2005)"),
            levenshtein_distance("Doctor Who (2005)", "doctor who"),
        );
    }

    #[test]
    fn test_wildcard_regex() {
        let re = wildcard_regex("doctor who").unwrap();
        assert!(re.is_match("Doctor Who"));
        assert!(re.is_match("doctor.who"));
        assert!(!re.is_match("Doctor Who (2005)"));

        let re = wildcard_regex("M*A*S*H").unwrap();
        assert!(re.is_match("M*A*S*H"));
        assert!(!re.is_match("MASH"));

        assert!(wildcard_regex("").is_none());
    }

    #[test]
    fn test_titles_match() {
        assert!(titles_match("doctor who", "Doctor Who"));
        assert!(titles_match("Breaking Bad", "Breaking Bad (2008)"));
        assert!(!titles_match(
            "a",
            "an entirely different and much longer series name"
        ));
    }

    #[test]
    fn test_clean_list() {
        let names = vec![
            "Jane Doe".to_string(),
            String::new(),
            " John Roe ".to_string(),
        ];
        assert_eq!(clean_list(&names), Some("Jane Doe, John Roe".to_string()));
        assert_eq!(clean_list(&[]), None);
        assert_eq!(clean_list(&[String::new()]), None);
    }

    #[test]
    fn test_clean_copyright() {
        assert_eq!(
            clean_copyright("© 2020 Studio. All Rights Reserved."),
            "© 2020 Studio"
        );
        assert_eq!(clean_copyright("© 2020 Studio"), "© 2020 Studio");
    }
}
