//! Text normalization and lexical overlap helpers.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

/// Collapse runs of whitespace to single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-case and whitespace-collapse, the form used by the normalized tier
pub fn normalize_for_match(text: &str) -> String {
    normalize_whitespace(&text.to_lowercase())
}

/// Character count of the whitespace-normalized text
pub fn normalized_len(text: &str) -> usize {
    text.split_whitespace()
        .map(|w| w.chars().count() + 1)
        .sum::<usize>()
        .saturating_sub(1)
}

/// Lower-cased whitespace tokens with more than `min_chars` characters
pub fn words_longer_than(text: &str, min_chars: usize) -> Vec<String> {
    text.split_whitespace()
        .filter(|w| w.chars().count() > min_chars)
        .map(str::to_lowercase)
        .collect()
}

/// Search terms of a query: words longer than two characters, lower-cased,
/// stripped of surrounding punctuation and deduplicated in query order
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in query.split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        if word.chars().count() <= 2 {
            continue;
        }
        let word = word.to_lowercase();
        if !terms.contains(&word) {
            terms.push(word);
        }
    }
    terms
}

/// Word-overlap coefficient between a probe and a candidate.
///
/// Probe words form a set, candidate words a list (repeats count), both
/// restricted to words longer than 3 characters:
/// `|{w in candidate : w in probe}| / max(|probe set|, |candidate list|)`.
pub fn word_overlap(probe: &str, candidate: &str) -> f64 {
    let probe_words: HashSet<String> = words_longer_than(probe, 3).into_iter().collect();
    let candidate_words = words_longer_than(candidate, 3);

    if probe_words.is_empty() || candidate_words.is_empty() {
        return 0.0;
    }

    let shared = candidate_words
        .iter()
        .filter(|w| probe_words.contains(*w))
        .count();

    shared as f64 / probe_words.len().max(candidate_words.len()) as f64
}

/// Literal, case-insensitive matcher for one query term.
///
/// Case folding covers Unicode, and match offsets are byte offsets into the
/// searched text.
pub fn term_matcher(term: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b   c "), "a b c");
        assert_eq!(normalize_for_match("Hello   WORLD"), "hello world");
        assert_eq!(normalized_len("  ab   cd "), 5);
        assert_eq!(normalized_len("   "), 0);
    }

    #[test]
    fn test_word_overlap_three_of_five() {
        // five probe words longer than three characters, candidate shares three
        let probe = "alpha bravo charlie delta echoes";
        let candidate = "alpha bravo charlie zulus yanks";
        let score = word_overlap(probe, candidate);
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_word_overlap_bounds() {
        assert_eq!(word_overlap("tiny a an", "tiny a an"), 1.0);
        assert_eq!(word_overlap("", "something here"), 0.0);
        assert_eq!(word_overlap("nothing shared", "completely different"), 0.0);

        // repeated candidate words count individually but never exceed the max
        let score = word_overlap("river", "river river river");
        assert!((score - 1.0).abs() < 1e-9);
        let score = word_overlap("river stone", "river river river");
        assert!(score <= 1.0);
    }

    #[test]
    fn test_query_terms() {
        assert_eq!(
            query_terms("How does Rust's borrow checker, the borrow CHECKER, work?"),
            vec!["how", "does", "rust's", "borrow", "checker", "the", "work"]
        );
        assert!(query_terms("a an of").is_empty());
    }

    #[test]
    fn test_term_matcher_folds_case() {
        let rust = term_matcher("rust").unwrap();
        assert_eq!(rust.find("The RUST Book").map(|m| m.range()), Some(4..8));

        // offsets stay byte offsets after multi-byte characters
        let emile = term_matcher("émile").unwrap();
        let text = "Über Émile Zola";
        let found = emile.find(text).unwrap();
        assert_eq!(&text[found.range()], "Émile");

        // regex syntax in a query is matched literally
        let literal = term_matcher("c++").unwrap();
        assert!(literal.is_match("Modern C++ code"));
        assert!(!literal.is_match("ccc"));
    }
}
