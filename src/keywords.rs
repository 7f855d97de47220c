//! Significant-word extraction for chunk metadata.
//!
//! A small, deterministic frequency ranking: tokens are lowercased,
//! stop-words and short fragments removed, then ranked by occurrence count
//! with first appearance breaking ties. Nothing here touches I/O; the same
//! text always yields the same ordered keyword list.

use std::collections::HashMap;

/// Keywords extracted per section unless configured otherwise.
pub const DEFAULT_KEYWORD_COUNT: usize = 25;

/// Common English function words plus filing boilerplate that carries no
/// retrieval signal on its own.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can",
    "had", "her", "was", "one", "our", "out", "day", "get", "has", "him",
    "his", "how", "its", "may", "new", "now", "old", "see", "two", "way",
    "who", "did", "that", "this", "with", "from", "they", "will", "would",
    "there", "their", "what", "which", "when", "were", "been", "have",
    "than", "then", "them", "these", "such", "into", "other", "under",
    "upon", "each", "about", "shall", "hereby", "herein", "thereof",
    "pursuant", "company", "registrant", "item", "report", "form", "date",
    "inc", "corp",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Extract up to `count` significant words from `text`, most frequent first.
///
/// Returns fewer than `count` entries when the text does not contain that
/// many distinct significant tokens, and an empty list for empty or
/// stop-word-only input.
pub fn extract_significant_words(text: &str, count: usize) -> Vec<String> {
    if count == 0 || text.is_empty() {
        return Vec::new();
    }

    let mut frequencies: HashMap<String, (usize, usize)> = HashMap::new();
    let mut position = 0usize;

    for raw in text.split(|c: char| !c.is_alphanumeric()) {
        if raw.is_empty() {
            continue;
        }
        let token = raw.to_lowercase();
        if token.len() < 3 || token.chars().all(|c| c.is_ascii_digit()) || is_stop_word(&token) {
            continue;
        }
        let entry = frequencies.entry(token).or_insert((0, position));
        entry.0 += 1;
        position += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = frequencies
        .into_iter()
        .map(|(token, (freq, first))| (token, freq, first))
        .collect();
    // Highest frequency first; earliest appearance wins ties so the output
    // is stable across runs.
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(count)
        .map(|(token, _, _)| token)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_short_text_yield_nothing() {
        assert!(extract_significant_words("", 25).is_empty());
        assert!(extract_significant_words("a an to", 25).is_empty());
        assert!(extract_significant_words("agreement", 0).is_empty());
    }

    #[test]
    fn ranks_by_frequency_then_first_appearance() {
        let text = "merger agreement merger closing agreement merger";
        let words = extract_significant_words(text, 3);
        assert_eq!(words, vec!["merger", "agreement", "closing"]);
    }

    #[test]
    fn filters_stop_words_and_digits() {
        let text = "The Company entered into the agreement on 2023 with the lender";
        let words = extract_significant_words(text, 10);
        assert!(!words.contains(&"the".to_string()));
        assert!(!words.contains(&"company".to_string()));
        assert!(!words.contains(&"2023".to_string()));
        assert!(words.contains(&"agreement".to_string()));
        assert!(words.contains(&"lender".to_string()));
    }

    #[test]
    fn bounded_by_requested_count() {
        let text = "alpha beta gamma delta epsilon zeta";
        assert_eq!(extract_significant_words(text, 2).len(), 2);
    }

    #[test]
    fn deterministic_for_identical_input() {
        let text = "notes offering indenture notes trustee offering senior notes";
        let first = extract_significant_words(text, 5);
        let second = extract_significant_words(text, 5);
        assert_eq!(first, second);
    }
}
