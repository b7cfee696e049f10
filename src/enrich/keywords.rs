use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use super::KeywordExtractor;

pub const DEFAULT_MAX_KEYWORDS: usize = 15;

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "could", "couldn't", "did", "didn't", "do", "does", "doesn't",
    "doing", "don't", "down", "during", "each", "few", "for", "from", "further", "had", "hadn't",
    "has", "hasn't", "have", "haven't", "having", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "i", "if", "in", "into", "is", "isn't", "it", "it's", "its", "itself",
    "just", "me", "more", "most", "mustn't", "my", "myself", "no", "nor", "not", "now", "of",
    "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own",
    "said", "same", "says", "she", "she's", "should", "shouldn't", "so", "some", "such", "than",
    "that", "that's", "the", "their", "theirs", "them", "themselves", "then", "there", "these",
    "they", "this", "those", "through", "to", "too", "under", "until", "up", "very", "was",
    "wasn't", "we", "were", "weren't", "what", "when", "where", "which", "while", "who", "whom",
    "why", "will", "with", "won't", "would", "wouldn't", "you", "you're", "your", "yours",
    "yourself", "yourselves",
];

static STOPWORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOPWORDS.iter().copied().collect());

static TOKEN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").ok());

/// True for common English function words. Expects lowercase input.
pub fn is_stopword(word: &str) -> bool {
    STOPWORD_SET.contains(word)
}

/// Lowercased alphabetic tokens of at least three letters.
pub fn tokens(text: &str) -> Vec<String> {
    match TOKEN.as_ref() {
        Some(re) => re
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect(),
        None => Vec::new(),
    }
}

/// Ranks non-stopword tokens by frequency. Ties keep first-occurrence order
/// so the output is deterministic.
#[derive(Debug, Clone)]
pub struct FrequencyKeywordExtractor {
    max_keywords: usize,
}

impl Default for FrequencyKeywordExtractor {
    fn default() -> Self {
        FrequencyKeywordExtractor {
            max_keywords: DEFAULT_MAX_KEYWORDS,
        }
    }
}

impl FrequencyKeywordExtractor {
    pub fn new(max_keywords: usize) -> Self {
        FrequencyKeywordExtractor { max_keywords }
    }
}

impl KeywordExtractor for FrequencyKeywordExtractor {
    fn extract_keywords(&self, title: &str, text: &str) -> Result<Vec<String>> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let all = tokens(title).into_iter().chain(tokens(text));
        for (position, token) in all.enumerate() {
            if is_stopword(&token) {
                continue;
            }
            counts.entry(token).or_insert((0, position)).0 += 1;
        }

        let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
        Ok(ranked
            .into_iter()
            .take(self.max_keywords)
            .map(|(word, _)| word)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_by_frequency_without_stopwords() {
        let keywords = FrequencyKeywordExtractor::default()
            .extract_keywords(
                "Budget vote",
                "The budget passed. The council said the budget was fair and the vote was close.",
            )
            .unwrap();
        assert_eq!(keywords[0], "budget");
        assert_eq!(keywords[1], "vote");
        assert!(!keywords.contains(&"the".to_string()));
        assert!(!keywords.contains(&"was".to_string()));
    }

    #[test]
    fn ignores_short_and_numeric_tokens() {
        let keywords = FrequencyKeywordExtractor::default()
            .extract_keywords("", "an ox ran 2024 times at 5pm")
            .unwrap();
        assert_eq!(keywords, vec!["ran".to_string(), "times".to_string()]);
    }

    #[test]
    fn respects_limit() {
        let text = (0..40)
            .map(|i| format!("word{}", "x".repeat(i)))
            .collect::<Vec<_>>()
            .join(" ");
        let keywords = FrequencyKeywordExtractor::new(15)
            .extract_keywords("", &text)
            .unwrap();
        assert_eq!(keywords.len(), 15);
    }
}
