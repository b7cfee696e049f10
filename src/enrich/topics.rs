use anyhow::Result;
use std::collections::HashSet;

use super::keywords::tokens;
use super::{TopicClassifier, Topics};

pub const MAX_TOPICS: usize = 3;
pub const DEFAULT_CATEGORY: &str = "general";

const TOPIC_TERMS: &[(&str, &[&str])] = &[
    (
        "technology",
        &["artificial intelligence", "software", "tech", "technology", "digital", "computer", "internet", "cyber"],
    ),
    (
        "politics",
        &["government", "election", "policy", "political", "senate", "congress", "parliament", "minister"],
    ),
    (
        "business",
        &["market", "economy", "company", "business", "financial", "stock", "investors", "trade"],
    ),
    (
        "sports",
        &["game", "team", "player", "sport", "championship", "score", "league", "match"],
    ),
    (
        "health",
        &["medical", "health", "disease", "hospital", "medicine", "treatment", "patients", "doctors"],
    ),
];

const CATEGORY_TERMS: &[(&str, &[&str])] = &[
    ("politics", &["election", "government", "president", "congress", "senate", "parliament", "vote"]),
    ("sports", &["football", "basketball", "soccer", "tennis", "olympics", "championship", "league"]),
    ("technology", &["technology", "software", "computer", "internet", "artificial intelligence", "startup"]),
    ("business", &["business", "economy", "market", "stock", "company", "finance", "earnings"]),
    ("health", &["health", "medical", "hospital", "doctor", "disease", "vaccine", "patients"]),
    ("entertainment", &["movie", "film", "music", "celebrity", "actor", "actress", "album"]),
];

fn matches(term: &str, words: &HashSet<String>, lowered: &str) -> bool {
    if term.contains(' ') {
        lowered.contains(term)
    } else {
        words.contains(term)
    }
}

/// Keyword-table topic and category assignment. Terms match whole words so
/// that short terms do not fire inside longer words.
#[derive(Debug, Clone, Default)]
pub struct KeywordTopicClassifier;

impl TopicClassifier for KeywordTopicClassifier {
    fn classify(&self, title: &str, text: &str) -> Result<Topics> {
        let full = format!("{} {}", title, text);
        let lowered = full.to_lowercase();
        let words: HashSet<String> = tokens(&full).into_iter().collect();

        let topics = TOPIC_TERMS
            .iter()
            .filter(|(_, terms)| terms.iter().any(|t| matches(t, &words, &lowered)))
            .map(|(topic, _)| topic.to_string())
            .take(MAX_TOPICS)
            .collect();

        let category = CATEGORY_TERMS
            .iter()
            .find(|(_, terms)| terms.iter().any(|t| matches(t, &words, &lowered)))
            .map(|(category, _)| category.to_string())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        Ok(Topics { topics, category })
    }
}
