//! Capitalization and pattern based entity extraction.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::enrich::{is_stopword, EntityExtractor};
use crate::model::Entities;

pub const MAX_PER_TYPE: usize = 10;

// leading honorifics are not part of the name that follows them
const HONORIFICS: &[&str] = &[
    "Mr", "Mrs", "Ms", "Dr", "Sir", "Mayor", "President", "Senator", "Governor", "Minister",
    "Chancellor", "Judge", "Officer", "Chief", "Professor", "King", "Queen", "Prince", "Pope",
];

const MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|November|December";

static ORGANIZATION: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"\b[A-Z][a-zA-Z&]+(?:\s+[A-Z][a-zA-Z&]+)*\s+(?:Inc|Corp|Corporation|Company|Co|LLC|Ltd|International|Global|Technologies|Systems)\b\.?",
    )
    .ok()
});

static LOCATION: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"\b(?:[Ii]n|[Aa]t|[Ff]rom|[Tt]o)\s+([A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)*)").ok()
});

static DATE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(?:(?:{m})\s+\d{{1,2}}(?:,\s*\d{{4}})?|\d{{1,2}}\s+(?:{m})(?:\s+\d{{4}})?|\d{{4}}-\d{{2}}-\d{{2}})\b",
        m = MONTHS
    ))
    .ok()
});

fn push_unique(list: &mut Vec<String>, value: &str) {
    let value = value.trim().trim_end_matches('.').trim();
    if !value.is_empty() && list.len() < MAX_PER_TYPE && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

fn strip_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}

fn is_title_case(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => {
            word.chars().count() > 1
                && chars.all(|c| c.is_lowercase() || c == '\'' || c == '-')
        }
        _ => false,
    }
}

fn ends_sentence(word: &str) -> bool {
    word.ends_with(['.', '!', '?'])
}

/// Finds names with cheap heuristics: adjacent title-case words for people,
/// company suffixes for organizations, capitalized phrases after a
/// preposition for places, and month-name or ISO patterns for dates.
#[derive(Debug, Clone, Default)]
pub struct HeuristicEntityExtractor;

impl HeuristicEntityExtractor {
    fn persons(&self, text: &str, exclude: &[String]) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut found = Vec::new();
        let mut i = 0;
        while i + 1 < words.len() {
            let first = strip_punctuation(words[i]);
            let second = strip_punctuation(words[i + 1]);
            let sentence_start = i == 0 || ends_sentence(words[i - 1]);
            // a name does not continue past punctuation like "Smith, Jones"
            let joined = !words[i].ends_with(|c: char| !c.is_alphanumeric());

            if !sentence_start
                && joined
                && is_title_case(first)
                && is_title_case(second)
                && !HONORIFICS.contains(&first)
                && !is_stopword(&first.to_lowercase())
                && !is_stopword(&second.to_lowercase())
                && !MONTHS.split('|').any(|m| m == first || m == second)
            {
                let name = format!("{} {}", first, second);
                if !exclude.iter().any(|e| e.contains(&name)) {
                    push_unique(&mut found, &name);
                }
                i += 2;
            } else {
                i += 1;
            }
        }
        found
    }
}

impl EntityExtractor for HeuristicEntityExtractor {
    fn extract_entities(&self, title: &str, text: &str) -> Result<Entities> {
        let full = format!("{}. {}", title, text);
        let mut entities = Entities::default();

        if let Some(re) = ORGANIZATION.as_ref() {
            for m in re.find_iter(&full) {
                push_unique(&mut entities.organizations, m.as_str());
            }
        }
        if let Some(re) = LOCATION.as_ref() {
            for caps in re.captures_iter(&full) {
                if let Some(place) = caps.get(1) {
                    let place = place.as_str();
                    let head = place.split_whitespace().next().unwrap_or("");
                    if is_stopword(&head.to_lowercase()) || MONTHS.split('|').any(|m| m == head) {
                        continue;
                    }
                    if entities.organizations.iter().any(|o| o.starts_with(place)) {
                        continue;
                    }
                    push_unique(&mut entities.locations, place);
                }
            }
        }
        if let Some(re) = DATE.as_ref() {
            for m in re.find_iter(&full) {
                push_unique(&mut entities.dates, m.as_str());
            }
        }

        let mut exclude = entities.organizations.clone();
        exclude.extend(entities.locations.iter().cloned());
        entities.persons = self.persons(&full, &exclude);

        Ok(entities)
    }
}
