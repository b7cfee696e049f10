use crate::model::CandidateArticle;
use crate::util::word_count;

/// Title assigned by strategies when the page has none.
pub const NO_TITLE_PLACEHOLDER: &str = "No Title";
pub const MIN_CONTENT_CHARS: usize = 200;
pub const MIN_CONTENT_WORDS: usize = 50;

/// Cheap gate deciding whether a crawl strategy's output is good enough to stop
/// trying further strategies.
#[derive(Debug, Clone)]
pub struct ContentValidator {
    min_chars: usize,
    min_words: usize,
}

impl Default for ContentValidator {
    fn default() -> Self {
        ContentValidator {
            min_chars: MIN_CONTENT_CHARS,
            min_words: MIN_CONTENT_WORDS,
        }
    }
}

impl ContentValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rejection reason, if any.
    pub fn check(&self, candidate: &CandidateArticle) -> Result<(), String> {
        let title = candidate.title.trim();
        if title.is_empty() || title.eq_ignore_ascii_case(NO_TITLE_PLACEHOLDER) {
            return Err("missing title".to_string());
        }
        let chars = candidate.content.chars().count();
        if chars < self.min_chars {
            return Err(format!(
                "content too short: {} chars (minimum {})",
                chars, self.min_chars
            ));
        }
        let words = word_count(&candidate.content);
        if words < self.min_words {
            return Err(format!(
                "too few words: {} (minimum {})",
                words, self.min_words
            ));
        }
        Ok(())
    }

    pub fn is_valid(&self, candidate: &CandidateArticle) -> bool {
        self.check(candidate).is_ok()
    }
}
