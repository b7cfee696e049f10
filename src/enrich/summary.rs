use anyhow::Result;
use unicode_segmentation::UnicodeSegmentation;

use super::{Summarizer, Summary};
use crate::util::{take_chars, truncate_text};

pub const EXCERPT_CHARS: usize = 200;
pub const SUMMARY_SENTENCES: usize = 3;
pub const SUMMARY_FALLBACK_CHARS: usize = 500;

/// Lead-based summary: the opening sentences of the article.
#[derive(Debug, Clone, Default)]
pub struct LeadSummarizer;

impl Summarizer for LeadSummarizer {
    fn summarize(&self, text: &str) -> Result<Summary> {
        let text = text.trim();
        let sentences: Vec<&str> = text
            .unicode_sentences()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let summary = if sentences.len() >= SUMMARY_SENTENCES {
            sentences[..SUMMARY_SENTENCES].join(" ")
        } else {
            take_chars(text, SUMMARY_FALLBACK_CHARS).trim().to_string()
        };

        Ok(Summary {
            excerpt: truncate_text(text, EXCERPT_CHARS),
            summary,
        })
    }
}
