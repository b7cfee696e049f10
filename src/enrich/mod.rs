//! Enrichment: derived fields computed from validated article text.
//!
//! Every concern sits behind its own trait so a statistical model can replace
//! a heuristic without touching the pipeline. [`EnrichmentProcessor`] calls
//! each one independently; a failing concern falls back to an empty value for
//! its own fields and never stops the others.

mod keywords;
mod language;
mod scoring;
mod sentiment;
mod summary;
mod topics;

use anyhow::Result;
use chrono::Utc;
use std::fmt::Display;
use tracing::{debug, warn};

pub use self::keywords::{is_stopword, FrequencyKeywordExtractor};
pub use self::language::{CommonWordLanguageDetector, UNKNOWN_LANGUAGE};
pub use self::scoring::{cap_quality, confidence_score, quality_score, read_time, QualityInputs};
pub use self::sentiment::LexiconSentimentScorer;
pub use self::summary::LeadSummarizer;
pub use self::topics::{KeywordTopicClassifier, DEFAULT_CATEGORY};

use crate::entity::HeuristicEntityExtractor;
use crate::model::{CandidateArticle, EnrichedArticle, Entities, Sentiment, SourceKind};
use crate::util::{article_id, content_hash, truncate_text, word_count};
use crate::validate::RecordValidation;
use crate::TARGET_PIPELINE;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub excerpt: String,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topics {
    pub topics: Vec<String>,
    pub category: String,
}

pub trait Summarizer: Send + Sync {
    fn summarize(&self, text: &str) -> Result<Summary>;
}

pub trait KeywordExtractor: Send + Sync {
    fn extract_keywords(&self, title: &str, text: &str) -> Result<Vec<String>>;
}

pub trait EntityExtractor: Send + Sync {
    fn extract_entities(&self, title: &str, text: &str) -> Result<Entities>;
}

pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> Result<Sentiment>;
}

pub trait LanguageDetector: Send + Sync {
    fn detect_language(&self, text: &str) -> Result<String>;
}

pub trait TopicClassifier: Send + Sync {
    fn classify(&self, title: &str, text: &str) -> Result<Topics>;
}

fn field_or<T, E: Display>(field: &str, url: &str, result: Result<T, E>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(target: TARGET_PIPELINE, "Enrichment of {} failed for {}: {}", field, url, e);
            fallback
        }
    }
}

pub struct EnrichmentProcessor {
    summarizer: Box<dyn Summarizer>,
    keywords: Box<dyn KeywordExtractor>,
    entities: Box<dyn EntityExtractor>,
    sentiment: Box<dyn SentimentScorer>,
    language: Box<dyn LanguageDetector>,
    topics: Box<dyn TopicClassifier>,
}

impl Default for EnrichmentProcessor {
    fn default() -> Self {
        EnrichmentProcessor {
            summarizer: Box::new(LeadSummarizer),
            keywords: Box::new(FrequencyKeywordExtractor::default()),
            entities: Box::new(HeuristicEntityExtractor),
            sentiment: Box::new(LexiconSentimentScorer),
            language: Box::new(CommonWordLanguageDetector),
            topics: Box::new(KeywordTopicClassifier),
        }
    }
}

impl EnrichmentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_summarizer(mut self, summarizer: impl Summarizer + 'static) -> Self {
        self.summarizer = Box::new(summarizer);
        self
    }

    pub fn with_keyword_extractor(mut self, keywords: impl KeywordExtractor + 'static) -> Self {
        self.keywords = Box::new(keywords);
        self
    }

    pub fn with_entity_extractor(mut self, entities: impl EntityExtractor + 'static) -> Self {
        self.entities = Box::new(entities);
        self
    }

    pub fn with_sentiment_scorer(mut self, sentiment: impl SentimentScorer + 'static) -> Self {
        self.sentiment = Box::new(sentiment);
        self
    }

    pub fn with_language_detector(mut self, language: impl LanguageDetector + 'static) -> Self {
        self.language = Box::new(language);
        self
    }

    pub fn with_topic_classifier(mut self, topics: impl TopicClassifier + 'static) -> Self {
        self.topics = Box::new(topics);
        self
    }

    /// Builds the durable record for a crawled article. Never fails: each
    /// concern that errors leaves its fields at their empty defaults.
    pub fn enrich(
        &self,
        candidate: CandidateArticle,
        validation: Option<&RecordValidation>,
        source: Option<SourceKind>,
    ) -> EnrichedArticle {
        let url = candidate.url.as_str();
        let title = candidate.title.as_str();
        let content = candidate.content.as_str();

        let summary = field_or(
            "summary",
            url,
            self.summarizer.summarize(content),
            Summary {
                excerpt: truncate_text(content, 200),
                summary: String::new(),
            },
        );
        let keywords = field_or(
            "keywords",
            url,
            self.keywords.extract_keywords(title, content),
            Vec::new(),
        );
        let entities = field_or(
            "entities",
            url,
            self.entities.extract_entities(title, content),
            Entities::default(),
        );
        let sentiment = field_or(
            "sentiment",
            url,
            self.sentiment.score(content),
            Sentiment::default(),
        );
        let detected = field_or(
            "language",
            url,
            self.language.detect_language(content),
            UNKNOWN_LANGUAGE.to_string(),
        );
        let topics = field_or(
            "topics",
            url,
            self.topics.classify(title, content),
            Topics {
                topics: Vec::new(),
                category: DEFAULT_CATEGORY.to_string(),
            },
        );

        let language = if detected != UNKNOWN_LANGUAGE {
            detected
        } else if !candidate.language.trim().is_empty() {
            candidate.language.clone()
        } else {
            UNKNOWN_LANGUAGE.to_string()
        };

        let content_length = content.chars().count();
        let entity_count = entities.total();
        let mut quality = quality_score(QualityInputs {
            content_chars: content_length,
            title_chars: title.chars().count(),
            entity_count,
            has_authors: !candidate.authors.is_empty(),
            has_images: !candidate.images.is_empty(),
        });
        if let Some(validation) = validation.filter(|v| !v.is_valid) {
            quality = cap_quality(quality, validation.quality_score);
        }
        let confidence = confidence_score(content_length, entity_count, keywords.len());

        debug!(
            target: TARGET_PIPELINE,
            "Enriched {}: {} keywords, {} entities, quality {}",
            url,
            keywords.len(),
            entity_count,
            quality
        );

        let id = article_id(url, content);
        let hash = content_hash(title, content, url);
        let minutes = read_time(content);
        let words = word_count(content);

        EnrichedArticle {
            article_id: id,
            content_hash: hash,
            excerpt: Some(summary.excerpt).filter(|s| !s.is_empty()),
            summary: Some(summary.summary).filter(|s| !s.is_empty()),
            read_time: minutes,
            word_count: words,
            content_length,
            keywords,
            entities,
            topics: topics.topics,
            category: topics.category,
            sentiment,
            quality_score: quality,
            confidence_score: confidence,
            language,
            discovery_source: source,
            processing_timestamp: Utc::now(),
            url: candidate.url,
            domain: candidate.domain,
            title: candidate.title,
            content: candidate.content,
            authors: candidate.authors,
            publish_date: candidate.publish_date,
            images: candidate.images,
            description: candidate.description,
            crawl_time: candidate.crawl_time,
            engine_used: candidate.engine_used,
        }
    }
}
