//! Data types that flow between pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a discovered URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Feed,
    Sitemap,
}

impl SourceKind {
    /// Crawl priority assigned to URLs from this kind of source. Feed entries
    /// are assumed to be the freshest.
    pub fn priority(&self) -> i32 {
        match self {
            SourceKind::Feed => 10,
            SourceKind::Sitemap => 5,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Feed => write!(f, "feed"),
            SourceKind::Sitemap => write!(f, "sitemap"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    pub url: String,
    pub title: Option<String>,
    pub source: SourceKind,
    pub priority: i32,
    pub discovered_at: DateTime<Utc>,
}

impl DiscoveredUrl {
    pub fn new(url: &str, title: Option<String>, source: SourceKind) -> Self {
        DiscoveredUrl {
            url: url.to_string(),
            title,
            source,
            priority: source.priority(),
            discovered_at: Utc::now(),
        }
    }
}

/// One HTTP fetch made by a crawl strategy. Dropped once extraction is done.
#[derive(Debug, Clone)]
pub struct RawFetch {
    pub url: String,
    pub status_code: u16,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
    pub strategy_used: &'static str,
}

/// Extraction output of a single crawl strategy attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateArticle {
    pub title: String,
    pub content: String,
    pub authors: Vec<String>,
    pub publish_date: Option<String>,
    pub domain: String,
    pub images: Vec<String>,
    pub description: String,
    pub language: String,
    pub url: String,
    /// Seconds spent in the winning strategy.
    pub crawl_time: f64,
    pub engine_used: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    pub persons: Vec<String>,
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
    pub dates: Vec<String>,
}

impl Entities {
    pub fn total(&self) -> usize {
        self.persons.len() + self.organizations.len() + self.locations.len() + self.dates.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > 0.1 {
            SentimentLabel::Positive
        } else if polarity < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "positive"),
            SentimentLabel::Negative => write!(f, "negative"),
            SentimentLabel::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub polarity: f64,
    pub subjectivity: f64,
    pub label: SentimentLabel,
    pub positive_words: usize,
    pub negative_words: usize,
}

impl Default for Sentiment {
    fn default() -> Self {
        Sentiment {
            polarity: 0.0,
            subjectivity: 0.0,
            label: SentimentLabel::Neutral,
            positive_words: 0,
            negative_words: 0,
        }
    }
}

/// The durable unit written to every store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedArticle {
    pub article_id: String,
    pub url: String,
    pub domain: String,
    pub title: String,
    pub content: String,
    pub authors: Vec<String>,
    pub publish_date: Option<String>,
    pub images: Vec<String>,
    pub description: String,
    pub language: String,
    pub crawl_time: f64,
    pub engine_used: String,
    pub content_hash: String,
    pub excerpt: Option<String>,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub entities: Entities,
    pub topics: Vec<String>,
    pub sentiment: Sentiment,
    pub read_time: u32,
    pub quality_score: u8,
    pub confidence_score: f64,
    pub category: String,
    pub word_count: usize,
    pub content_length: usize,
    pub discovery_source: Option<SourceKind>,
    pub processing_timestamp: DateTime<Utc>,
}

/// Outcome of a write against one store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub store: String,
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersistResult {
    /// True when both the relational store and the search index accepted the write.
    pub success: bool,
    pub article_id: String,
    pub stores: Vec<StoreStatus>,
}

impl PersistResult {
    pub fn status_of(&self, store: &str) -> Option<&StoreStatus> {
        self.stores.iter().find(|s| s.store == store)
    }
}

/// Statistics for one discovery, crawl, enrich and persist cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleReport {
    pub urls_discovered: usize,
    pub articles_crawled: usize,
    pub articles_enriched: usize,
    pub articles_stored: usize,
    pub errors: usize,
    pub cycle_time_seconds: f64,
    pub success_rate: f64,
}
