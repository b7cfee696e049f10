//! Fetching article pages through an ordered chain of extraction strategies.

mod engine;
mod strategy;

pub use engine::{CrawlEngine, CrawlOutcome};
pub use strategy::{ComprehensiveStrategy, CrawlStrategy, FallbackStrategy, DEFAULT_LANGUAGE};
