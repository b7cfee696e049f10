use async_trait::async_trait;
use readability::extractor;
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use url::Url;

use crate::error::CrawlError;
use crate::extract::{normalize_text, ContentExtractor, PageMetadata};
use crate::http::{FetchProfile, HttpFetcher};
use crate::model::CandidateArticle;
use crate::util::domain_of;
use crate::validate::NO_TITLE_PLACEHOLDER;

pub const DEFAULT_LANGUAGE: &str = "en";

/// One way of turning a URL into a candidate article. Each strategy fetches
/// the page itself; the engine decides whether the result is good enough.
#[async_trait]
pub trait CrawlStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, url: &str) -> Result<CandidateArticle, CrawlError>;
}

fn candidate(url: &str, title: Option<String>, content: String, metadata: PageMetadata) -> CandidateArticle {
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE_PLACEHOLDER.to_string());
    CandidateArticle {
        title,
        content,
        authors: metadata.authors,
        publish_date: metadata.publish_date,
        domain: domain_of(url),
        images: metadata.images,
        description: metadata.description.unwrap_or_default(),
        language: metadata
            .language
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        url: url.to_string(),
        ..Default::default()
    }
}

/// Full readability parse of the page.
pub struct ComprehensiveStrategy {
    fetcher: HttpFetcher,
}

impl ComprehensiveStrategy {
    pub const NAME: &'static str = "comprehensive";

    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }

    pub fn build(url: &str, html: &str) -> Result<CandidateArticle, CrawlError> {
        let parsed = Url::parse(url).map_err(|e| CrawlError::Extraction(format!("invalid URL: {}", e)))?;
        let mut reader = Cursor::new(html.as_bytes());
        let product = panic::catch_unwind(AssertUnwindSafe(|| extractor::extract(&mut reader, &parsed)))
            .map_err(|_| CrawlError::Extraction("readability parser panicked".to_string()))?
            .map_err(|e| CrawlError::Extraction(e.to_string()))?;

        let metadata = PageMetadata::from_html(html, url);
        let title = Some(product.title)
            .filter(|t| !t.trim().is_empty())
            .or_else(|| metadata.title.clone());
        Ok(candidate(url, title, normalize_text(&product.text), metadata))
    }
}

#[async_trait]
impl CrawlStrategy for ComprehensiveStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn attempt(&self, url: &str) -> Result<CandidateArticle, CrawlError> {
        let raw = self.fetcher.fetch(url, FetchProfile::Page, Self::NAME).await?;
        Self::build(&raw.url, &raw.body)
    }
}

/// Plain fetch followed by heuristic boilerplate removal.
pub struct FallbackStrategy {
    fetcher: HttpFetcher,
    extractor: ContentExtractor,
}

impl FallbackStrategy {
    pub const NAME: &'static str = "fallback";

    pub fn new(fetcher: HttpFetcher) -> Self {
        Self {
            fetcher,
            extractor: ContentExtractor::new(),
        }
    }

    pub fn build(&self, url: &str, html: &str) -> CandidateArticle {
        let content = self.extractor.extract(html, url);
        let metadata = PageMetadata::from_html(html, url);
        let title = metadata.title.clone();
        candidate(url, title, content, metadata)
    }
}

#[async_trait]
impl CrawlStrategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn attempt(&self, url: &str) -> Result<CandidateArticle, CrawlError> {
        let raw = self.fetcher.fetch(url, FetchProfile::Page, Self::NAME).await?;
        Ok(self.build(&raw.url, &raw.body))
    }
}
