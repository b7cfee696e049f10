use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::strategy::{ComprehensiveStrategy, CrawlStrategy, FallbackStrategy};
use crate::http::HttpFetcher;
use crate::model::CandidateArticle;
use crate::validate::ContentValidator;
use crate::TARGET_WEB_REQUEST;

#[derive(Debug, Clone)]
pub enum CrawlOutcome {
    Found(CandidateArticle),
    /// Every strategy failed or was rejected. Expected, not an error.
    NotFound,
}

impl CrawlOutcome {
    pub fn into_article(self) -> Option<CandidateArticle> {
        match self {
            CrawlOutcome::Found(article) => Some(article),
            CrawlOutcome::NotFound => None,
        }
    }
}

/// Runs an ordered list of strategies until one produces content the
/// validator accepts.
pub struct CrawlEngine {
    strategies: Vec<Arc<dyn CrawlStrategy>>,
    validator: ContentValidator,
}

impl CrawlEngine {
    pub fn new(strategies: Vec<Arc<dyn CrawlStrategy>>, validator: ContentValidator) -> Self {
        Self {
            strategies,
            validator,
        }
    }

    /// Readability first, heuristic extraction second.
    pub fn with_default_strategies(fetcher: HttpFetcher) -> Self {
        Self::new(
            vec![
                Arc::new(ComprehensiveStrategy::new(fetcher.clone())),
                Arc::new(FallbackStrategy::new(fetcher)),
            ],
            ContentValidator::new(),
        )
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    #[instrument(target = "web_request", level = "info", skip(self))]
    pub async fn crawl(&self, url: &str) -> CrawlOutcome {
        let started = Instant::now();

        for strategy in &self.strategies {
            match strategy.attempt(url).await {
                Ok(mut candidate) => match self.validator.check(&candidate) {
                    Ok(()) => {
                        candidate.engine_used = strategy.name().to_string();
                        candidate.crawl_time = started.elapsed().as_secs_f64();
                        info!(
                            target: TARGET_WEB_REQUEST,
                            "Crawled {} with {} strategy in {:.2}s",
                            url,
                            strategy.name(),
                            candidate.crawl_time
                        );
                        return CrawlOutcome::Found(candidate);
                    }
                    Err(reason) => {
                        debug!(target: TARGET_WEB_REQUEST, "{} strategy rejected for {}: {}", strategy.name(), url, reason);
                    }
                },
                Err(e) => {
                    warn!(target: TARGET_WEB_REQUEST, "{} strategy failed for {}: {}", strategy.name(), url, e);
                }
            }
        }

        warn!(target: TARGET_WEB_REQUEST, "No strategy produced usable content for {}", url);
        CrawlOutcome::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CrawlError, FetchError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Stub {
        name: &'static str,
        result: fn(&str) -> Result<CandidateArticle, CrawlError>,
        calls: AtomicUsize,
    }

    impl Stub {
        fn new(name: &'static str, result: fn(&str) -> Result<CandidateArticle, CrawlError>) -> Arc<Self> {
            Arc::new(Stub {
                name,
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CrawlStrategy for Stub {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn attempt(&self, url: &str) -> Result<CandidateArticle, CrawlError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)(url)
        }
    }

    fn good(url: &str) -> Result<CandidateArticle, CrawlError> {
        Ok(CandidateArticle {
            title: "A perfectly fine headline".to_string(),
            content: "word ".repeat(120),
            url: url.to_string(),
            ..Default::default()
        })
    }

    fn thin(url: &str) -> Result<CandidateArticle, CrawlError> {
        Ok(CandidateArticle {
            title: "Headline".to_string(),
            content: "too short".to_string(),
            url: url.to_string(),
            ..Default::default()
        })
    }

    fn broken(url: &str) -> Result<CandidateArticle, CrawlError> {
        Err(CrawlError::Fetch(FetchError::Timeout {
            url: url.to_string(),
            seconds: 30,
        }))
    }

    #[tokio::test]
    async fn first_accepted_strategy_wins() {
        let first = Stub::new("first", good);
        let second = Stub::new("second", good);
        let engine = CrawlEngine::new(vec![first.clone(), second.clone()], ContentValidator::new());

        let article = engine.crawl("https://news.example/a").await.into_article().unwrap();
        assert_eq!(article.engine_used, "first");
        assert!(article.crawl_time >= 0.0);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn errors_and_rejections_move_to_the_next_strategy() {
        let failing = Stub::new("failing", broken);
        let rejected = Stub::new("rejected", thin);
        let last = Stub::new("last", good);
        let engine = CrawlEngine::new(vec![failing.clone(), rejected.clone(), last], ContentValidator::new());

        let article = engine.crawl("https://news.example/a").await.into_article().unwrap();
        assert_eq!(article.engine_used, "last");
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(rejected.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausting_strategies_is_not_found() {
        let engine = CrawlEngine::new(
            vec![Stub::new("failing", broken), Stub::new("rejected", thin)],
            ContentValidator::new(),
        );
        assert!(matches!(engine.crawl("https://news.example/a").await, CrawlOutcome::NotFound));
    }

    #[tokio::test]
    async fn adding_a_strategy_never_loses_a_success() {
        let alone = CrawlEngine::new(vec![Stub::new("good", good)], ContentValidator::new());
        let extended = CrawlEngine::new(
            vec![Stub::new("failing", broken), Stub::new("good", good)],
            ContentValidator::new(),
        );
        assert!(alone.crawl("https://news.example/a").await.into_article().is_some());
        assert!(extended.crawl("https://news.example/a").await.into_article().is_some());
    }
}
