//! Drives discover, crawl, enrich and persist cycles.

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::crawl::{CrawlEngine, CrawlOutcome};
use crate::discovery::{visited, DiscoveryEngine};
use crate::enrich::EnrichmentProcessor;
use crate::http::HttpFetcher;
use crate::model::{CycleReport, DiscoveredUrl};
use crate::storage::FanoutWriter;
use crate::validate::RecordValidator;
use crate::TARGET_PIPELINE;

#[derive(Debug, Clone, Copy)]
pub struct CycleSettings {
    pub max_concurrent_crawls: usize,
    pub crawl_timeout: Duration,
    pub interval: Duration,
}

impl From<&Settings> for CycleSettings {
    fn from(settings: &Settings) -> Self {
        CycleSettings {
            max_concurrent_crawls: settings.crawler.max_concurrent_crawls,
            crawl_timeout: settings.crawler.crawl_timeout(),
            interval: settings.crawler.crawl_interval(),
        }
    }
}

/// What became of one discovered URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UrlOutcome {
    NotFound,
    TimedOut,
    /// Crawled but failed a hard record check, so never written.
    Unpersistable,
    PersistFailed,
    Stored,
}

/// Totals across every cycle of a long-running process.
#[derive(Debug, Clone)]
pub struct RunTotals {
    started: Instant,
    pub cycles: usize,
    pub urls_discovered: usize,
    pub articles_crawled: usize,
    pub articles_enriched: usize,
    pub articles_stored: usize,
    pub errors: usize,
}

impl Default for RunTotals {
    fn default() -> Self {
        RunTotals {
            started: Instant::now(),
            cycles: 0,
            urls_discovered: 0,
            articles_crawled: 0,
            articles_enriched: 0,
            articles_stored: 0,
            errors: 0,
        }
    }
}

impl RunTotals {
    pub fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.urls_discovered += report.urls_discovered;
        self.articles_crawled += report.articles_crawled;
        self.articles_enriched += report.articles_enriched;
        self.articles_stored += report.articles_stored;
        self.errors += report.errors;
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn articles_per_hour(&self) -> f64 {
        let hours = self.uptime().as_secs_f64() / 3600.0;
        if hours > 0.0 {
            self.articles_stored as f64 / hours
        } else {
            0.0
        }
    }
}

pub struct Orchestrator {
    discovery: DiscoveryEngine,
    crawler: Arc<CrawlEngine>,
    enrichment: Arc<EnrichmentProcessor>,
    validator: Arc<RecordValidator>,
    writer: Arc<FanoutWriter>,
    settings: CycleSettings,
}

impl Orchestrator {
    pub fn new(
        discovery: DiscoveryEngine,
        crawler: CrawlEngine,
        enrichment: EnrichmentProcessor,
        validator: RecordValidator,
        writer: FanoutWriter,
        settings: CycleSettings,
    ) -> Self {
        Self {
            discovery,
            crawler: Arc::new(crawler),
            enrichment: Arc::new(enrichment),
            validator: Arc::new(validator),
            writer: Arc::new(writer),
            settings,
        }
    }

    /// Wires the production components from validated settings.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(settings.crawler.request_timeout())?;
        let visited = visited::from_settings(&settings.visited, &settings.storage.redis_url)?;
        let discovery = DiscoveryEngine::new(fetcher.clone(), settings.enabled_sources(), Arc::from(visited));
        let crawler = CrawlEngine::with_default_strategies(fetcher);
        let writer = FanoutWriter::connect(&settings.storage).await?;
        let validator = RecordValidator::new(settings.validation.blocked_domains.clone());

        Ok(Self::new(
            discovery,
            crawler,
            EnrichmentProcessor::new(),
            validator,
            writer,
            CycleSettings::from(settings),
        ))
    }

    pub fn discovery(&self) -> &DiscoveryEngine {
        &self.discovery
    }

    pub fn crawler(&self) -> &CrawlEngine {
        &self.crawler
    }

    /// One full cycle. Individual URL failures are counted, never propagated.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        info!(target: TARGET_PIPELINE, "Starting cycle");

        let discovered = self.discovery.run().await;
        let urls_discovered = discovered.len();

        let permits = Arc::new(Semaphore::new(self.settings.max_concurrent_crawls.max(1)));
        let handles: Vec<_> = discovered
            .into_iter()
            .map(|url| {
                let permits = permits.clone();
                let crawler = self.crawler.clone();
                let enrichment = self.enrichment.clone();
                let validator = self.validator.clone();
                let writer = self.writer.clone();
                let crawl_timeout = self.settings.crawl_timeout;
                tokio::spawn(async move {
                    process_url(url, permits, crawler, enrichment, validator, writer, crawl_timeout).await
                })
            })
            .collect();

        let mut report = CycleReport {
            urls_discovered,
            ..Default::default()
        };
        for joined in join_all(handles).await {
            match joined {
                Ok(outcome) => tally(&mut report, outcome),
                Err(e) => {
                    error!(target: TARGET_PIPELINE, "Crawl task failed: {}", e);
                    report.errors += 1;
                }
            }
        }

        report.cycle_time_seconds = started.elapsed().as_secs_f64();
        report.success_rate = if urls_discovered > 0 {
            report.articles_stored as f64 / urls_discovered as f64
        } else {
            0.0
        };

        info!(
            target: TARGET_PIPELINE,
            "Cycle finished in {:.1}s: {} discovered, {} crawled, {} enriched, {} stored, {} errors",
            report.cycle_time_seconds,
            report.urls_discovered,
            report.articles_crawled,
            report.articles_enriched,
            report.articles_stored,
            report.errors
        );
        report
    }

    /// Runs cycles until `cancel` turns true. The signal is checked before
    /// each cycle and during the pause between cycles; a cycle in progress
    /// always completes.
    pub async fn run_loop(&self, mut cancel: watch::Receiver<bool>) -> RunTotals {
        let mut totals = RunTotals::default();

        loop {
            if *cancel.borrow() {
                info!(target: TARGET_PIPELINE, "Stop requested, not starting another cycle");
                break;
            }

            let report = self.run_cycle().await;
            totals.record(&report);
            info!(
                target: TARGET_PIPELINE,
                "Totals after {} cycles: up {}s, {} discovered, {} stored, {} errors, {:.1} articles/hour",
                totals.cycles,
                totals.uptime().as_secs(),
                totals.urls_discovered,
                totals.articles_stored,
                totals.errors,
                totals.articles_per_hour()
            );

            if *cancel.borrow() {
                break;
            }
            debug!(target: TARGET_PIPELINE, "Sleeping {:?} until next cycle", self.settings.interval);
            tokio::select! {
                _ = sleep(self.settings.interval) => {}
                changed = cancel.changed() => {
                    if changed.is_err() {
                        // sender dropped: nobody can ask us to stop any more
                        sleep(self.settings.interval).await;
                    }
                }
            }
        }

        totals
    }
}

fn tally(report: &mut CycleReport, outcome: UrlOutcome) {
    match outcome {
        UrlOutcome::NotFound | UrlOutcome::TimedOut => report.errors += 1,
        UrlOutcome::Unpersistable => {
            report.articles_crawled += 1;
            report.errors += 1;
        }
        UrlOutcome::PersistFailed => {
            report.articles_crawled += 1;
            report.articles_enriched += 1;
            report.errors += 1;
        }
        UrlOutcome::Stored => {
            report.articles_crawled += 1;
            report.articles_enriched += 1;
            report.articles_stored += 1;
        }
    }
}

async fn process_url(
    discovered: DiscoveredUrl,
    permits: Arc<Semaphore>,
    crawler: Arc<CrawlEngine>,
    enrichment: Arc<EnrichmentProcessor>,
    validator: Arc<RecordValidator>,
    writer: Arc<FanoutWriter>,
    crawl_timeout: Duration,
) -> UrlOutcome {
    let url = discovered.url.as_str();

    let outcome = {
        // the semaphore is never closed, so acquiring only waits
        let _permit = permits.acquire_owned().await.ok();
        timeout(crawl_timeout, crawler.crawl(url)).await
    };

    let candidate = match outcome {
        Ok(CrawlOutcome::Found(candidate)) => candidate,
        Ok(CrawlOutcome::NotFound) => return UrlOutcome::NotFound,
        Err(_) => {
            warn!(target: TARGET_PIPELINE, "Crawl of {} exceeded {:?}, dropping it from this cycle", url, crawl_timeout);
            return UrlOutcome::TimedOut;
        }
    };

    let validation = validator.validate(&candidate);
    if !validation.persistable {
        warn!(target: TARGET_PIPELINE, "Not persisting {}: {}", url, validation.errors.join("; "));
        return UrlOutcome::Unpersistable;
    }
    if !validation.is_valid {
        debug!(target: TARGET_PIPELINE, "Record checks for {} found: {}", url, validation.errors.join("; "));
    }

    let article = enrichment.enrich(candidate, Some(&validation), Some(discovered.source));
    let result = writer.persist(&article).await;
    if result.success {
        UrlOutcome::Stored
    } else {
        UrlOutcome::PersistFailed
    }
}
