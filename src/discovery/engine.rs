use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::feed::parse_feed;
use super::sitemap::{parse_sitemap, SitemapDocument};
use super::visited::VisitedSet;
use crate::config::SourceConfig;
use crate::error::DiscoveryError;
use crate::http::{FetchProfile, HttpFetcher};
use crate::model::{DiscoveredUrl, SourceKind};
use crate::util::visited_key;
use crate::TARGET_WEB_REQUEST;

/// Enumerates candidate URLs from the configured feeds and sitemaps.
pub struct DiscoveryEngine {
    fetcher: HttpFetcher,
    sources: Vec<SourceConfig>,
    visited: Arc<dyn VisitedSet>,
}

impl DiscoveryEngine {
    pub fn new(fetcher: HttpFetcher, sources: Vec<SourceConfig>, visited: Arc<dyn VisitedSet>) -> Self {
        let sources = sources.into_iter().filter(|s| s.enabled).collect();
        Self {
            fetcher,
            sources,
            visited,
        }
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// One discovery run: unseen URLs from every source, highest priority
    /// first. Each emitted URL is marked visited.
    pub async fn run(&self) -> Vec<DiscoveredUrl> {
        let urls = self.unseen(self.collect().await).await;
        for discovered in &urls {
            if let Err(e) = self.visited.insert(&visited_key(&discovered.url)).await {
                error!(target: TARGET_WEB_REQUEST, "Failed to mark {} visited: {}", discovered.url, e);
            }
        }
        info!(target: TARGET_WEB_REQUEST, "Discovery found {} new URLs", urls.len());
        urls
    }

    /// Same result as [`run`](Self::run) but leaves the visited set untouched.
    pub async fn preview(&self) -> Vec<DiscoveredUrl> {
        self.unseen(self.collect().await).await
    }

    async fn collect(&self) -> Vec<DiscoveredUrl> {
        let results = join_all(self.sources.iter().map(|source| self.discover_source(source))).await;

        let mut all = Vec::new();
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(urls) => {
                    debug!(target: TARGET_WEB_REQUEST, "{} source {} yielded {} URLs", source.kind, source.url, urls.len());
                    all.extend(urls);
                }
                Err(e) => warn!(target: TARGET_WEB_REQUEST, "Skipping {} source {}: {}", source.kind, source.url, e),
            }
        }
        dedup_and_sort(all)
    }

    async fn unseen(&self, urls: Vec<DiscoveredUrl>) -> Vec<DiscoveredUrl> {
        let mut fresh = Vec::with_capacity(urls.len());
        for discovered in urls {
            match self.visited.contains(&visited_key(&discovered.url)).await {
                Ok(true) => continue,
                Ok(false) => fresh.push(discovered),
                Err(e) => {
                    // an unavailable visited set must not stall discovery
                    warn!(target: TARGET_WEB_REQUEST, "Visited check failed for {}: {}", discovered.url, e);
                    fresh.push(discovered);
                }
            }
        }
        fresh
    }

    #[instrument(target = "web_request", level = "debug", skip(self, source), fields(url = %source.url))]
    pub async fn discover_source(&self, source: &SourceConfig) -> Result<Vec<DiscoveredUrl>, DiscoveryError> {
        match source.kind {
            SourceKind::Feed => self.discover_feed(&source.url).await,
            SourceKind::Sitemap => self.discover_sitemap(&source.url).await,
        }
    }

    async fn discover_feed(&self, url: &str) -> Result<Vec<DiscoveredUrl>, DiscoveryError> {
        let raw = self.fetcher.fetch(url, FetchProfile::Feed, "discovery").await?;
        let entries = parse_feed(&raw.body, url)?;
        Ok(entries
            .into_iter()
            .map(|entry| DiscoveredUrl::new(&entry.url, entry.title, SourceKind::Feed))
            .collect())
    }

    async fn discover_sitemap(&self, url: &str) -> Result<Vec<DiscoveredUrl>, DiscoveryError> {
        let raw = self.fetcher.fetch(url, FetchProfile::Sitemap, "discovery").await?;
        let locations = match parse_sitemap(&raw.body, url)? {
            SitemapDocument::UrlSet(locations) => locations,
            SitemapDocument::Index(children) => {
                let mut locations = Vec::new();
                for child in children {
                    match self.nested_sitemap(&child).await {
                        Ok(found) => locations.extend(found),
                        Err(e) => warn!(target: TARGET_WEB_REQUEST, "Skipping nested sitemap {}: {}", child, e),
                    }
                }
                locations
            }
        };
        Ok(locations
            .iter()
            .map(|loc| DiscoveredUrl::new(loc, None, SourceKind::Sitemap))
            .collect())
    }

    async fn nested_sitemap(&self, url: &str) -> Result<Vec<String>, DiscoveryError> {
        let raw = self.fetcher.fetch(url, FetchProfile::Sitemap, "discovery").await?;
        match parse_sitemap(&raw.body, url)? {
            SitemapDocument::UrlSet(locations) => Ok(locations),
            SitemapDocument::Index(_) => Err(DiscoveryError::Sitemap {
                url: url.to_string(),
                reason: "sitemap indexes are followed one level deep only".to_string(),
            }),
        }
    }
}

/// Keeps the highest priority entry per URL, then orders by priority
/// descending. Equal priorities keep their discovery order.
pub fn dedup_and_sort(urls: Vec<DiscoveredUrl>) -> Vec<DiscoveredUrl> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<DiscoveredUrl> = Vec::with_capacity(urls.len());
    for discovered in urls {
        match position.get(&discovered.url) {
            Some(&i) => {
                if discovered.priority > unique[i].priority {
                    unique[i] = discovered;
                }
            }
            None => {
                position.insert(discovered.url.clone(), unique.len());
                unique.push(discovered);
            }
        }
    }
    unique.sort_by(|a, b| b.priority.cmp(&a.priority));
    unique
}
