//! Persistence of enriched articles to every configured store.
//!
//! [`FanoutWriter`] writes each article to four independent stores. A failure
//! in one store never blocks or rolls back the others; the write counts as a
//! success when the relational store and the search index both accepted it.
//! The cache and the local table are best effort.

mod cache;
mod local;
mod relational;
mod search;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub use self::cache::{CacheStore, RECENT_ARTICLES_KEY};
pub use self::local::LocalStore;
pub use self::relational::{RelationalArticle, RelationalStore, CONTENT_LIMIT};
pub use self::search::SearchIndex;

use crate::config::StorageSettings;
use crate::error::StoreError;
use crate::model::{EnrichedArticle, PersistResult, StoreStatus};
use crate::TARGET_STORAGE;

pub const RELATIONAL: &str = "relational";
pub const SEARCH: &str = "search";
pub const CACHE: &str = "cache";
pub const LOCAL: &str = "local";

#[async_trait]
pub trait ArticleStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Idempotent write keyed by `article.article_id`.
    async fn store(&self, article: &EnrichedArticle) -> Result<(), StoreError>;
}

pub struct FanoutWriter {
    relational: Arc<dyn ArticleStore>,
    search: Arc<dyn ArticleStore>,
    cache: Arc<dyn ArticleStore>,
    local: Arc<dyn ArticleStore>,
}

async fn write(role: &'static str, store: &dyn ArticleStore, article: &EnrichedArticle) -> StoreStatus {
    match store.store(article).await {
        Ok(()) => StoreStatus {
            store: role.to_string(),
            ok: true,
            error: None,
        },
        Err(e) => {
            if role == CACHE || role == LOCAL {
                warn!(target: TARGET_STORAGE, "{} write ({}) failed for {}: {}", role, store.name(), article.article_id, e);
            } else {
                error!(target: TARGET_STORAGE, "{} write ({}) failed for {}: {}", role, store.name(), article.article_id, e);
            }
            StoreStatus {
                store: role.to_string(),
                ok: false,
                error: Some(e.to_string()),
            }
        }
    }
}

impl FanoutWriter {
    pub fn new(
        relational: Arc<dyn ArticleStore>,
        search: Arc<dyn ArticleStore>,
        cache: Arc<dyn ArticleStore>,
        local: Arc<dyn ArticleStore>,
    ) -> Self {
        Self {
            relational,
            search,
            cache,
            local,
        }
    }

    /// Builds the production stores. Connections are opened lazily so an
    /// unreachable store shows up as failed writes, not as a startup error.
    pub async fn connect(settings: &StorageSettings) -> Result<Self, StoreError> {
        let relational = RelationalStore::connect_lazy(&settings.relational_url)?;
        let search = SearchIndex::new(&settings.search_url, &settings.search_index)?;
        let cache = CacheStore::new(&settings.redis_url, settings.cache_ttl_seconds, settings.recent_items)?;
        let local = LocalStore::open(&settings.local_path).await?;
        info!(target: TARGET_STORAGE, "Storage fan-out ready (search index {})", settings.search_index);

        Ok(Self::new(
            Arc::new(relational),
            Arc::new(search),
            Arc::new(cache),
            Arc::new(local),
        ))
    }

    #[instrument(target = "storage", level = "info", skip(self, article), fields(article_id = %article.article_id))]
    pub async fn persist(&self, article: &EnrichedArticle) -> PersistResult {
        let (relational, search, cache, local) = tokio::join!(
            write(RELATIONAL, self.relational.as_ref(), article),
            write(SEARCH, self.search.as_ref(), article),
            write(CACHE, self.cache.as_ref(), article),
            write(LOCAL, self.local.as_ref(), article),
        );

        let success = relational.ok && search.ok;
        if success {
            info!(target: TARGET_STORAGE, "Stored {} ({})", article.article_id, article.url);
        } else {
            error!(target: TARGET_STORAGE, "Primary stores rejected {} ({})", article.article_id, article.url);
        }

        PersistResult {
            success,
            article_id: article.article_id.clone(),
            stores: vec![relational, search, cache, local],
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::sample_article;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeStore {
        fail: bool,
        writes: AtomicUsize,
    }

    impl FakeStore {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(FakeStore {
                fail,
                writes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ArticleStore for FakeStore {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn store(&self, _article: &EnrichedArticle) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(StoreError::Search("unavailable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn writer(fails: [bool; 4]) -> (FanoutWriter, Vec<Arc<FakeStore>>) {
        let stores: Vec<Arc<FakeStore>> = fails.iter().map(|f| FakeStore::new(*f)).collect();
        let writer = FanoutWriter::new(
            stores[0].clone(),
            stores[1].clone(),
            stores[2].clone(),
            stores[3].clone(),
        );
        (writer, stores)
    }

    #[tokio::test]
    async fn cache_failure_is_not_fatal() {
        let (writer, _) = writer([false, false, true, false]);
        let result = writer.persist(&sample_article("https://news.example/a")).await;
        assert!(result.success);
        assert!(!result.status_of(CACHE).unwrap().ok);
        assert!(result.status_of(CACHE).unwrap().error.is_some());
    }

    #[tokio::test]
    async fn search_failure_fails_the_write_but_others_still_run() {
        let (writer, stores) = writer([false, true, false, false]);
        let result = writer.persist(&sample_article("https://news.example/a")).await;
        assert!(!result.success);
        assert!(result.status_of(RELATIONAL).unwrap().ok);
        assert!(!result.status_of(SEARCH).unwrap().ok);
        for store in &stores {
            assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn relational_failure_fails_the_write() {
        let (writer, _) = writer([true, false, false, false]);
        let article = sample_article("https://news.example/a");
        let result = writer.persist(&article).await;
        assert!(!result.success);
        assert_eq!(result.article_id, article.article_id);
        assert_eq!(result.stores.len(), 4);
    }
}
