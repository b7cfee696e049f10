use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{ArticleStore, CACHE};
use crate::error::StoreError;
use crate::model::EnrichedArticle;
use crate::TARGET_STORAGE;

pub const RECENT_ARTICLES_KEY: &str = "recent_articles";

pub fn article_key(article_id: &str) -> String {
    format!("article:{}", article_id)
}

/// Metadata kept in the cache; the full text lives in the other stores.
pub fn snapshot(article: &EnrichedArticle) -> Value {
    json!({
        "article_id": article.article_id,
        "url": article.url,
        "title": article.title,
        "domain": article.domain,
        "summary": article.summary,
        "category": article.category,
        "language": article.language,
        "quality_score": article.quality_score,
        "read_time": article.read_time,
        "sentiment": article.sentiment.label.to_string(),
        "processing_timestamp": article.processing_timestamp.to_rfc3339(),
    })
}

/// Snapshot write plus recent-list update as one atomic pipeline.
pub fn recent_list_pipeline(
    article_id: &str,
    payload: &str,
    ttl_seconds: u64,
    recent_items: usize,
) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .set_ex(article_key(article_id), payload, ttl_seconds)
        .ignore()
        .lrem(RECENT_ARTICLES_KEY, 0, article_id)
        .ignore()
        .lpush(RECENT_ARTICLES_KEY, article_id)
        .ignore()
        .ltrim(RECENT_ARTICLES_KEY, 0, recent_items as isize - 1)
        .ignore();
    pipe
}

/// Short-lived metadata snapshots plus a bounded list of recent article ids.
pub struct CacheStore {
    client: redis::Client,
    ttl_seconds: u64,
    recent_items: usize,
}

impl CacheStore {
    pub fn new(redis_url: &str, ttl_seconds: u64, recent_items: usize) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            ttl_seconds,
            recent_items: recent_items.max(1),
        })
    }

    #[instrument(target = "storage", level = "debug", skip(self, article), fields(article_id = %article.article_id))]
    async fn cache(&self, article: &EnrichedArticle) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&snapshot(article))?;
        let mut con = self.client.get_multiplexed_async_connection().await?;

        // re-persisting moves the id to the front instead of duplicating it
        let _: () = recent_list_pipeline(
            &article.article_id,
            &payload,
            self.ttl_seconds,
            self.recent_items,
        )
        .query_async(&mut con)
        .await?;

        debug!(target: TARGET_STORAGE, "Cached {} for {}s", article.article_id, self.ttl_seconds);
        Ok(())
    }

    /// Newest first.
    pub async fn recent_article_ids(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let ids: Vec<String> = con.lrange(RECENT_ARTICLES_KEY, 0, limit as isize - 1).await?;
        Ok(ids)
    }

    pub async fn cached_snapshot(&self, article_id: &str) -> Result<Option<Value>, StoreError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = con.get(article_key(article_id)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ArticleStore for CacheStore {
    fn name(&self) -> &'static str {
        CACHE
    }

    async fn store(&self, article: &EnrichedArticle) -> Result<(), StoreError> {
        self.cache(article).await
    }
}
