use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, instrument};

use super::core::{Database, DbLockErrorExt};
use crate::db::Row;
use crate::error::StoreError;
use crate::model::{EnrichedArticle, Entities, Sentiment};
use crate::TARGET_DB;

/// A row of the enriched-record table with its JSON columns decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArticle {
    pub article_id: String,
    pub url: String,
    pub domain: String,
    pub title: String,
    pub content_hash: String,
    pub authors: Vec<String>,
    pub publish_date: Option<String>,
    pub language: Option<String>,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub entities: Entities,
    pub topics: Vec<String>,
    pub category: Option<String>,
    pub sentiment: Sentiment,
    pub read_time: i64,
    pub quality_score: i64,
    pub confidence_score: f64,
    pub engine_used: Option<String>,
    pub updated_at: String,
}

fn decode<T: serde::de::DeserializeOwned + Default>(raw: &str) -> T {
    serde_json::from_str(raw).unwrap_or_default()
}

impl StoredArticle {
    fn from_row(row: &SqliteRow) -> Self {
        StoredArticle {
            article_id: row.get("article_id"),
            url: row.get("url"),
            domain: row.get("domain"),
            title: row.get("title"),
            content_hash: row.get("content_hash"),
            authors: decode(row.get::<&str, _>("authors")),
            publish_date: row.get("publish_date"),
            language: row.get("language"),
            summary: row.get("summary"),
            keywords: decode(row.get::<&str, _>("keywords")),
            entities: decode(row.get::<&str, _>("entities")),
            topics: decode(row.get::<&str, _>("topics")),
            category: row.get("category"),
            sentiment: decode(row.get::<&str, _>("sentiment")),
            read_time: row.get("read_time"),
            quality_score: row.get("quality_score"),
            confidence_score: row.get("confidence_score"),
            engine_used: row.get("engine_used"),
            updated_at: row.get("updated_at"),
        }
    }
}

const SELECT_COLUMNS: &str = "article_id, url, domain, title, content_hash, authors, publish_date, language, summary, keywords, entities, topics, category, sentiment, read_time, quality_score, confidence_score, engine_used, updated_at";

impl Database {
    /// Insert or replace the enriched record for `article.article_id`.
    /// Collection fields are stored as JSON and replaced wholesale.
    #[instrument(target = "db_query", level = "info", skip(self, article), fields(article_id = %article.article_id))]
    pub async fn upsert_enhanced_article(&self, article: &EnrichedArticle) -> Result<(), StoreError> {
        let authors = serde_json::to_string(&article.authors)?;
        let images = serde_json::to_string(&article.images)?;
        let keywords = serde_json::to_string(&article.keywords)?;
        let entities = serde_json::to_string(&article.entities)?;
        let topics = serde_json::to_string(&article.topics)?;
        let sentiment = serde_json::to_string(&article.sentiment)?;
        let now = Utc::now().to_rfc3339();
        let processed = article.processing_timestamp.to_rfc3339();
        let source = article.discovery_source.map(|s| s.to_string());

        debug!(target: TARGET_DB, "Adding/updating enhanced article: {}", article.url);

        let mut backoff = 100; // initial delay in milliseconds
        let max_retries = 5;

        for attempt in 1..=max_retries {
            let result = sqlx::query(
                r#"
                INSERT INTO enhanced_articles (
                    article_id, url, domain, title, content, content_hash, authors, publish_date,
                    images, description, language, excerpt, summary, keywords, entities, topics,
                    category, sentiment, read_time, word_count, content_length, quality_score,
                    confidence_score, engine_used, crawl_time, discovery_source,
                    processing_timestamp, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                        ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?28)
                ON CONFLICT(article_id) DO UPDATE SET
                    url = excluded.url,
                    domain = excluded.domain,
                    title = excluded.title,
                    content = excluded.content,
                    content_hash = excluded.content_hash,
                    authors = excluded.authors,
                    publish_date = excluded.publish_date,
                    images = excluded.images,
                    description = excluded.description,
                    language = excluded.language,
                    excerpt = excluded.excerpt,
                    summary = excluded.summary,
                    keywords = excluded.keywords,
                    entities = excluded.entities,
                    topics = excluded.topics,
                    category = excluded.category,
                    sentiment = excluded.sentiment,
                    read_time = excluded.read_time,
                    word_count = excluded.word_count,
                    content_length = excluded.content_length,
                    quality_score = excluded.quality_score,
                    confidence_score = excluded.confidence_score,
                    engine_used = excluded.engine_used,
                    crawl_time = excluded.crawl_time,
                    discovery_source = excluded.discovery_source,
                    processing_timestamp = excluded.processing_timestamp,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&article.article_id)
            .bind(&article.url)
            .bind(&article.domain)
            .bind(&article.title)
            .bind(&article.content)
            .bind(&article.content_hash)
            .bind(&authors)
            .bind(&article.publish_date)
            .bind(&images)
            .bind(&article.description)
            .bind(&article.language)
            .bind(&article.excerpt)
            .bind(&article.summary)
            .bind(&keywords)
            .bind(&entities)
            .bind(&topics)
            .bind(&article.category)
            .bind(&sentiment)
            .bind(article.read_time as i64)
            .bind(article.word_count as i64)
            .bind(article.content_length as i64)
            .bind(article.quality_score as i64)
            .bind(article.confidence_score)
            .bind(&article.engine_used)
            .bind(article.crawl_time)
            .bind(&source)
            .bind(&processed)
            .bind(&now)
            .execute(self.pool())
            .await;

            match result {
                Ok(_) => {
                    debug!(target: TARGET_DB, "Enhanced article stored: {}", article.article_id);
                    return Ok(());
                }
                Err(err) => {
                    if err.is_database_lock_error() {
                        info!(target: TARGET_DB, "Database is locked, waiting {}ms before retrying attempt {}/{}: {}", backoff, attempt, max_retries, article.article_id);
                        sleep(Duration::from_millis(backoff)).await;
                        backoff = backoff.saturating_mul(2);
                        if attempt == max_retries {
                            let random_jitter = rand::rng().random_range(0..200);
                            backoff += random_jitter;
                            sleep(Duration::from_millis(backoff)).await;
                        }
                    } else {
                        error!(target: TARGET_DB, "Failed to store enhanced article: {}", err);
                        return Err(err.into());
                    }
                }
            }
        }

        Err(StoreError::Database(sqlx::Error::Protocol(
            "Maximum retries exceeded for storing enhanced article".into(),
        )))
    }

    pub async fn get_enhanced_article(&self, article_id: &str) -> Result<Option<StoredArticle>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM enhanced_articles WHERE article_id = ?1",
            SELECT_COLUMNS
        ))
        .bind(article_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.as_ref().map(StoredArticle::from_row))
    }

    /// Most recently written records first.
    pub async fn recent_enhanced_articles(&self, limit: i64) -> Result<Vec<StoredArticle>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM enhanced_articles ORDER BY updated_at DESC LIMIT ?1",
            SELECT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(StoredArticle::from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CandidateArticle, SourceKind};
    use crate::enrich::EnrichmentProcessor;

    fn article(url: &str, content: &str) -> EnrichedArticle {
        let candidate = CandidateArticle {
            title: "Council approves riverside park".to_string(),
            content: content.to_string(),
            authors: vec!["Jane Reporter".to_string()],
            domain: "news.example".to_string(),
            url: url.to_string(),
            engine_used: "fallback".to_string(),
            ..Default::default()
        };
        EnrichmentProcessor::new().enrich(candidate, None, Some(SourceKind::Feed))
    }

    async fn database() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn upsert_is_idempotent_and_replaces_collections() {
        let (db, _dir) = database().await;
        let mut first = article("https://news.example/a", "The council met in Springfield to vote on the park plan.");
        db.upsert_enhanced_article(&first).await.unwrap();

        first.keywords = vec!["park".to_string()];
        db.upsert_enhanced_article(&first).await.unwrap();
        db.upsert_enhanced_article(&first).await.unwrap();

        assert_eq!(db.count_articles().await.unwrap(), 1);
        let stored = db.get_enhanced_article(&first.article_id).await.unwrap().unwrap();
        assert_eq!(stored.keywords, vec!["park".to_string()]);
        assert_eq!(stored.authors, vec!["Jane Reporter".to_string()]);
        assert_eq!(stored.entities, first.entities);
        assert_eq!(stored.engine_used.as_deref(), Some("fallback"));
    }

    #[tokio::test]
    async fn missing_article_is_none() {
        let (db, _dir) = database().await;
        assert!(db.get_enhanced_article("article_nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recent_articles_are_limited() {
        let (db, _dir) = database().await;
        for i in 0..3 {
            let a = article(&format!("https://news.example/{}", i), "Some body text for the record.");
            db.upsert_enhanced_article(&a).await.unwrap();
        }
        assert_eq!(db.recent_enhanced_articles(2).await.unwrap().len(), 2);
    }
}
