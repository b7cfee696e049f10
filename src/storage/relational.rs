//! Relational article table plus per-entity rows, through the sqlx `Any`
//! driver so the same statements run on PostgreSQL and SQLite.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use super::{ArticleStore, RELATIONAL};
use crate::entity::EntityType;
use crate::error::StoreError;
use crate::model::EnrichedArticle;
use crate::util::take_chars;
use crate::TARGET_DB;

/// Longest content prefix kept in the relational table.
pub const CONTENT_LIMIT: usize = 10_000;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS articles (
        article_id TEXT PRIMARY KEY,
        url TEXT NOT NULL,
        domain TEXT NOT NULL,
        title TEXT NOT NULL,
        content TEXT,
        content_hash TEXT,
        authors TEXT,
        publish_date TEXT,
        language TEXT,
        category TEXT,
        summary TEXT,
        excerpt TEXT,
        keywords TEXT,
        topics TEXT,
        sentiment_label TEXT,
        sentiment_polarity DOUBLE PRECISION,
        read_time BIGINT,
        word_count BIGINT,
        quality_score BIGINT,
        confidence_score DOUBLE PRECISION,
        engine_used TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_articles_domain ON articles (domain)",
    "CREATE INDEX IF NOT EXISTS idx_articles_category ON articles (category)",
    r#"CREATE TABLE IF NOT EXISTS article_entities (
        article_id TEXT NOT NULL,
        entity_type TEXT NOT NULL,
        entity_name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (article_id, entity_type, entity_name)
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_article_entities_name ON article_entities (entity_name)",
];

const UPSERT_ARTICLE: &str = r#"
    INSERT INTO articles (
        article_id, url, domain, title, content, content_hash, authors, publish_date,
        language, category, summary, excerpt, keywords, topics, sentiment_label,
        sentiment_polarity, read_time, word_count, quality_score, confidence_score,
        engine_used, created_at, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
            $17, $18, $19, $20, $21, $22, $23)
    ON CONFLICT (article_id) DO UPDATE SET
        url = excluded.url,
        domain = excluded.domain,
        title = excluded.title,
        content = excluded.content,
        content_hash = excluded.content_hash,
        authors = excluded.authors,
        publish_date = excluded.publish_date,
        language = excluded.language,
        category = excluded.category,
        summary = excluded.summary,
        excerpt = excluded.excerpt,
        keywords = excluded.keywords,
        topics = excluded.topics,
        sentiment_label = excluded.sentiment_label,
        sentiment_polarity = excluded.sentiment_polarity,
        read_time = excluded.read_time,
        word_count = excluded.word_count,
        quality_score = excluded.quality_score,
        confidence_score = excluded.confidence_score,
        engine_used = excluded.engine_used,
        updated_at = excluded.updated_at
"#;

const INSERT_ENTITY: &str = r#"
    INSERT INTO article_entities (article_id, entity_type, entity_name, created_at)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (article_id, entity_type, entity_name) DO NOTHING
"#;

/// Summary columns of a stored article row.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationalArticle {
    pub article_id: String,
    pub url: String,
    pub domain: String,
    pub title: String,
    pub category: Option<String>,
    pub quality_score: Option<i64>,
}

pub struct RelationalStore {
    pool: AnyPool,
    schema: OnceCell<()>,
}

impl RelationalStore {
    /// Builds the pool without connecting; the schema is created on first use.
    pub fn connect_lazy(database_url: &str) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)?;
        Ok(Self {
            pool,
            schema: OnceCell::new(),
        })
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.schema
            .get_or_try_init(|| async {
                for statement in SCHEMA {
                    sqlx::query(statement).execute(&self.pool).await?;
                }
                info!(target: TARGET_DB, "Relational schema initialized");
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }

    #[instrument(target = "db_query", level = "debug", skip(self, article), fields(article_id = %article.article_id))]
    async fn upsert(&self, article: &EnrichedArticle) -> Result<(), StoreError> {
        self.ensure_schema().await?;

        let now = Utc::now().to_rfc3339();
        let authors = serde_json::to_string(&article.authors)?;
        let keywords = serde_json::to_string(&article.keywords)?;
        let topics = serde_json::to_string(&article.topics)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(UPSERT_ARTICLE)
            .bind(article.article_id.clone())
            .bind(article.url.clone())
            .bind(article.domain.clone())
            .bind(article.title.clone())
            .bind(take_chars(&article.content, CONTENT_LIMIT))
            .bind(article.content_hash.clone())
            .bind(authors)
            .bind(article.publish_date.clone())
            .bind(article.language.clone())
            .bind(article.category.clone())
            .bind(article.summary.clone())
            .bind(article.excerpt.clone())
            .bind(keywords)
            .bind(topics)
            .bind(article.sentiment.label.to_string())
            .bind(article.sentiment.polarity)
            .bind(article.read_time as i64)
            .bind(article.word_count as i64)
            .bind(article.quality_score as i64)
            .bind(article.confidence_score)
            .bind(article.engine_used.clone())
            .bind(now.clone())
            .bind(now.clone())
            .execute(&mut *tx)
            .await?;

        let rows = article.entities.rows();
        for (entity_type, name) in &rows {
            sqlx::query(INSERT_ENTITY)
                .bind(article.article_id.clone())
                .bind(entity_type.to_string())
                .bind(name.to_string())
                .bind(now.clone())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(target: TARGET_DB, "Upserted {} with {} entity rows", article.article_id, rows.len());
        Ok(())
    }

    pub async fn get_article(&self, article_id: &str) -> Result<Option<RelationalArticle>, StoreError> {
        self.ensure_schema().await?;
        let row: Option<AnyRow> = sqlx::query(
            "SELECT article_id, url, domain, title, category, quality_score FROM articles WHERE article_id = $1",
        )
        .bind(article_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| RelationalArticle {
            article_id: row.get("article_id"),
            url: row.get("url"),
            domain: row.get("domain"),
            title: row.get("title"),
            category: row.get("category"),
            quality_score: row.get("quality_score"),
        }))
    }

    pub async fn entity_names(&self, article_id: &str, entity_type: EntityType) -> Result<Vec<String>, StoreError> {
        self.ensure_schema().await?;
        let names = sqlx::query_scalar::<_, String>(
            "SELECT entity_name FROM article_entities WHERE article_id = $1 AND entity_type = $2 ORDER BY entity_name",
        )
        .bind(article_id.to_string())
        .bind(entity_type.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    pub async fn count_articles(&self) -> Result<i64, StoreError> {
        self.ensure_schema().await?;
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl ArticleStore for RelationalStore {
    fn name(&self) -> &'static str {
        RELATIONAL
    }

    async fn store(&self, article: &EnrichedArticle) -> Result<(), StoreError> {
        self.upsert(article).await
    }
}
