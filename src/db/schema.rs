use tracing::info;

use super::core::Database;
use crate::TARGET_DB;

impl Database {
    pub(crate) async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS enhanced_articles (
                article_id TEXT PRIMARY KEY,
                url TEXT NOT NULL,
                domain TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                authors TEXT NOT NULL, -- JSON array
                publish_date TEXT,
                images TEXT NOT NULL, -- JSON array
                description TEXT,
                language TEXT,
                excerpt TEXT,
                summary TEXT,
                keywords TEXT NOT NULL, -- JSON array
                entities TEXT NOT NULL, -- JSON object keyed by entity type
                topics TEXT NOT NULL, -- JSON array
                category TEXT,
                sentiment TEXT NOT NULL, -- JSON object
                read_time INTEGER NOT NULL,
                word_count INTEGER NOT NULL,
                content_length INTEGER NOT NULL,
                quality_score INTEGER NOT NULL,
                confidence_score REAL NOT NULL,
                engine_used TEXT,
                crawl_time REAL,
                discovery_source TEXT,
                processing_timestamp TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_enhanced_articles_domain ON enhanced_articles (domain);
            CREATE INDEX IF NOT EXISTS idx_enhanced_articles_category ON enhanced_articles (category);
            CREATE INDEX IF NOT EXISTS idx_enhanced_articles_updated_at ON enhanced_articles (updated_at);
            CREATE INDEX IF NOT EXISTS idx_enhanced_articles_content_hash ON enhanced_articles (content_hash);
            "#,
        )
        .execute(&mut *conn)
        .await?;

        info!(target: TARGET_DB, "Database schema initialized");
        Ok(())
    }
}
