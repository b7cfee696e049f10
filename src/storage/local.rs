use async_trait::async_trait;

use super::{ArticleStore, LOCAL};
use crate::db::{Database, StoredArticle};
use crate::error::StoreError;
use crate::model::EnrichedArticle;

/// The durable local enriched-record table.
pub struct LocalStore {
    db: Database,
}

impl LocalStore {
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        Ok(Self {
            db: Database::new(path).await?,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn get_article(&self, article_id: &str) -> Result<Option<StoredArticle>, StoreError> {
        Ok(self.db.get_enhanced_article(article_id).await?)
    }

    pub async fn recent_articles(&self, limit: i64) -> Result<Vec<StoredArticle>, StoreError> {
        Ok(self.db.recent_enhanced_articles(limit).await?)
    }
}

#[async_trait]
impl ArticleStore for LocalStore {
    fn name(&self) -> &'static str {
        LOCAL
    }

    async fn store(&self, article: &EnrichedArticle) -> Result<(), StoreError> {
        self.db.upsert_enhanced_article(article).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::sample_article;

    #[tokio::test]
    async fn stores_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.db");
        let store = LocalStore::open(path.to_str().unwrap()).await.unwrap();
        let article = sample_article("https://news.example/a");

        store.store(&article).await.unwrap();
        store.store(&article).await.unwrap();

        let stored = store.get_article(&article.article_id).await.unwrap().unwrap();
        assert_eq!(stored.title, article.title);
        assert_eq!(stored.category.as_deref(), Some(article.category.as_str()));
        assert_eq!(store.recent_articles(10).await.unwrap().len(), 1);
    }
}
