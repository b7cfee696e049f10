use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use super::{ArticleStore, SEARCH};
use crate::error::StoreError;
use crate::model::EnrichedArticle;
use crate::TARGET_STORAGE;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Field mapping used when the index has to be created.
pub fn index_mapping() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0
        },
        "mappings": {
            "properties": {
                "article_id": { "type": "keyword" },
                "url": { "type": "keyword" },
                "domain": { "type": "keyword" },
                "title": { "type": "text" },
                "content": { "type": "text" },
                "summary": { "type": "text" },
                "excerpt": { "type": "text" },
                "authors": { "type": "keyword" },
                "publish_date": { "type": "keyword" },
                "language": { "type": "keyword" },
                "category": { "type": "keyword" },
                "keywords": { "type": "keyword" },
                "topics": { "type": "keyword" },
                "persons": { "type": "keyword" },
                "organizations": { "type": "keyword" },
                "locations": { "type": "keyword" },
                "sentiment_label": { "type": "keyword" },
                "sentiment_polarity": { "type": "float" },
                "quality_score": { "type": "integer" },
                "confidence_score": { "type": "float" },
                "read_time": { "type": "integer" },
                "word_count": { "type": "integer" },
                "engine_used": { "type": "keyword" },
                "processing_timestamp": { "type": "date" }
            }
        }
    })
}

pub fn search_document(article: &EnrichedArticle) -> Value {
    json!({
        "article_id": article.article_id,
        "url": article.url,
        "domain": article.domain,
        "title": article.title,
        "content": article.content,
        "summary": article.summary,
        "excerpt": article.excerpt,
        "authors": article.authors,
        "publish_date": article.publish_date,
        "language": article.language,
        "category": article.category,
        "keywords": article.keywords,
        "topics": article.topics,
        "persons": article.entities.persons,
        "organizations": article.entities.organizations,
        "locations": article.entities.locations,
        "sentiment_label": article.sentiment.label.to_string(),
        "sentiment_polarity": article.sentiment.polarity,
        "quality_score": article.quality_score,
        "confidence_score": article.confidence_score,
        "read_time": article.read_time,
        "word_count": article.word_count,
        "engine_used": article.engine_used,
        "processing_timestamp": article.processing_timestamp.to_rfc3339(),
    })
}

/// Full-text search index spoken to over its REST API.
pub struct SearchIndex {
    client: reqwest::Client,
    base_url: String,
    index: String,
    index_ready: OnceCell<()>,
}

impl SearchIndex {
    pub fn new(base_url: &str, index: &str) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(SEARCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            index_ready: OnceCell::new(),
        })
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, self.index)
    }

    /// Creates the index with [`index_mapping`] unless it already exists.
    /// Checked once per process.
    async fn ensure_index(&self) -> Result<(), StoreError> {
        self.index_ready
            .get_or_try_init(|| async {
                let url = self.index_url();
                let head = self.client.head(&url).send().await?;
                match head.status() {
                    status if status.is_success() => Ok(()),
                    StatusCode::NOT_FOUND => {
                        let created = self.client.put(&url).json(&index_mapping()).send().await?;
                        let status = created.status();
                        if status.is_success() {
                            info!(target: TARGET_STORAGE, "Created search index {}", self.index);
                            return Ok(());
                        }
                        let body = created.text().await.unwrap_or_default();
                        // another writer created it first
                        if body.contains("resource_already_exists_exception") {
                            return Ok(());
                        }
                        Err(StoreError::Search(format!(
                            "creating index {} returned {}: {}",
                            self.index, status, body
                        )))
                    }
                    status => Err(StoreError::Search(format!(
                        "checking index {} returned {}",
                        self.index, status
                    ))),
                }
            })
            .await?;
        Ok(())
    }

    #[instrument(target = "storage", level = "debug", skip(self, article), fields(article_id = %article.article_id))]
    async fn index_article(&self, article: &EnrichedArticle) -> Result<(), StoreError> {
        self.ensure_index().await?;

        let url = format!("{}/_doc/{}", self.index_url(), article.article_id);
        let response = self
            .client
            .put(&url)
            .json(&search_document(article))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Search(format!(
                "indexing {} returned {}: {}",
                article.article_id, status, body
            )));
        }
        debug!(target: TARGET_STORAGE, "Indexed {}", article.article_id);
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for SearchIndex {
    fn name(&self) -> &'static str {
        SEARCH
    }

    async fn store(&self, article: &EnrichedArticle) -> Result<(), StoreError> {
        self.index_article(article).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::sample_article;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn creates_missing_index_once_then_indexes_by_id() {
        let server = MockServer::start().await;
        let article = sample_article("https://news.example/a");

        Mock::given(method("HEAD"))
            .and(path("/news-articles"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/news-articles"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"acknowledged":true}"#))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("/news-articles/_doc/{}", article.article_id)))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"result":"created"}"#))
            .expect(2)
            .mount(&server)
            .await;

        let index = SearchIndex::new(&server.uri(), "news-articles").unwrap();
        index.store(&article).await.unwrap();
        index.store(&article).await.unwrap();
    }

    #[tokio::test]
    async fn rejected_document_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/news-articles"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400).set_body_string("mapper_parsing_exception"))
            .mount(&server)
            .await;

        let index = SearchIndex::new(&format!("{}/", server.uri()), "news-articles").unwrap();
        let err = index.store(&sample_article("https://news.example/a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Search(msg) if msg.contains("400")));
    }

    #[test]
    fn document_carries_entities_and_scores() {
        let article = sample_article("https://news.example/a");
        let doc = search_document(&article);
        assert_eq!(doc["article_id"], article.article_id.as_str());
        assert_eq!(doc["quality_score"], article.quality_score as u64);
        assert!(doc["persons"].as_array().is_some());
    }
}
