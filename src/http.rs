//! HTTP client shared by discovery and the crawl strategies.

use chrono::Utc;
use reqwest::{cookie::Jar, header};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::error::FetchError;
use crate::model::RawFetch;
use crate::TARGET_WEB_REQUEST;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// What kind of document a request expects, which decides the Accept header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchProfile {
    Page,
    Feed,
    Sitemap,
}

impl FetchProfile {
    fn accept(&self) -> &'static str {
        match self {
            FetchProfile::Page => {
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
            }
            FetchProfile::Feed => "application/feed+json, application/json, application/rss+xml, application/atom+xml, application/xml, text/xml, */*;q=0.9",
            FetchProfile::Sitemap => "application/xml, text/xml, */*;q=0.8",
        }
    }
}

/// Browser-like HTTP client with a bounded per-request timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(request_timeout: Duration) -> Result<Self, FetchError> {
        let cookie_store = Jar::default();
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .cookie_provider(Arc::new(cookie_store))
            .gzip(true)
            .redirect(reqwest::redirect::Policy::default())
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;

        debug!(target: TARGET_WEB_REQUEST, "Created HTTP client with {:?} timeout", request_timeout);
        Ok(HttpFetcher {
            client,
            request_timeout,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Fetches `url` once. Non-2xx responses are errors; nothing is retried here.
    #[instrument(target = "web_request", level = "debug", skip(self))]
    pub async fn fetch(
        &self,
        url: &str,
        profile: FetchProfile,
        strategy: &'static str,
    ) -> Result<RawFetch, FetchError> {
        let request = self
            .client
            .get(url)
            .header(header::ACCEPT, profile.accept())
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send();

        let response = match timeout(self.request_timeout, request).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(source)) => {
                warn!(target: TARGET_WEB_REQUEST, "Request to {} failed: {}", url, source);
                return Err(FetchError::Request {
                    url: url.to_string(),
                    source,
                });
            }
            Err(_) => {
                warn!(target: TARGET_WEB_REQUEST, "Request to {} timed out", url);
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                    seconds: self.request_timeout.as_secs(),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(target: TARGET_WEB_REQUEST, "HTTP {} from {}", status, url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // the body read shares the request's time budget
        let body = match timeout(self.request_timeout, response.text()).await {
            Ok(Ok(body)) => body,
            Ok(Err(source)) => {
                return Err(FetchError::Request {
                    url: url.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                    seconds: self.request_timeout.as_secs(),
                })
            }
        };

        debug!(target: TARGET_WEB_REQUEST, "Fetched {} bytes from {}", body.len(), url);
        Ok(RawFetch {
            url: url.to_string(),
            status_code: status.as_u16(),
            body,
            fetched_at: Utc::now(),
            strategy_used: strategy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_returns_body_and_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hi</html>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let raw = fetcher
            .fetch(&format!("{}/page", server.uri()), FetchProfile::Page, "test")
            .await
            .unwrap();
        assert_eq!(raw.status_code, 200);
        assert_eq!(raw.body, "<html>hi</html>");
        assert_eq!(raw.strategy_used, "test");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher
            .fetch(&format!("{}/gone", server.uri()), FetchProfile::Page, "test")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_millis(50)).unwrap();
        let err = fetcher
            .fetch(&server.uri(), FetchProfile::Page, "test")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
    }
}
