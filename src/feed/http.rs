use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;

use super::{FeedClient, FeedError};
use crate::archive::ContentBatch;
use crate::util::{validate_endpoint_url, UrlValidationError};

const MAX_RETRIES: u32 = 3;
const MAX_BATCH_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors from a single HTTP fetch attempt.
///
/// Rendered into a [`FeedError`] message at the trait boundary; the message
/// text (e.g. `"HTTP error: status 429"`) is what rate-limit
/// classification sees.
#[derive(Debug, Error)]
enum HttpFetchError {
    #[error("Request timed out")]
    Timeout,
    /// Built via [`HttpFetchError::network`] so the endpoint URL never ends
    /// up in the message that rate-limit classification inspects.
    #[error("Request failed: {0}")]
    Network(reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large")]
    ResponseTooLarge,
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    #[error("Malformed batch: {0}")]
    Decode(#[from] serde_json::Error),
}

impl HttpFetchError {
    fn network(error: reqwest::Error) -> Self {
        HttpFetchError::Network(error.without_url())
    }

    /// Transient failures worth retrying. 429 is deliberately excluded: it
    /// must reach the scheduler so the cooldown starts.
    fn is_retryable(&self) -> bool {
        match self {
            HttpFetchError::Timeout
            | HttpFetchError::Network(_)
            | HttpFetchError::IncompleteResponse { .. } => true,
            HttpFetchError::HttpStatus(status) => *status >= 500,
            HttpFetchError::ResponseTooLarge | HttpFetchError::Decode(_) => false,
        }
    }
}

/// Settings for [`HttpFeedClient`].
#[derive(Debug)]
pub struct HttpFeedConfig {
    /// JSON endpoint returning a [`ContentBatch`].
    pub endpoint: String,
    /// Sent as a bearer token when present.
    pub api_key: Option<SecretString>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// First retry delay; doubles on each attempt.
    pub retry_base: Duration,
}

impl HttpFeedConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            request_timeout: Duration::from_secs(30),
            retry_base: Duration::from_secs(1),
        }
    }
}

/// Feed Client that GETs a JSON batch over HTTPS.
pub struct HttpFeedClient {
    client: reqwest::Client,
    endpoint: url::Url,
    api_key: Option<SecretString>,
    request_timeout: Duration,
    retry_base: Duration,
}

impl HttpFeedClient {
    /// Build a client for `config.endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`UrlValidationError`] when the endpoint is not HTTPS (plain
    /// HTTP is allowed for loopback hosts only).
    pub fn new(config: HttpFeedConfig) -> Result<Self, UrlValidationError> {
        let endpoint = validate_endpoint_url(&config.endpoint)?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: config.api_key,
            request_timeout: config.request_timeout,
            retry_base: config.retry_base,
        })
    }

    async fn fetch_with_retry(&self) -> Result<ContentBatch, HttpFetchError> {
        let mut retry_count = 0;

        loop {
            match self.fetch_once().await {
                Ok(batch) => return Ok(batch),
                Err(e) if e.is_retryable() && retry_count < MAX_RETRIES => {
                    let delay = self.retry_base * (1u32 << retry_count);
                    tracing::debug!(
                        error = %e,
                        retry = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying feed fetch after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self) -> Result<ContentBatch, HttpFetchError> {
        let mut request = self
            .client
            .get(self.endpoint.clone())
            .header("Accept", "application/json");

        if let Some(key) = &self.api_key {
            tracing::trace!("Feed API authentication configured");
            request = request.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let response = tokio::time::timeout(self.request_timeout, request.send())
            .await
            .map_err(|_| HttpFetchError::Timeout)?
            .map_err(HttpFetchError::network)?;

        if !response.status().is_success() {
            return Err(HttpFetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_BATCH_SIZE).await?;
        let batch: ContentBatch = serde_json::from_slice(&bytes)?;
        Ok(batch)
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch_batch(&self) -> Result<ContentBatch, FeedError> {
        match self.fetch_with_retry().await {
            Ok(batch) => {
                tracing::debug!(
                    articles = batch.articles.len(),
                    sources = batch.sources.len(),
                    "Fetched feed batch"
                );
                Ok(batch)
            }
            Err(e) => Err(FeedError::new(e.to_string())),
        }
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, HttpFetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(HttpFetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(HttpFetchError::network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(HttpFetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(HttpFetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{classify_failure, FailureClass};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_BATCH: &str = r#"{
        "articles": [{
            "title": "New Model Ships",
            "excerpt": "Short summary",
            "content": "Full body",
            "category": "models",
            "sourceUrl": "https://example.com/post",
            "date": "2024-03-01",
            "tags": ["llm"]
        }],
        "sources": [{"title": "Example", "uri": "https://example.com/post"}],
        "lastUpdated": "3/1/2024"
    }"#;

    fn client_for(server: &MockServer) -> HttpFeedClient {
        let mut config = HttpFeedConfig::new(format!("{}/api/briefing", server.uri()));
        config.retry_base = Duration::from_millis(1);
        HttpFeedClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/briefing"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_BATCH)
                    .insert_header("Content-Type", "application/json"),
            )
            .mount(&server)
            .await;

        let batch = client_for(&server).fetch_batch().await.unwrap();
        assert_eq!(batch.articles.len(), 1);
        assert_eq!(batch.articles[0].source_url, "https://example.com/post");
        assert_eq!(batch.sources.len(), 1);
        assert_eq!(batch.last_updated.as_deref(), Some("3/1/2024"));
    }

    #[tokio::test]
    async fn test_sends_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Authorization", "Bearer secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = HttpFeedConfig::new(format!("{}/api/briefing", server.uri()));
        config.api_key = Some(SecretString::from("secret-key".to_string()));
        let client = HttpFeedClient::new(config).unwrap();

        let batch = client.fetch_batch().await.unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_429_is_not_retried_and_classifies_as_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_batch().await.unwrap_err();
        assert_eq!(err.message(), "HTTP error: status 429");
        assert_eq!(classify_failure(&err), FailureClass::RateLimited);
    }

    #[tokio::test]
    async fn test_500_retries_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(4) // Initial request + 3 retries
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_batch().await.unwrap_err();
        assert_eq!(err.message(), "HTTP error: status 500");
        assert_eq!(classify_failure(&err), FailureClass::NetworkOrServer);
    }

    #[tokio::test]
    async fn test_503_retry_then_success() {
        use wiremock::matchers::any;

        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_BATCH))
            .mount(&server)
            .await;

        let batch = client_for(&server).fetch_batch().await.unwrap();
        assert_eq!(batch.articles.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_batch().await.unwrap_err();
        assert!(err.message().starts_with("Malformed batch"));
    }

    #[tokio::test]
    async fn test_network_error_omits_endpoint_url() {
        // Nothing listens on port 1; the path would read as a rate limit
        let mut config = HttpFeedConfig::new("http://127.0.0.1:1/quota/429");
        config.retry_base = Duration::from_millis(1);
        let client = HttpFeedClient::new(config).unwrap();

        let err = client.fetch_batch().await.unwrap_err();
        assert!(err.message().starts_with("Request failed"));
        assert!(!err.message().contains("quota"));
        assert_eq!(classify_failure(&err), FailureClass::NetworkOrServer);
    }

    #[test]
    fn test_rejects_insecure_endpoint() {
        let result = HttpFeedClient::new(HttpFeedConfig::new("http://news.example.com/api"));
        assert!(result.is_err());
    }
}
