use crate::error::{FetchError, FetchErrorKind};
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Raw payload returned by a successful fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Transport used by every scraper. Injected so tests can swap in a fake HTTP layer.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url`. Non-2xx statuses come back as `FetchErrorKind::Status`.
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// Creates an HTTP client with a stable identity and a total request timeout
pub fn create_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut headers = header::HeaderMap::new();

    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static("en-US,en;q=0.9")
    );
    headers.insert(
        header::CONNECTION,
        header::HeaderValue::from_static("keep-alive")
    );

    Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(timeout)
        .cookie_store(true)
        .build()
}

/// reqwest-backed fetcher. One client, and so one connection pool, per instance;
/// the pool goes away when the last handle is dropped.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = create_http_client(user_agent, timeout)
            .map_err(|e| FetchError::new("", FetchErrorKind::Client(e.to_string())))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(url, FetchErrorKind::Status(status.as_u16())));
        }

        let body = response.text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        tracing::debug!("Fetched {} bytes from {}", body.len(), url);

        Ok(FetchResponse {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}
