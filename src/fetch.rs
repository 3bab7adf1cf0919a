use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;

use crate::request::{Headers, PageRequest};
use crate::{Error, Result};

/// How much of an error body ends up in `Error::HttpStatus`.
const SNIPPET_LEN: usize = 500;

/// Fetches one page and returns its parsed JSON body.
/// Nothing is retried here, the caller decides what a failure means.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<Value>;
}

/// `PageFetcher` over a single `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    // Client uses Arc so we can clone cheaply
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, url, timeout))
    }

    pub fn with_client(client: Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<Value> {
        let res = self
            .client
            .get(&self.url)
            .query(&request.params)
            .headers(header_map(&request.headers)?)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            // The status is what matters here, a body that can't be read just leaves the snippet empty.
            let body = res.text().await.unwrap_or_default();
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                snippet: snippet(&body),
            });
        }
        let body = res.text().await?;
        tracing::debug!(page = request.page, status = status.as_u16(), "fetched page");

        serde_json::from_str(&body).map_err(|e| {
            Error::MalformedResponse(format!("page {} is not valid JSON: {e}", request.page))
        })
    }
}

fn header_map(headers: &Headers) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Unexpected(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Unexpected(format!("invalid value for header {name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn snippet(body: &str) -> String {
    body.chars().take(SNIPPET_LEN).collect()
}
