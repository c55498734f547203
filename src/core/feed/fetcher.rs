use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use std::time::Duration;

use crate::core::storage::models::FeedValidators;

const USER_AGENT: &str = concat!("feed-notifier/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub validators: FeedValidators,
}

#[derive(Debug, Clone)]
pub enum FetchStatus {
    Updated(FetchedFeed),
    NotModified,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    HttpStatus(u16),
}

impl FetchError {
    fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Request(_))
            || matches!(self, FetchError::HttpStatus(code) if *code >= 500)
    }
}

/// HTTP client bound to the one feed this process watches.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: reqwest::Client,
    url: String,
    max_retries: usize,
}

impl FeedClient {
    pub fn new(url: &str, timeout: Duration, max_retries: usize) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            max_retries,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self, validators: &FeedValidators) -> Result<FetchStatus, FetchError> {
        fetch_feed_with_retry(&self.client, &self.url, validators, self.max_retries).await
    }
}

pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    validators: &FeedValidators,
) -> Result<FetchStatus, FetchError> {
    let mut request = client.get(url);
    if let Some(value) = validators.etag.as_deref() {
        request = request.header(IF_NONE_MATCH, value);
    }
    if let Some(value) = validators.last_modified.as_deref() {
        request = request.header(IF_MODIFIED_SINCE, value);
    }

    let response = request.send().await?;
    let status = response.status();
    if status == reqwest::StatusCode::NOT_MODIFIED {
        return Ok(FetchStatus::NotModified);
    }
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let header = |name: reqwest::header::HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
    };
    let validators = FeedValidators {
        etag: header(ETAG),
        last_modified: header(LAST_MODIFIED),
    };
    let content_type = header(reqwest::header::CONTENT_TYPE);
    let body = response.bytes().await?.to_vec();

    Ok(FetchStatus::Updated(FetchedFeed {
        body,
        content_type,
        validators,
    }))
}

/// Retries transport failures and 5xx responses with a linear backoff.
pub async fn fetch_feed_with_retry(
    client: &reqwest::Client,
    url: &str,
    validators: &FeedValidators,
    max_retries: usize,
) -> Result<FetchStatus, FetchError> {
    let mut attempt = 0_usize;
    loop {
        match fetch_feed(client, url, validators).await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if !err.is_retryable() || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                tracing::debug!(url, attempt, error = %err, "retrying feed fetch");
                tokio::time::sleep(Duration::from_millis(40 * attempt as u64)).await;
            }
        }
    }
}
