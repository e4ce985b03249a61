use crate::app::ports::{HttpClientPort, HttpGetResult};
use crate::config::HttpConfig;
use crate::error::{FetchFailure, Result, ScraperError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

/// reqwest-backed fetcher. One client is shared by every stage so
/// connections are pooled and the user agent is always sent.
pub struct ReqwestHttp {
    client: reqwest::Client,
    max_retries: u32,
    retry_backoff: Duration,
}

impl ReqwestHttp {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(|e| ScraperError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Retry policy from `config` around an already-built client.
    pub fn with_client(client: reqwest::Client, config: &HttpConfig) -> Self {
        Self {
            client,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    async fn get_once(&self, url: &str) -> std::result::Result<HttpGetResult, FetchFailure> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchFailure::from(&e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FetchFailure::from(&e))?
            .to_vec();
        Ok(HttpGetResult {
            status: status.as_u16(),
            bytes,
            content_type,
        })
    }
}

/// Transport hiccups and server-side trouble are worth another attempt;
/// client errors are not.
fn is_retryable(failure: &FetchFailure) -> bool {
    match failure {
        FetchFailure::Timeout | FetchFailure::Connect => true,
        FetchFailure::Status(code) => {
            *code == StatusCode::TOO_MANY_REQUESTS.as_u16() || *code >= 500
        }
        FetchFailure::Other(_) => false,
    }
}

#[async_trait]
impl HttpClientPort for ReqwestHttp {
    async fn get(&self, url: &str) -> Result<HttpGetResult> {
        let mut attempt = 0;
        loop {
            match self.get_once(url).await {
                Ok(result) => {
                    debug!(url, status = result.status, bytes = result.bytes.len(), "GET ok");
                    return Ok(result);
                }
                Err(failure) if attempt < self.max_retries && is_retryable(&failure) => {
                    attempt += 1;
                    warn!(url, %failure, attempt, "GET failed, retrying");
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(failure) => return Err(ScraperError::fetch(url, failure)),
            }
        }
    }
}
