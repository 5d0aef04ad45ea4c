use crate::config::StoreConfig;
use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

struct RequestError {
    retryable: bool,
    inner: anyhow::Error,
}

impl RequestError {
    fn retryable(inner: anyhow::Error) -> Self {
        Self { retryable: true, inner }
    }

    fn fatal(inner: anyhow::Error) -> Self {
        Self { retryable: false, inner }
    }
}

/// Thin reqwest wrapper with retry on transport errors, 429 and 5xx.
pub struct HttpClient {
    inner: reqwest::Client,
    config: StoreConfig,
}

impl HttpClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent).gzip(true);
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let inner = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        self.send_with_retry(|| self.inner.get(url))
            .await
            .with_context(|| format!("GET {} failed", url))
    }

    pub async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<String> {
        self.post_json_with(url, HeaderMap::new(), body).await
    }

    /// POST with extra headers. Credentials belong here rather than in the
    /// url, which ends up in logs and error messages.
    pub async fn post_json_with<T: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &T,
    ) -> Result<String> {
        debug!("POST {}", url);
        self.send_with_retry(|| self.inner.post(url).headers(headers.clone()).json(body))
            .await
            .with_context(|| format!("POST {} failed", url))
    }

    fn backoff(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(2)
            .factor(self.config.retry_delay_ms.max(2) / 2)
            .max_delay(Duration::from_secs(30))
            .map(jitter)
            .take(self.config.max_retries as usize)
    }

    async fn send_with_retry<F>(&self, build: F) -> Result<String>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0u32;
        let action = || {
            attempt += 1;
            let request = build();
            let n = attempt;
            async move {
                let resp = request.send().await.map_err(|e| {
                    warn!("Request failed on attempt {}: {}", n, e);
                    RequestError::retryable(anyhow::anyhow!("Request error: {}", e))
                })?;

                let status = resp.status();
                if status.is_success() {
                    return resp
                        .text()
                        .await
                        .context("Failed to read response body")
                        .map_err(RequestError::fatal);
                }

                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    warn!("HTTP {} on attempt {}, backing off", status, n);
                    Err(RequestError::retryable(anyhow::anyhow!("HTTP {}", status)))
                } else {
                    // Other 4xx will not improve on retry.
                    Err(RequestError::fatal(anyhow::anyhow!("HTTP error {}", status)))
                }
            }
        };

        RetryIf::spawn(self.backoff(), action, |e: &RequestError| e.retryable)
            .await
            .map_err(|e| e.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_budget_follows_config() {
        let mut config = StoreConfig::default();
        config.max_retries = 2;
        assert_eq!(HttpClient::new(&config).unwrap().backoff().count(), 2);
        config.max_retries = 0;
        assert_eq!(HttpClient::new(&config).unwrap().backoff().count(), 0);
    }

    #[test]
    fn test_timeout_is_opt_in() {
        let mut config = StoreConfig::default();
        assert_eq!(config.timeout_secs, 0);
        assert!(HttpClient::new(&config).is_ok());
        config.timeout_secs = 5;
        assert!(HttpClient::new(&config).is_ok());
    }
}
