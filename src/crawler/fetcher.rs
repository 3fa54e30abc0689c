//! Page fetcher boundary and its HTTP implementation
//!
//! The crawl chain only needs "give me the rendered content of this URL".
//! [`Fetcher`] is that seam; [`HttpFetcher`] implements it with reqwest,
//! adding:
//! - A proper user agent string
//! - A per-request timeout
//! - Retry with exponential backoff for transient failures
//! - A settle pause after each successful load

use crate::config::{Config, FetchConfig, UserAgentConfig};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Retrieves the content of a page
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` and returns its content once the page has settled
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// How long to wait for a page before handing its content back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Wait for the full load, then pause for `settle_delay`
    pub wait_for_load: bool,

    /// Pause applied after a successful load
    pub settle_delay: Duration,
}

impl WaitPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            wait_for_load: config.wait_for_load,
            settle_delay: Duration::from_millis(config.settle_delay_ms),
        }
    }

    /// Pause to apply after a page has loaded
    pub fn pause(&self) -> Option<Duration> {
        if self.wait_for_load && !self.settle_delay.is_zero() {
            Some(self.settle_delay)
        } else {
            None
        }
    }
}

/// Retry schedule for transient fetch failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Delay before attempt number `attempt` (1-based retries)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.base_delay.saturating_mul(factor)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use discogs_chain::config::UserAgentConfig;
/// use discogs_chain::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "DiscogsChain".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(60)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Format: CrawlerName/Version (+ContactURL; ContactEmail)
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Fetcher backed by a reqwest client
pub struct HttpFetcher {
    client: Client,
    wait: WaitPolicy,
    retry: RetryPolicy,
}

impl HttpFetcher {
    /// Creates a fetcher from the `[fetch]` and `[user-agent]` tables
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_millis(config.fetch.timeout_ms);
        let client = build_http_client(&config.user_agent, timeout)?;

        Ok(Self {
            client,
            wait: WaitPolicy::from_config(&config.fetch),
            retry: RetryPolicy::from_config(&config.fetch),
        })
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        self.wait
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// One GET without retries
    async fn fetch_once(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| classify(url, e))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let mut attempt = 0;

        let body = loop {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt);
                tracing::debug!("Retrying {} in {:?} (attempt {})", url, delay, attempt + 1);
                tokio::time::sleep(delay).await;
            }

            match self.fetch_once(url).await {
                Ok(body) => break body,
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    tracing::warn!("Transient failure fetching {}: {}", url, e);
                    attempt += 1;
                }
                Err(e) if attempt > 0 => {
                    return Err(FetchError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt + 1,
                        last: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        };

        if let Some(pause) = self.wait.pause() {
            tokio::time::sleep(pause).await;
        }

        Ok(body)
    }
}

/// Maps a reqwest failure onto the fetch error taxonomy
fn classify(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
