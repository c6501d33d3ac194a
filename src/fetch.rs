//! Image retrieval over HTTP.
//!
//! Every request carries a timeout, transient failures are retried a bounded
//! number of times, and requests to the same origin are spaced out by a
//! politeness delay.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::error::FetchError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    /// Extra attempts after the first on timeout or connection failure.
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Minimum spacing between requests to one origin.
    pub politeness_delay_ms: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_retries: 2,
            retry_backoff_ms: 500,
            politeness_delay_ms: 1000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3"
                .to_string(),
        }
    }
}

/// Source of decoded product images.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self, url: &str) -> Result<DynamicImage, FetchError>;
}

/// Parse `raw` as an absolute URL with both a scheme and a host.
pub fn parse_image_url(raw: &str) -> Result<Url, FetchError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|_| FetchError::InvalidUrl(trimmed.to_string()))?;
    if url.scheme().is_empty() || url.host_str().is_none() {
        return Err(FetchError::InvalidUrl(trimmed.to_string()));
    }
    Ok(url)
}

/// Spaces out requests per origin.
///
/// Each caller reserves the next free slot for its origin and sleeps until
/// it arrives, so concurrent workers hitting one host are serialized without
/// holding a lock across the wait.
pub struct OriginThrottle {
    delay: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl OriginThrottle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    fn reserve(&self, origin: &str) -> Instant {
        let now = Instant::now();
        let mut slots = match self.next_slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let slot = slots
            .get(origin)
            .copied()
            .filter(|next| *next > now)
            .unwrap_or(now);
        slots.insert(origin.to_string(), slot + self.delay);
        slot
    }

    pub async fn wait(&self, origin: &str) {
        if self.delay.is_zero() {
            return;
        }
        let slot = self.reserve(origin);
        tokio::time::sleep_until(slot).await;
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetchConfig,
    throttle: OriginThrottle,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Use an already configured client; `config` still drives retries and
    /// politeness.
    pub fn with_client(client: reqwest::Client, config: FetchConfig) -> Self {
        let throttle = OriginThrottle::new(Duration::from_millis(config.politeness_delay_ms));
        Self {
            client,
            config,
            throttle,
        }
    }

    /// Download the body at `url`, retrying transient failures.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = parse_image_url(url)?;
        let origin = parsed.origin().ascii_serialization();

        let mut attempt = 0;
        loop {
            self.throttle.wait(&origin).await;
            match self.try_fetch(parsed.clone()).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(url, attempt, "fetch failed ({}), retrying", e);
                    tokio::time::sleep(Duration::from_millis(self.config.retry_backoff_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_fetch(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await.map_err(classify_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Body(e.to_string())
            }
        })?;
        Ok(bytes.to_vec())
    }
}

fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Connect(e.to_string())
    }
}

/// Decode raw image bytes of any format the `image` crate recognises.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, FetchError> {
    image::load_from_memory(bytes).map_err(|e| FetchError::Decode(e.to_string()))
}

#[async_trait]
impl ImageSource for HttpFetcher {
    async fn fetch_image(&self, url: &str) -> Result<DynamicImage, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        debug!(url, bytes = bytes.len(), "downloaded image");
        tokio::task::spawn_blocking(move || decode_image(&bytes))
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?
    }
}
