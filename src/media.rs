use crate::error::{DownloadError, MediaError};
use crate::twitter_message::Tweet;
use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Fixed-interval retry settings for media downloads.
///
/// CDN propagation lag is the only failure we expect here, so the delay does
/// not grow between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made after the first one.
    pub retry_count: u32,
    pub interval: Duration,
    /// Upper bound on the whole loop, sleeps included.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 3,
            interval: Duration::from_secs(1),
            deadline: None,
        }
    }
}

#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download the first media attachment of `tweet`.
    async fn download(&self, tweet: &Tweet) -> Result<Vec<u8>, DownloadError>;
}

pub struct HttpMediaFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpMediaFetcher {
    pub fn new(policy: RetryPolicy, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sutaba/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, policy }
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(MediaError::Status(response.status()));
        }

        // A truncated body fails the whole attempt
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl MediaDownloader for HttpMediaFetcher {
    async fn download(&self, tweet: &Tweet) -> Result<Vec<u8>, DownloadError> {
        let Some(url) = tweet.first_media_url() else {
            return Err(DownloadError {
                url: String::new(),
                attempts: 0,
                last: MediaError::NoMedia,
            });
        };

        retry_fixed(&self.policy, move |attempt| {
            debug!(attempt, url, "Downloading tweet media");
            self.fetch_once(url)
        })
        .await
        .map_err(|(attempts, last)| DownloadError {
            url: url.to_string(),
            attempts,
            last,
        })
    }
}

/// Run `op` up to `retry_count + 1` times, sleeping `interval` between failed
/// attempts. Never sleeps after the final attempt. On exhaustion returns the
/// number of attempts made and the last error.
pub async fn retry_fixed<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, (u32, E)>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if attempt > policy.retry_count {
            return Err((attempt, err));
        }

        if let Some(deadline) = policy.deadline {
            if started.elapsed() + policy.interval > deadline {
                warn!(attempt, error = %err, "Retry deadline reached, giving up");
                return Err((attempt, err));
            }
        }

        warn!(
            attempt,
            delay_ms = policy.interval.as_millis() as u64,
            error = %err,
            "Retrying after failed attempt"
        );
        tokio::time::sleep(policy.interval).await;
    }
}
