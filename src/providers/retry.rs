/*!
 * Retry with exponential backoff and jitter for backend calls.
 *
 * Sleeps go through the `Sleeper` trait so tests can substitute a clock that
 * records requested delays instead of waiting.
 */

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use rand::Rng;

use crate::app_config::TranslationCommonConfig;
use crate::cancellation::CancellationFlag;
use crate::errors::ProviderError;

/// Something that can wait for a duration
#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry limits and backoff shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay_ms: u64,
    /// Upper bound for the un-jittered delay
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(common: &TranslationCommonConfig) -> Self {
        Self {
            max_retries: common.retry_count,
            base_delay_ms: common.retry_backoff_ms,
            max_delay_ms: common.retry_backoff_cap_ms.max(common.retry_backoff_ms),
        }
    }

    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Un-jittered delay before retry number `retry` (0-based)
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Delay with jitter in `[0, delay / 2]` added
    pub fn jittered_delay(&self, retry: u32) -> Duration {
        let base = self.backoff_delay(retry);
        let half = base.as_millis() as u64 / 2;
        let jitter = if half == 0 { 0 } else { rand::rng().random_range(0..=half) };
        base + Duration::from_millis(jitter)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, runs out of
/// retries, or the run is cancelled.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationFlag,
    label: &str,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut retry = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                debug!("{}: giving up on non-retryable error: {}", label, e);
                return Err(e);
            }
            Err(e) if retry >= policy.max_retries => {
                warn!("{}: failed after {} attempts: {}", label, retry + 1, e);
                return Err(e);
            }
            Err(e) => {
                let delay = policy.jittered_delay(retry);
                debug!(
                    "{}: attempt {} failed ({}), retrying in {:?}",
                    label,
                    retry + 1,
                    e,
                    delay
                );
                sleeper.sleep(delay).await;
                retry += 1;
            }
        }
    }
}
