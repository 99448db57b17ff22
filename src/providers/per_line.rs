/*!
 * Per-line fan-out adapter.
 *
 * Sends one request per line with bounded parallelism. Each request is
 * retried on its own and falls back to the source text when it keeps failing.
 */

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, warn};
use tokio::sync::Semaphore;

use crate::app_config::MAX_FAN_OUT;
use crate::cancellation::CancellationFlag;
use crate::errors::ProviderError;
use crate::providers::Provider;
use crate::providers::endpoint::TextEndpoint;
use crate::providers::retry::{RetryPolicy, Sleeper, TokioSleeper, with_retry};
use crate::translation::cache::{TranslationCache, truncate_text};

/// Adapter issuing one backend call per line
#[derive(Debug)]
pub struct PerLineProvider {
    endpoint: Arc<dyn TextEndpoint>,
    /// Shared by every call on this instance
    permits: Arc<Semaphore>,
    concurrency: usize,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    cache: TranslationCache,
    accepts_auto: bool,
}

impl PerLineProvider {
    pub fn new(endpoint: Arc<dyn TextEndpoint>, concurrency: usize) -> Self {
        let concurrency = concurrency.clamp(1, MAX_FAN_OUT);
        Self {
            endpoint,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            cache: TranslationCache::default(),
            accepts_auto: true,
        }
    }

    pub fn with_retry(mut self, policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        self.policy = policy;
        self.sleeper = sleeper;
        self
    }

    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = cache;
        self
    }

    /// Mark the backend as requiring an explicit source language
    pub fn rejecting_auto_source(mut self) -> Self {
        self.accepts_auto = false;
        self
    }

    async fn translate_one(&self, line: &str, source: &str, target: &str, cancel: &CancellationFlag) -> String {
        let text = line.trim();
        if text.is_empty() || cancel.is_cancelled() {
            return line.to_string();
        }
        if let Some(hit) = self.cache.get(text, source, target) {
            return hit;
        }

        let result = {
            let _permit = match self.permits.acquire().await {
                Ok(permit) => permit,
                Err(_) => return line.to_string(),
            };
            with_retry(&self.policy, self.sleeper.as_ref(), cancel, self.endpoint.name(), || {
                self.endpoint.translate_text(text, source, target)
            })
            .await
        };

        match result {
            Ok(translated) if !translated.trim().is_empty() => {
                if translated.trim() != text {
                    self.cache.store(text, source, target, &translated);
                }
                translated
            }
            Ok(_) => {
                debug!("{}: empty result for '{}', keeping source", self.endpoint.name(), truncate_text(text, 30));
                line.to_string()
            }
            Err(ProviderError::Cancelled) => line.to_string(),
            Err(e) => {
                warn!("{}: keeping source for '{}': {}", self.endpoint.name(), truncate_text(text, 30), e);
                line.to_string()
            }
        }
    }
}

#[async_trait]
impl Provider for PerLineProvider {
    fn name(&self) -> &str {
        self.endpoint.name()
    }

    fn accepts_auto_source(&self) -> bool {
        self.accepts_auto
    }

    async fn translate(
        &self,
        lines: &[String],
        source: &str,
        target: &str,
        cancel: &CancellationFlag,
    ) -> Result<Vec<String>, ProviderError> {
        let futures: Vec<_> = lines
            .iter()
            .enumerate()
            .map(|(index, line)| async move { (index, self.translate_one(line, source, target, cancel).await) })
            .collect();
        let mut results: Vec<(usize, String)> = stream::iter(futures)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().map(|(_, text)| text).collect())
    }
}
