/*!
 * Provider implementations for different translation services.
 *
 * This module contains the adapters that drive the supported backends:
 * - `batch_join`: one request per chunk of joined lines (Google batch, LibreTranslate)
 * - `per_line`: one request per line with bounded fan-out (Google per line, MyMemory)
 * - `endpoint`: the HTTP clients the adapters call
 * - `retry`: backoff and retry shared by all adapters
 * - `mock`: scripted providers and endpoints for tests
 */

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::cancellation::CancellationFlag;
use crate::errors::ProviderError;
use crate::translation::cache::TranslationCache;

use self::batch_join::{BatchJoinProvider, JoinStrategy};
use self::endpoint::{GoogleWebEndpoint, LibreTranslateEndpoint, MyMemoryEndpoint, TextEndpoint};
use self::per_line::PerLineProvider;
use self::retry::{RetryPolicy, Sleeper, TokioSleeper};

/// Common trait for all translation providers
///
/// Implementations must return exactly one output per input line. Items that
/// cannot be translated come back as their source text; `Err` is reserved for
/// failures of the whole call.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Identifier used in logs
    fn name(&self) -> &str;

    /// Whether "auto" is accepted as a source language
    fn accepts_auto_source(&self) -> bool {
        true
    }

    /// Translate a list of lines
    ///
    /// # Arguments
    /// * `lines` - Texts to translate, in order
    /// * `source` - Source language code or "auto"
    /// * `target` - Target language code
    /// * `cancel` - Checked between work units
    async fn translate(
        &self,
        lines: &[String],
        source: &str,
        target: &str,
        cancel: &CancellationFlag,
    ) -> Result<Vec<String>, ProviderError>;
}

/// Build the configured provider with real network endpoints
pub fn create_provider(config: &TranslationConfig) -> Arc<dyn Provider> {
    create_provider_with_sleeper(config, Arc::new(TokioSleeper))
}

/// Build the configured provider with a custom backoff sleeper
pub fn create_provider_with_sleeper(config: &TranslationConfig, sleeper: Arc<dyn Sleeper>) -> Arc<dyn Provider> {
    let provider_config = config.get_active_provider_config();
    let endpoint_url = config.get_endpoint();
    let timeout = provider_config.timeout();
    let policy = RetryPolicy::from_config(&config.common);
    let cache = TranslationCache::new(config.common.cache_capacity);

    match config.provider {
        TranslationProvider::GoogleBatch => {
            let endpoint: Arc<dyn TextEndpoint> = Arc::new(GoogleWebEndpoint::new(endpoint_url, timeout));
            Arc::new(
                BatchJoinProvider::new(endpoint, JoinStrategy::Newline, provider_config.max_request_chars)
                    .with_retry(policy, sleeper)
                    .with_cache(cache),
            )
        }
        TranslationProvider::GoogleFree => {
            let endpoint: Arc<dyn TextEndpoint> = Arc::new(GoogleWebEndpoint::new(endpoint_url, timeout));
            Arc::new(
                PerLineProvider::new(endpoint, provider_config.effective_concurrency())
                    .with_retry(policy, sleeper)
                    .with_cache(cache),
            )
        }
        TranslationProvider::MyMemory => {
            let endpoint: Arc<dyn TextEndpoint> = Arc::new(MyMemoryEndpoint::new(endpoint_url, timeout));
            Arc::new(
                PerLineProvider::new(endpoint, provider_config.effective_concurrency())
                    .with_retry(policy, sleeper)
                    .with_cache(cache)
                    .rejecting_auto_source(),
            )
        }
        TranslationProvider::LibreTranslate => {
            let api_key = Some(provider_config.api_key.clone());
            let endpoint: Arc<dyn TextEndpoint> = Arc::new(LibreTranslateEndpoint::new(endpoint_url, api_key, timeout));
            Arc::new(
                BatchJoinProvider::new(endpoint, JoinStrategy::Delimiter, provider_config.max_request_chars)
                    .with_retry(policy, sleeper)
                    .with_cache(cache),
            )
        }
    }
}

pub mod batch_join;
pub mod endpoint;
pub mod mock;
pub mod per_line;
pub mod retry;
