/*!
 * Core translation service implementation.
 *
 * Wraps a provider with the concerns every backend shares: source language
 * resolution, inline markup handling, a minimum interval between calls and a
 * result cache. Failures never escape: when the provider errors or returns
 * the wrong number of lines, the input comes back unchanged.
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::sync::Mutex;

use crate::app_config::TranslationConfig;
use crate::cancellation::CancellationFlag;
use crate::language_utils::{self, LanguageDetector, WhatlangDetector};
use crate::providers::Provider;

use super::cache::TranslationCache;
use super::formatting::FormatPreserver;

/// Enforces a minimum wall-clock interval between outbound calls
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Wait until the interval since the previous call has elapsed
    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

/// Main translation service for subtitle lines
#[derive(Debug, Clone)]
pub struct TranslationService {
    /// Provider implementation
    provider: Arc<dyn Provider>,

    /// Results keyed by (source, target, text)
    cache: TranslationCache,

    rate_limiter: Arc<RateLimiter>,

    detector: Arc<dyn LanguageDetector>,

    /// Languages accepted from detection
    allowed_languages: Vec<String>,

    /// Source used when detection is inconclusive
    fallback_language: String,
}

impl TranslationService {
    /// Create a service with default policies around `provider`
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        let defaults = crate::app_config::TranslationCommonConfig::default();
        Self {
            provider,
            cache: TranslationCache::default(),
            rate_limiter: Arc::new(RateLimiter::new(Duration::ZERO)),
            detector: Arc::new(WhatlangDetector),
            allowed_languages: defaults.allowed_languages,
            fallback_language: defaults.fallback_language,
        }
    }

    /// Create a service configured for the active provider
    pub fn from_config(config: &TranslationConfig, provider: Arc<dyn Provider>) -> Self {
        let provider_config = config.get_active_provider_config();
        Self {
            provider,
            cache: TranslationCache::new(config.common.cache_capacity),
            rate_limiter: Arc::new(RateLimiter::new(Duration::from_millis(
                provider_config.min_request_interval_ms,
            ))),
            detector: Arc::new(WhatlangDetector),
            allowed_languages: config.common.allowed_languages.clone(),
            fallback_language: config.common.fallback_language.clone(),
        }
    }

    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.rate_limiter = Arc::new(RateLimiter::new(interval));
        self
    }

    /// Space calls against a limiter shared with other services
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = limiter;
        self
    }

    pub fn with_language_policy(mut self, allowed: Vec<String>, fallback: impl Into<String>) -> Self {
        self.allowed_languages = allowed;
        self.fallback_language = fallback.into();
        self
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Source language the provider will actually receive for `lines`
    pub fn resolve_source(&self, lines: &[String], source: &str) -> String {
        language_utils::resolve_source_language(
            source,
            self.provider.accepts_auto_source(),
            lines,
            self.detector.as_ref(),
            &self.allowed_languages,
            &self.fallback_language,
        )
    }

    /// Translate a list of lines, one output per input
    pub async fn translate_lines(
        &self,
        lines: &[String],
        source: &str,
        target: &str,
        cancel: &CancellationFlag,
    ) -> Vec<String> {
        if lines.is_empty() {
            return Vec::new();
        }

        let source = self.resolve_source(lines, source);
        let mut results: Vec<Option<String>> = vec![None; lines.len()];
        let mut misses = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            let (wrap, clean) = FormatPreserver::strip_markup(line);
            if FormatPreserver::remove_tags(&clean).is_empty() {
                results[index] = Some(line.clone());
                continue;
            }
            match self.cache.get(&clean, &source, target) {
                Some(hit) => results[index] = Some(FormatPreserver::rewrap(&wrap, &hit)),
                None => misses.push((index, wrap, clean)),
            }
        }

        if misses.is_empty() {
            return results.into_iter().zip(lines).map(|(r, l)| r.unwrap_or_else(|| l.clone())).collect();
        }
        if cancel.is_cancelled() {
            return lines.to_vec();
        }

        let request: Vec<String> = misses.iter().map(|(_, _, clean)| clean.clone()).collect();
        self.rate_limiter.wait().await;
        debug!(
            "Sending {} of {} lines to {} ({} -> {})",
            request.len(),
            lines.len(),
            self.provider.name(),
            source,
            target
        );

        let translated = match self.provider.translate(&request, &source, target, cancel).await {
            Ok(translated) if translated.len() == request.len() => translated,
            Ok(translated) => {
                warn!(
                    "{} returned {} lines for {}; keeping originals",
                    self.provider.name(),
                    translated.len(),
                    request.len()
                );
                return lines.to_vec();
            }
            Err(e) => {
                warn!("{} failed: {}; keeping originals", self.provider.name(), e);
                return lines.to_vec();
            }
        };

        for ((index, wrap, clean), translation) in misses.into_iter().zip(translated) {
            let trimmed = translation.trim();
            if trimmed.is_empty() {
                results[index] = Some(lines[index].clone());
                continue;
            }
            // equal to the source may be a fallback, not a translation
            if trimmed != clean.trim() {
                self.cache.store(&clean, &source, target, trimmed);
            }
            results[index] = Some(FormatPreserver::rewrap(&wrap, trimmed));
        }

        results.into_iter().zip(lines).map(|(r, l)| r.unwrap_or_else(|| l.clone())).collect()
    }

    /// Translate a single text
    pub async fn translate_text(&self, text: &str, source: &str, target: &str, cancel: &CancellationFlag) -> String {
        let lines = [text.to_string()];
        self.translate_lines(&lines, source, target, cancel)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| text.to_string())
    }
}
