/*!
 * Mock providers and endpoints for testing.
 *
 * This module provides scripted stand-ins for the network layer:
 * - `MockProvider` - whole-list provider with dictionary, echo, failing,
 *   slow and mismatched-length behaviours
 * - `MockEndpoint` - single-text endpoint driven by a closure
 * - `RecordingSleeper` - backoff sleeper that records delays instead of waiting
 */

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::cancellation::CancellationFlag;
use crate::errors::ProviderError;
use crate::providers::Provider;
use crate::providers::endpoint::TextEndpoint;
use crate::providers::retry::Sleeper;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Translate known lines through the dictionary, echo the rest
    Dictionary(HashMap<String, String>),
    /// Return every line unchanged
    Echo,
    /// Always fails with an error
    Failing,
    /// Waits before echoing
    Slow { delay_ms: u64 },
    /// Returns one line fewer than requested
    Mismatched,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    accepts_auto: bool,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Vec<String>>>>,
    /// Cancel the flag once this many calls have completed
    cancel_after: Option<(usize, CancellationFlag)>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            accepts_auto: true,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            cancel_after: None,
        }
    }

    /// Translate through a fixed dictionary
    pub fn dictionary(pairs: &[(&str, &str)]) -> Self {
        let map = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Self::new(MockBehavior::Dictionary(map))
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    pub fn mismatched() -> Self {
        Self::new(MockBehavior::Mismatched)
    }

    /// Behave like a backend that needs an explicit source language
    pub fn rejecting_auto_source(mut self) -> Self {
        self.accepts_auto = false;
        self
    }

    /// Set `flag` once `calls` calls have completed
    pub fn cancel_after(mut self, calls: usize, flag: CancellationFlag) -> Self {
        self.cancel_after = Some((calls, flag));
        self
    }

    /// Number of `translate` calls made so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Inputs of every call, in call order
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().clone()
    }

    fn lookup(&self, line: &str) -> String {
        match &self.behavior {
            MockBehavior::Dictionary(map) => map.get(line.trim()).cloned().unwrap_or_else(|| line.to_string()),
            _ => line.to_string(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn accepts_auto_source(&self) -> bool {
        self.accepts_auto
    }

    async fn translate(
        &self,
        lines: &[String],
        _source: &str,
        _target: &str,
        _cancel: &CancellationFlag,
    ) -> Result<Vec<String>, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(lines.to_vec());

        if let MockBehavior::Slow { delay_ms } = self.behavior {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        let result = match self.behavior {
            MockBehavior::Failing => Err(ProviderError::RequestFailed("mock failure".to_string())),
            MockBehavior::Mismatched => Ok(lines.iter().skip(1).cloned().collect()),
            _ => Ok(lines.iter().map(|l| self.lookup(l)).collect()),
        };

        if let Some((after, flag)) = &self.cancel_after {
            if count >= *after {
                flag.cancel();
            }
        }

        result
    }
}

type EndpointFn = dyn Fn(&str) -> Result<String, ProviderError> + Send + Sync;

/// Single-text endpoint driven by a closure, recording every request
#[derive(Clone)]
pub struct MockEndpoint {
    respond: Arc<EndpointFn>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl fmt::Debug for MockEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockEndpoint")
            .field("calls", &self.calls.lock().len())
            .finish()
    }
}

impl MockEndpoint {
    pub fn with_fn<F>(respond: F) -> Self
    where
        F: Fn(&str) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        Self {
            respond: Arc::new(respond),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Upper-cases its input
    pub fn uppercase() -> Self {
        Self::with_fn(|text| Ok(text.to_uppercase()))
    }

    /// Always fails with a retryable error
    pub fn failing() -> Self {
        Self::with_fn(|_| Err(ProviderError::RequestFailed("connection reset".to_string())))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TextEndpoint for MockEndpoint {
    fn name(&self) -> &str {
        "mock-endpoint"
    }

    async fn translate_text(&self, text: &str, _source: &str, _target: &str) -> Result<String, ProviderError> {
        self.calls.lock().push(text.to_string());
        (self.respond)(text)
    }
}

/// Sleeper that records requested delays and returns immediately
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_dictionary_translates_known_lines() {
        let provider = MockProvider::dictionary(&[("Hello", "Hola")]);
        let out = provider
            .translate(&lines(&["Hello", "Other"]), "en", "es", &CancellationFlag::new())
            .await
            .unwrap();
        assert_eq!(out, lines(&["Hola", "Other"]));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mismatched_drops_a_line() {
        let provider = MockProvider::mismatched();
        let out = provider
            .translate(&lines(&["a", "b"]), "en", "es", &CancellationFlag::new())
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_after_sets_flag() {
        let flag = CancellationFlag::new();
        let provider = MockProvider::echo().cancel_after(1, flag.clone());
        provider.translate(&lines(&["a"]), "en", "es", &flag).await.unwrap();
        assert!(flag.is_cancelled());
    }
}
