/*!
 * Tests for the provider adapters driven by scripted endpoints
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use subtrad::app_config::{ProviderConfig, TranslationProvider};
use subtrad::cancellation::CancellationFlag;
use subtrad::errors::ProviderError;
use subtrad::providers::Provider;
use subtrad::providers::batch_join::{BatchJoinProvider, JoinStrategy};
use subtrad::providers::endpoint::TextEndpoint;
use subtrad::providers::mock::{MockEndpoint, RecordingSleeper};
use subtrad::providers::per_line::PerLineProvider;
use subtrad::providers::retry::RetryPolicy;

use crate::common::lines;

fn quick_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay_ms: 10,
        max_delay_ms: 40,
    }
}

#[tokio::test]
async fn test_per_line_with_failing_endpoint_should_return_sources() {
    let endpoint = MockEndpoint::failing();
    let sleeper = RecordingSleeper::default();
    let provider = PerLineProvider::new(Arc::new(endpoint.clone()), 3)
        .with_retry(quick_retry(2), Arc::new(sleeper.clone()));

    let input = lines(&["one", "two", "three"]);
    let output = provider
        .translate(&input, "en", "es", &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(output, input);
    // first attempt plus two retries per line
    assert_eq!(endpoint.call_count(), 9);
    assert_eq!(sleeper.recorded().len(), 6);
}

#[tokio::test]
async fn test_per_line_should_keep_input_order() {
    let endpoint = MockEndpoint::uppercase();
    let provider = PerLineProvider::new(Arc::new(endpoint), 4);

    let input = lines(&["a", "b", "", "c", "d"]);
    let output = provider
        .translate(&input, "en", "es", &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(output, lines(&["A", "B", "", "C", "D"]));
}

/// Endpoint that records how many requests overlap
#[derive(Debug, Default)]
struct InFlightEndpoint {
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl TextEndpoint for InFlightEndpoint {
    fn name(&self) -> &str {
        "in-flight"
    }

    async fn translate_text(&self, text: &str, _source: &str, _target: &str) -> Result<String, ProviderError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(text.to_uppercase())
    }
}

#[tokio::test]
async fn test_per_line_fan_out_should_never_exceed_six_requests() {
    let mut config = ProviderConfig::new(TranslationProvider::GoogleFree);
    config.concurrent_requests = 20;

    let endpoint = Arc::new(InFlightEndpoint::default());
    let provider = PerLineProvider::new(endpoint.clone(), config.effective_concurrency());
    let input: Vec<String> = (0..30).map(|i| format!("line {}", i)).collect();
    let output = provider
        .translate(&input, "en", "es", &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(output.len(), 30);
    assert_eq!(output[7], "LINE 7");
    assert_eq!(endpoint.calls.load(Ordering::SeqCst), 30);
    let peak = endpoint.peak.load(Ordering::SeqCst);
    assert!(peak <= 6, "peak in-flight was {}", peak);
    assert!(peak > 1);

    // the adapter clamps on its own too
    let endpoint = Arc::new(InFlightEndpoint::default());
    let provider = PerLineProvider::new(endpoint.clone(), 20);
    provider
        .translate(&input, "en", "es", &CancellationFlag::new())
        .await
        .unwrap();
    assert!(endpoint.peak.load(Ordering::SeqCst) <= 6);
}

#[tokio::test]
async fn test_batch_join_with_total_failure_should_keep_length() {
    let endpoint = MockEndpoint::failing();
    let provider = BatchJoinProvider::new(Arc::new(endpoint), JoinStrategy::Delimiter, 4500)
        .with_retry(RetryPolicy::no_retry(), Arc::new(RecordingSleeper::default()));

    let input = lines(&["first", "second", "42", "third"]);
    let output = provider
        .translate(&input, "en", "es", &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(output.len(), input.len());
    assert_eq!(output, input);
}

#[tokio::test]
async fn test_batch_join_delimiter_should_send_one_request() {
    let endpoint = MockEndpoint::uppercase();
    let provider = BatchJoinProvider::new(Arc::new(endpoint.clone()), JoinStrategy::Delimiter, 4500);

    let input = lines(&["hello", "two\nlines"]);
    let output = provider
        .translate(&input, "en", "es", &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(output, lines(&["HELLO", "TWO\nLINES"]));
    assert_eq!(endpoint.call_count(), 1);
}

#[tokio::test]
async fn test_batch_join_newline_under_split_should_fall_back_per_line() {
    let endpoint = MockEndpoint::with_fn(|text| Ok(text.replace('\n', " ").to_uppercase()));
    let provider = BatchJoinProvider::new(Arc::new(endpoint.clone()), JoinStrategy::Newline, 4500)
        .with_retry(RetryPolicy::no_retry(), Arc::new(RecordingSleeper::default()));

    let input = lines(&["a", "b", "c"]);
    let output = provider
        .translate(&input, "en", "es", &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(output, lines(&["A", "B", "C"]));
    assert_eq!(endpoint.call_count(), 4);
}

#[tokio::test]
async fn test_cancelled_flag_should_stop_endpoint_calls() {
    let endpoint = MockEndpoint::uppercase();
    let provider = PerLineProvider::new(Arc::new(endpoint.clone()), 2);
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let input = lines(&["a", "b"]);
    let output = provider.translate(&input, "en", "es", &cancel).await.unwrap();

    assert_eq!(output, input);
    assert_eq!(endpoint.call_count(), 0);
    assert_eq!(endpoint.name(), "mock-endpoint");
}
