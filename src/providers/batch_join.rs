/*!
 * Batch-join adapter.
 *
 * Joins many lines into a single request and splits the response back into
 * rows. Backends do not reliably preserve line structure, so the rows are
 * reconciled with the expected count before use:
 * - a response collapsed into the first row is split again
 * - extra rows are merged, shortest adjacent pair first
 * - missing rows make the chunk fall back to one request per line
 *
 * Numeric lines, timestamp lines and blank lines are never sent.
 */

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cancellation::CancellationFlag;
use crate::errors::ProviderError;
use crate::providers::Provider;
use crate::providers::endpoint::TextEndpoint;
use crate::providers::retry::{RetryPolicy, Sleeper, TokioSleeper, with_retry};
use crate::translation::cache::{TranslationCache, truncate_text};

/// Marker separating lines for the delimiter strategy
pub const DELIMITER_MARKER: &str = "[[~]]";

/// Full delimiter placed between joined lines
pub const DELIMITER: &str = "\n[[~]]\n";

static NUMERIC_LINE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

static TIMESTAMP_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{2}:\d{2}:\d{2},\d{3}\s*-->\s*\d{2}:\d{2}:\d{2},\d{3}$").unwrap()
});

/// How lines are joined into one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    /// Join with `\n`; inner line breaks are flattened to spaces
    Newline,
    /// Join with a low-collision delimiter; inner line breaks survive
    Delimiter,
}

/// Lines that must be returned verbatim instead of translated
pub fn is_protected_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || NUMERIC_LINE_REGEX.is_match(trimmed) || TIMESTAMP_LINE_REGEX.is_match(trimmed)
}

/// Split a single row that holds every expected row, when all others are empty
pub fn split_collapsed(rows: &[String], expected: usize) -> Option<Vec<String>> {
    if expected < 2 || rows.len() != expected {
        return None;
    }
    if rows[1..].iter().any(|r| !r.trim().is_empty()) {
        return None;
    }
    let parts: Vec<String> = rows[0].split('\n').map(|p| p.trim().to_string()).collect();
    if parts.len() < expected {
        return None;
    }
    Some(parts.into_iter().take(expected).collect())
}

/// Merge the shortest adjacent pair of rows until `expected` remain
pub fn merge_over_split(mut rows: Vec<String>, expected: usize) -> Vec<String> {
    while rows.len() > expected && rows.len() > 1 {
        let mut best = 0;
        let mut best_len = usize::MAX;
        for i in 0..rows.len() - 1 {
            let len = rows[i].chars().count() + rows[i + 1].chars().count();
            if len < best_len {
                best = i;
                best_len = len;
            }
        }
        let right = rows.remove(best + 1);
        let left = &mut rows[best];
        if !left.is_empty() && !right.is_empty() {
            left.push(' ');
        }
        left.push_str(&right);
    }
    rows
}

/// Bring response rows to exactly `expected`, or None when rows are missing
pub fn reconcile_rows(mut rows: Vec<String>, expected: usize) -> Option<Vec<String>> {
    while rows.len() > expected && rows.last().is_some_and(|r| r.trim().is_empty()) {
        rows.pop();
    }
    if rows.len() > expected {
        rows.retain(|r| !r.trim().is_empty());
    }

    if let Some(split) = split_collapsed(&rows, expected) {
        return Some(split);
    }

    match rows.len() {
        n if n == expected => Some(rows),
        n if n > expected => Some(merge_over_split(rows, expected)),
        _ => None,
    }
}

impl JoinStrategy {
    fn prepare(&self, text: &str) -> String {
        match self {
            Self::Newline => text
                .split(['\n', '\r'])
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            Self::Delimiter => text.trim().to_string(),
        }
    }

    fn separator(&self) -> &'static str {
        match self {
            Self::Newline => "\n",
            Self::Delimiter => DELIMITER,
        }
    }

    fn split_response(&self, response: &str) -> Vec<String> {
        match self {
            Self::Newline => response.split('\n').map(|r| r.trim().to_string()).collect(),
            Self::Delimiter => response.split(DELIMITER_MARKER).map(|r| r.trim().to_string()).collect(),
        }
    }

    fn reconcile(&self, rows: Vec<String>, expected: usize) -> Option<Vec<String>> {
        match self {
            Self::Newline => reconcile_rows(rows, expected),
            Self::Delimiter if rows.len() == expected => Some(rows),
            Self::Delimiter => split_collapsed(&rows, expected),
        }
    }
}

/// Adapter sending joined chunks of lines in a single request each
#[derive(Debug)]
pub struct BatchJoinProvider {
    endpoint: Arc<dyn TextEndpoint>,
    strategy: JoinStrategy,
    max_request_chars: usize,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    cache: TranslationCache,
}

impl BatchJoinProvider {
    pub fn new(endpoint: Arc<dyn TextEndpoint>, strategy: JoinStrategy, max_request_chars: usize) -> Self {
        Self {
            endpoint,
            strategy,
            max_request_chars: max_request_chars.max(1),
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            cache: TranslationCache::default(),
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

    /// Group pending items into chunks whose joined size fits the request limit
    fn chunk(&self, pending: Vec<(usize, String)>) -> Vec<Vec<(usize, String)>> {
        let separator_len = self.strategy.separator().chars().count();
        let mut chunks = Vec::new();
        let mut current: Vec<(usize, String)> = Vec::new();
        let mut current_len = 0;

        for item in pending {
            let len = item.1.chars().count();
            let added = if current.is_empty() { len } else { len + separator_len };
            if !current.is_empty() && current_len + added > self.max_request_chars {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current_len += if current.is_empty() { len } else { len + separator_len };
            current.push(item);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    async fn call(&self, text: &str, source: &str, target: &str, cancel: &CancellationFlag) -> Result<String, ProviderError> {
        with_retry(&self.policy, self.sleeper.as_ref(), cancel, self.endpoint.name(), || {
            self.endpoint.translate_text(text, source, target)
        })
        .await
    }

    /// Translate a chunk in one request; None means the chunk needs per-line fallback
    async fn translate_chunk(
        &self,
        chunk: &[(usize, String)],
        source: &str,
        target: &str,
        cancel: &CancellationFlag,
    ) -> Option<Vec<String>> {
        let joined = chunk
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join(self.strategy.separator());

        match self.call(&joined, source, target, cancel).await {
            Ok(response) => {
                let rows = self.strategy.split_response(&response);
                let received = rows.len();
                let reconciled = self.strategy.reconcile(rows, chunk.len());
                if reconciled.is_none() {
                    warn!(
                        "{}: expected {} rows, got {}; falling back to per-line requests",
                        self.endpoint.name(),
                        chunk.len(),
                        received
                    );
                }
                reconciled
            }
            Err(ProviderError::Cancelled) => None,
            Err(e) => {
                warn!("{}: chunk request failed ({}); falling back to per-line requests", self.endpoint.name(), e);
                None
            }
        }
    }

    async fn translate_single(&self, text: &str, source: &str, target: &str, cancel: &CancellationFlag) -> Option<String> {
        if cancel.is_cancelled() {
            return None;
        }
        match self.call(text, source, target, cancel).await {
            Ok(t) if !t.trim().is_empty() => Some(t.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                debug!("{}: keeping source for '{}': {}", self.endpoint.name(), truncate_text(text, 30), e);
                None
            }
        }
    }
}

#[async_trait]
impl Provider for BatchJoinProvider {
    fn name(&self) -> &str {
        self.endpoint.name()
    }

    async fn translate(
        &self,
        lines: &[String],
        source: &str,
        target: &str,
        cancel: &CancellationFlag,
    ) -> Result<Vec<String>, ProviderError> {
        let mut results: Vec<String> = lines.to_vec();
        let mut pending = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            if is_protected_line(line) {
                continue;
            }
            let key = line.trim();
            match self.cache.get(key, source, target) {
                Some(hit) => results[index] = hit,
                None => pending.push((index, self.strategy.prepare(line))),
            }
        }

        for chunk in self.chunk(pending) {
            if cancel.is_cancelled() {
                debug!("{}: cancelled, remaining lines keep their source text", self.endpoint.name());
                break;
            }

            let translated: Vec<Option<String>> = match self.translate_chunk(&chunk, source, target, cancel).await {
                Some(rows) => rows.into_iter().map(|r| Some(r).filter(|r| !r.is_empty())).collect(),
                None => {
                    let mut singles = Vec::with_capacity(chunk.len());
                    for (_, text) in &chunk {
                        singles.push(self.translate_single(text, source, target, cancel).await);
                    }
                    singles
                }
            };

            for ((index, _), translation) in chunk.iter().zip(translated) {
                if let Some(translation) = translation {
                    let key = lines[*index].trim();
                    if translation != key {
                        self.cache.store(key, source, target, &translation);
                    }
                    results[*index] = translation;
                }
            }
        }

        Ok(results)
    }
}
