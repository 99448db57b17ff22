/*!
 * Batching orchestrator for a single subtitle file.
 *
 * Drives a file through the translation state machine:
 *
 * `Idle -> Loading -> Batching -> (PerBatchTranslating -> Assigning)* -> Finalizing -> Done`
 *
 * `Cancelled` can be reached from any in-flight state and writes nothing.
 * `Failed` is terminal for unreadable input and cardinality errors.
 *
 * Text is deduplicated before batching. Every unique result is assigned to
 * all original positions sharing its key, so output order and count always
 * match the input.
 */

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::task::JoinHandle;

use crate::app_config::ProviderConfig;
use crate::cancellation::CancellationFlag;
use crate::errors::{SubtitleError, TranslationError};
use crate::file_utils::OutputWriter;
use crate::providers::batch_join::split_collapsed;
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry};

use super::batch::plan_batches;
use super::dedup::deduplicate;
use super::postprocess::postprocess;
use super::service::TranslationService;

/// States of a translation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Loading,
    Batching,
    PerBatchTranslating,
    Assigning,
    Finalizing,
    Done,
    Cancelled,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Batching => "batching",
            Self::PerBatchTranslating => "translating",
            Self::Assigning => "assigning",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Notifications emitted while a run progresses
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StateChanged(PipelineState),
    /// Percentage, non-decreasing, 100 only once the run is done
    Progress(u8),
    /// A result was assigned to an entry
    LineTranslated {
        index: usize,
        original: String,
        translated: String,
    },
}

/// Receiver for pipeline events
pub type EventCallback = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// How a run ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Output written to this path
    Completed(PathBuf),
    Cancelled,
}

/// Batch sizing and pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_lines: usize,
    pub max_chars: usize,
    pub pause_after_batch: Duration,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_lines: 20,
            max_chars: 2500,
            pause_after_batch: Duration::ZERO,
        }
    }
}

impl From<&ProviderConfig> for BatchLimits {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            max_lines: config.max_lines_per_batch,
            max_chars: config.max_chars_per_batch,
            pause_after_batch: Duration::from_millis(config.pause_after_batch_ms),
        }
    }
}

enum RunStatus {
    Translated,
    Cancelled,
}

/// Tracks processed entries and emits clamped, non-decreasing percentages
struct ProgressTracker {
    total: usize,
    processed: usize,
    last: Option<u8>,
}

impl ProgressTracker {
    fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            last: None,
        }
    }

    fn advance(&mut self, count: usize) -> Option<u8> {
        self.processed += count;
        let percent = if self.total == 0 {
            0
        } else {
            ((100 * self.processed) / self.total).min(99) as u8
        };
        match self.last {
            Some(last) if percent <= last => None,
            _ => {
                self.last = Some(percent);
                Some(percent)
            }
        }
    }
}

/// Translates one subtitle file at a time
#[derive(Clone)]
pub struct TranslationPipeline {
    service: TranslationService,
    limits: BatchLimits,
    source_language: String,
    target_language: String,
    writer: OutputWriter,
    on_event: Option<EventCallback>,
}

impl fmt::Debug for TranslationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationPipeline")
            .field("provider", &self.service.provider().name())
            .field("limits", &self.limits)
            .field("source_language", &self.source_language)
            .field("target_language", &self.target_language)
            .finish()
    }
}

impl TranslationPipeline {
    pub fn new(service: TranslationService, source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            service,
            limits: BatchLimits::default(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            writer: OutputWriter,
            on_event: None,
        }
    }

    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_events(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(callback) = &self.on_event {
            callback(event);
        }
    }

    fn enter(&self, state: PipelineState) {
        debug!("Pipeline state: {}", state);
        self.emit(PipelineEvent::StateChanged(state));
    }

    /// Run the pipeline on its own task
    pub fn spawn(self, input: PathBuf, cancel: CancellationFlag) -> JoinHandle<Result<PipelineOutcome, TranslationError>> {
        tokio::spawn(async move { self.run(&input, &cancel).await })
    }

    /// Translate a file and write the result next to it
    pub async fn run(&self, input: &Path, cancel: &CancellationFlag) -> Result<PipelineOutcome, TranslationError> {
        self.enter(PipelineState::Loading);
        let mut entries = match SubtitleCollection::load_entries(input) {
            Ok(entries) => entries,
            Err(SubtitleError::Empty(path)) => {
                self.enter(PipelineState::Failed);
                return Err(TranslationError::Input(format!("no subtitle entries in {}", path)));
            }
            Err(e) => {
                self.enter(PipelineState::Failed);
                return Err(e.into());
            }
        };
        info!("Translating {} entries from {}", entries.len(), input.display());

        match self.process(&mut entries, cancel).await? {
            RunStatus::Cancelled => Ok(PipelineOutcome::Cancelled),
            RunStatus::Translated => {
                let path = self
                    .writer
                    .write(input, &entries, &self.target_language)
                    .inspect_err(|_| self.enter(PipelineState::Failed))?;
                self.finish();
                Ok(PipelineOutcome::Completed(path))
            }
        }
    }

    /// Translate entries in memory; returns false when the run was cancelled
    pub async fn translate_entries(
        &self,
        entries: &mut [SubtitleEntry],
        cancel: &CancellationFlag,
    ) -> Result<bool, TranslationError> {
        match self.process(entries, cancel).await? {
            RunStatus::Cancelled => Ok(false),
            RunStatus::Translated => {
                self.finish();
                Ok(true)
            }
        }
    }

    fn finish(&self) {
        self.emit(PipelineEvent::Progress(100));
        self.enter(PipelineState::Done);
    }

    fn cancelled(&self) -> RunStatus {
        info!("Translation cancelled, no output written");
        self.enter(PipelineState::Cancelled);
        RunStatus::Cancelled
    }

    async fn process(&self, entries: &mut [SubtitleEntry], cancel: &CancellationFlag) -> Result<RunStatus, TranslationError> {
        if entries.is_empty() {
            self.enter(PipelineState::Failed);
            return Err(TranslationError::Input("no subtitle entries to translate".to_string()));
        }

        self.enter(PipelineState::Batching);
        let texts: Vec<&str> = entries.iter().map(|e| e.original.as_str()).collect();
        let plan = deduplicate(&texts);
        let positions = plan.positions();
        let batches = plan_batches(&plan.unique, self.limits.max_lines, self.limits.max_chars);
        debug!(
            "{} entries, {} unique texts, {} batches",
            entries.len(),
            plan.unique.len(),
            batches.len()
        );

        let mut results: Vec<Option<String>> = plan.mapping.iter().map(|m| m.map_or(Some(String::new()), |_| None)).collect();
        let mut progress = ProgressTracker::new(entries.len());
        let mut blank = 0;
        for (index, result) in results.iter().enumerate() {
            if let Some(text) = result {
                blank += 1;
                self.emit(PipelineEvent::LineTranslated {
                    index,
                    original: entries[index].original.clone(),
                    translated: text.clone(),
                });
            }
        }
        if let Some(percent) = progress.advance(blank) {
            self.emit(PipelineEvent::Progress(percent));
        }

        let batch_count = batches.len();
        for (batch_number, batch) in batches.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(self.cancelled());
            }
            self.enter(PipelineState::PerBatchTranslating);
            debug!("Batch {}/{}: {} texts", batch_number + 1, batch_count, batch.len());

            if cancel.is_cancelled() {
                return Ok(self.cancelled());
            }
            let mut translated = self
                .service
                .translate_lines(&batch.texts, &self.source_language, &self.target_language, cancel)
                .await;
            if cancel.is_cancelled() {
                return Ok(self.cancelled());
            }

            if let Some(split) = split_collapsed(&translated, batch.len()) {
                warn!("Batch {} came back collapsed into one row; splitting it", batch_number + 1);
                translated = split;
            }
            if translated.len() != batch.len() {
                warn!(
                    "Batch {} returned {} results for {} texts; keeping originals",
                    batch_number + 1,
                    translated.len(),
                    batch.len()
                );
                translated = batch.texts.clone();
            }

            self.enter(PipelineState::Assigning);
            for (key, text) in batch.indices.iter().zip(translated) {
                for &index in &positions[*key] {
                    results[index] = Some(text.clone());
                    self.emit(PipelineEvent::LineTranslated {
                        index,
                        original: entries[index].original.clone(),
                        translated: text.clone(),
                    });
                    if let Some(percent) = progress.advance(1) {
                        self.emit(PipelineEvent::Progress(percent));
                    }
                }
            }

            if !self.limits.pause_after_batch.is_zero() && batch_number + 1 < batch_count {
                tokio::time::sleep(self.limits.pause_after_batch).await;
            }
        }

        self.enter(PipelineState::Finalizing);
        let results: Vec<String> = results.into_iter().flatten().collect();
        if results.len() != entries.len() {
            self.enter(PipelineState::Failed);
            return Err(TranslationError::CardinalityMismatch {
                expected: entries.len(),
                actual: results.len(),
            });
        }

        for (entry, result) in entries.iter_mut().zip(results) {
            let processed = postprocess(&result);
            entry.translated = if processed.is_empty() && !entry.original.trim().is_empty() {
                entry.original.clone()
            } else {
                processed
            };
        }

        Ok(RunStatus::Translated)
    }
}
