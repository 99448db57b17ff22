use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{Config, TranslationProvider};
use crate::cancellation::CancellationFlag;
use crate::errors::{AppError, ProviderError};
use crate::file_utils::{FileManager, OutputWriter};
use crate::providers::endpoint::LibreTranslateEndpoint;
use crate::providers::{self, Provider};
use crate::timefix::{self, TimeFixReport};
use crate::translation::{BatchLimits, EventCallback, PipelineEvent, PipelineOutcome, TranslationPipeline, TranslationService};

// @module: Application controller for subtitle processing

/// Counts reported after a queue of files has been processed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub translated: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Translated => self.translated += 1,
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Cancelled => self.cancelled += 1,
            FileOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FileOutcome {
    Translated,
    Skipped,
    Cancelled,
    Failed,
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Flags of runs in flight, cancelled together on shutdown
    active: Arc<Mutex<Vec<CancellationFlag>>>,

    // @field: Set once shutdown was requested, stops the queue
    stopping: CancellationFlag,

    multi_progress: MultiProgress,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self, AppError> {
        config
            .validate()
            .map_err(|e| AppError::Config(format!("Invalid configuration: {:#}", e)))?;
        Ok(Self {
            config,
            active: Arc::new(Mutex::new(Vec::new())),
            stopping: CancellationFlag::new(),
            multi_progress: MultiProgress::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cancel every file in flight and stop picking up queued ones
    pub fn cancel_all(&self) {
        self.stopping.cancel();
        for flag in self.active.lock().iter() {
            flag.cancel();
        }
    }

    /// Where the translation of `input_file` is written
    pub fn output_path_for(&self, input_file: &Path) -> PathBuf {
        OutputWriter::output_path(input_file, &self.config.target_language)
    }

    /// Translate a single subtitle file
    pub async fn run(&self, input_file: PathBuf, force_overwrite: bool) -> Result<RunSummary, AppError> {
        if !FileManager::file_exists(&input_file) {
            return Err(AppError::File(format!("Input file does not exist: {:?}", input_file)));
        }
        let provider = providers::create_provider(&self.config.translation);
        Ok(self.run_files(vec![input_file], force_overwrite, provider).await)
    }

    /// Translate every `.srt` file under a directory.
    /// Files that already have a translation are skipped unless forced.
    pub async fn run_folder(&self, input_dir: PathBuf, force_overwrite: bool) -> Result<RunSummary, AppError> {
        if !FileManager::dir_exists(&input_dir) {
            return Err(AppError::File(format!("Input directory does not exist: {:?}", input_dir)));
        }

        let files = FileManager::find_files(&input_dir, "srt").map_err(|e| AppError::File(format!("{:#}", e)))?;
        if files.is_empty() {
            return Err(AppError::File(format!("No subtitle files found in directory: {:?}", input_dir)));
        }
        info!("Found {} subtitle files in {}", files.len(), input_dir.display());

        let provider = providers::create_provider(&self.config.translation);
        Ok(self.run_files(files, force_overwrite, provider).await)
    }

    /// Process a queue of files with at most `max_concurrent_files` in flight.
    ///
    /// Each file gets its own pipeline task and cancellation flag; a failing
    /// file is logged and does not stop the queue. All files share one rate
    /// limiter and one cache.
    pub async fn run_files(&self, files: Vec<PathBuf>, force_overwrite: bool, provider: Arc<dyn Provider>) -> RunSummary {
        let start_time = Instant::now();
        let concurrency = self.config.translation.common.max_concurrent_files.max(1);
        let service = self.build_service(provider);

        let folder_pb = self.multi_progress.add(ProgressBar::new(files.len() as u64));
        folder_pb.set_style(bar_style("files"));
        folder_pb.set_message("Processing files");

        let outcomes: Vec<FileOutcome> = stream::iter(files)
            .map(|file| {
                let service = service.clone();
                let folder_pb = folder_pb.clone();
                async move {
                    let outcome = self.process_file(file, force_overwrite, service).await;
                    folder_pb.inc(1);
                    outcome
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut summary = RunSummary::default();
        for outcome in outcomes {
            summary.record(outcome);
        }

        folder_pb.finish_with_message("Done");
        info!(
            "Processing completed in {}: {} translated, {} skipped, {} cancelled, {} errors",
            format_duration(start_time.elapsed()),
            summary.translated,
            summary.skipped,
            summary.cancelled,
            summary.failed
        );
        summary
    }

    async fn process_file(&self, input_file: PathBuf, force_overwrite: bool, service: TranslationService) -> FileOutcome {
        let file_name = input_file
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if self.stopping.is_cancelled() {
            return FileOutcome::Cancelled;
        }

        let output_path = self.output_path_for(&input_file);
        if output_path.exists() && !force_overwrite {
            warn!("Skipping {}, translation already exists (use -f to force overwrite)", file_name);
            return FileOutcome::Skipped;
        }

        let cancel = CancellationFlag::new();
        self.active.lock().push(cancel.clone());

        let file_pb = self.multi_progress.add(ProgressBar::new(100));
        file_pb.set_style(bar_style("%"));
        file_pb.set_message(file_name.clone());

        let pipeline = self.build_pipeline(service).with_events(progress_callback(file_pb.clone()));
        let result = pipeline.spawn(input_file, cancel.clone()).await;

        self.active.lock().retain(|flag| !flag.same_flag(&cancel));

        match result {
            Ok(Ok(PipelineOutcome::Completed(path))) => {
                file_pb.finish_with_message(format!("{} done", file_name));
                info!("Saved {}", path.display());
                FileOutcome::Translated
            }
            Ok(Ok(PipelineOutcome::Cancelled)) => {
                file_pb.abandon_with_message(format!("{} cancelled", file_name));
                warn!("Translation of {} cancelled, nothing written", file_name);
                FileOutcome::Cancelled
            }
            Ok(Err(e)) => {
                file_pb.abandon_with_message(format!("{} failed", file_name));
                error!("Error processing file {}: {}", file_name, e);
                FileOutcome::Failed
            }
            Err(e) => {
                file_pb.abandon_with_message(format!("{} failed", file_name));
                error!("Translation task for {} panicked: {}", file_name, e);
                FileOutcome::Failed
            }
        }
    }

    /// Service for a run. Clones share its rate limiter and cache.
    pub fn build_service(&self, provider: Arc<dyn Provider>) -> TranslationService {
        TranslationService::from_config(&self.config.translation, provider)
    }

    /// Pipeline for one file using the configured languages and limits
    pub fn build_pipeline(&self, service: TranslationService) -> TranslationPipeline {
        let provider_config = self.config.translation.get_active_provider_config();
        TranslationPipeline::new(service, &self.config.source_language, &self.config.target_language)
            .with_limits(BatchLimits::from(&provider_config))
    }

    /// Copy the timing of `original` onto the text of `translated`
    pub fn timefix(
        &self,
        original: &Path,
        translated: &Path,
        output: Option<PathBuf>,
    ) -> Result<(PathBuf, TimeFixReport), AppError> {
        let output = output.unwrap_or_else(|| default_timefix_output(translated));
        let report = timefix::fix_file(original, translated, &output)?;
        Ok((output, report))
    }

    /// Check that the configured provider answers.
    /// LibreTranslate is asked for its language list; other backends get a one-word request.
    pub async fn check(&self) -> Result<(), AppError> {
        let translation = &self.config.translation;
        let provider_config = translation.get_active_provider_config();
        info!("Checking {} at {}", translation.provider.display_name(), translation.get_endpoint());

        if translation.provider == TranslationProvider::LibreTranslate {
            let endpoint = LibreTranslateEndpoint::new(
                translation.get_endpoint(),
                Some(provider_config.api_key.clone()),
                provider_config.timeout(),
            );
            if endpoint.is_running().await {
                return Ok(());
            }
            return Err(ProviderError::RequestFailed(format!("no LibreTranslate server at {}", translation.get_endpoint())).into());
        }

        let provider = providers::create_provider(translation);
        let source = if provider.accepts_auto_source() { "auto" } else { "en" };
        let sample = vec!["Hello".to_string()];
        let lines = provider
            .translate(&sample, source, &self.config.target_language, &CancellationFlag::new())
            .await?;
        if lines.first().is_some_and(|l| !l.trim().is_empty()) {
            Ok(())
        } else {
            Err(ProviderError::BadResponse(format!("{} returned an empty reply", provider.name())).into())
        }
    }
}

fn default_timefix_output(translated: &Path) -> PathBuf {
    let stem = translated.file_stem().unwrap_or_default().to_string_lossy();
    translated.with_file_name(format!("{}_fixed.srt", stem))
}

fn progress_callback(progress_bar: ProgressBar) -> EventCallback {
    Arc::new(move |event: PipelineEvent| {
        if let PipelineEvent::Progress(percent) = event {
            progress_bar.set_position(u64::from(percent));
        }
    })
}

fn bar_style(unit: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} {{msg}}",
            unit
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

// Format duration in a human-readable format (HH:MM:SS)
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, duration.subsec_millis())
    }
}
