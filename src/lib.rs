/*!
 * # subtrad - batch subtitle translator
 *
 * A Rust library for translating SRT subtitle files through free or
 * self-hosted machine translation services.
 *
 * ## Features
 *
 * - Parse and write SRT files, tolerating BOMs, legacy encodings and CRLF
 * - Translate through several backends:
 *   - Google batch endpoint (newline-joined requests)
 *   - Google free endpoint (one request per line)
 *   - MyMemory
 *   - LibreTranslate (delimiter-joined requests)
 * - Deduplicate repeated lines and cache results
 * - Preserve inline markup and timing
 * - Cancel a running file cleanly without writing partial output
 * - Repair the timing of an already translated file
 *
 * ## Architecture
 *
 * - `app_config`: configuration and per-provider limits
 * - `subtitle_processor`: SRT parsing and serialization
 * - `translation`: translation pipeline:
 *   - `translation::service`: provider wrapper
 *   - `translation::orchestrator`: per-file state machine
 *   - `translation::batch`, `translation::dedup`, `translation::cache`
 *   - `translation::formatting`, `translation::postprocess`
 * - `providers`: backend adapters and retry policy
 * - `file_utils`: file discovery and output paths
 * - `app_controller`: file queue and progress display
 * - `language_utils`: ISO language codes and detection
 * - `timefix`: timing repair
 * - `cancellation`: cooperative cancellation flag
 * - `errors`: error types
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod app_controller;
pub mod cancellation;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod subtitle_processor;
pub mod timefix;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use cancellation::CancellationFlag;
pub use errors::{AppError, ProviderError, SubtitleError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part1_or_part2t};
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use translation::{TranslationPipeline, TranslationService};
