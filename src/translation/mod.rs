/*!
 * Subtitle translation pipeline.
 *
 * Submodules:
 *
 * - `service`: provider wrapper with caching, markup handling and rate limiting
 * - `orchestrator`: per-file state machine driving batches through the service
 * - `batch`: batch planning under line and character limits
 * - `dedup`: collapsing identical lines before translation
 * - `cache`: bounded translation cache
 * - `formatting`: inline markup stripping and restoration
 * - `postprocess`: cleanup applied to every translated line
 */

pub use self::batch::{WorkBatch, plan_batches};
pub use self::cache::TranslationCache;
pub use self::dedup::{DedupPlan, deduplicate, recompose};
pub use self::orchestrator::{
    BatchLimits, EventCallback, PipelineEvent, PipelineOutcome, PipelineState, TranslationPipeline,
};
pub use self::postprocess::postprocess;
pub use self::service::{RateLimiter, TranslationService};

pub mod batch;
pub mod cache;
pub mod dedup;
pub mod formatting;
pub mod orchestrator;
pub mod postprocess;
pub mod service;
