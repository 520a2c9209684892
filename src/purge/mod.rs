mod batch_accumulator;
mod config;
mod message_preview;
mod pipeline;
mod rate_limiter;
mod run_report;

// Re-export public API
pub use batch_accumulator::BatchAccumulator;
pub use config::PurgeConfig;
pub use message_preview::{PREVIEW_LEN, preview_content};
pub use pipeline::{DeletionPipeline, Scope};
pub use rate_limiter::RateLimiter;
pub use run_report::{AbortReason, Counts, RunCounters, RunOutcome, RunReport, RunSummary};
