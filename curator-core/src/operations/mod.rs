//! Bulk operation preview/execute pipeline.

pub mod pipeline;
pub mod preview;
pub mod runner;
pub mod scope;

pub use pipeline::{BulkOperationService, DEFAULT_MAX_SCOPE_ITEMS};
pub use preview::{DEFAULT_PREVIEW_TTL_SECS, PreviewRecord, PreviewTokenStore};
pub use runner::{JobPlan, JobRunner, RunnerConfig};
pub use scope::{ResolvedScope, resolve_scope};
