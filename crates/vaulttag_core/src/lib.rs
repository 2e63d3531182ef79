//! Core logic for vault tagging.
//! Indexing, change detection, reconciliation and header rewriting live here;
//! the classifier itself is supplied by the caller.

mod atomic_file;
pub mod cache;
pub mod classify;
pub mod config;
pub mod index;
pub mod logging;
pub mod model;
pub mod note;
pub mod service;

pub use cache::change_cache::{CacheError, ChangeCache, DEFAULT_CACHE_FILE};
pub use classify::response::parse_suggestion_response;
pub use classify::{Classifier, ClassifyError, ClassifyRequest};
pub use config::{ConfigError, TaggerConfig};
pub use index::tag_index::{IndexError, IndexFailure, IndexResult, TagIndex};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{HeaderTags, InlineTags, NoteTags};
pub use model::suggestion::{Maturity, Suggestion};
pub use model::tag::{Tag, TagSet};
pub use note::NoteError;
pub use service::reconcile::{reconcile, Reconciliation, TagPolicy};
pub use service::tagging_service::{
    rank, AutoApprove, Confirm, Decision, PlannedChange, RunOptions, RunReport, TaggingError,
    TaggingService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
