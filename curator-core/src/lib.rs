//! # Curator Core
//!
//! Metadata curation for Jellyfin libraries: safe field-level diffs before
//! any write, heuristic detection of misfiled items, and bulk metadata edits
//! that tolerate partial failure.
//!
//! ## Overview
//!
//! - **Diff Engine** ([`diff`]): pure comparison of two metadata snapshots
//!   with canonicalized collections and lock-aware conflict marking
//! - **Misclassification Analyzer** ([`misclassification`]): independent
//!   detectors folded into one normalized score
//! - **Library Scan** ([`scan`]): batched, cancellable analysis over whole
//!   libraries with persisted flags
//! - **Bulk Pipeline** ([`operations`]): preview tokens, background jobs and
//!   an append-only operation log
//! - **Stores** ([`database`]): repository ports with in-memory and
//!   PostgreSQL adapters
//! - **Integrations** ([`jellyfin`], [`providers`]): the Jellyfin HTTP API and
//!   capability-declared metadata providers
//!
//! ## Feature Flags
//!
//! - `database`: PostgreSQL adapters and embedded migrations (sqlx)
//! - `pg-tests`: adapter tests against a live PostgreSQL server

pub mod clock;
pub mod database;
pub mod diff;
pub mod error;
pub mod jellyfin;
pub mod metadata;
pub mod misclassification;
pub mod operations;
pub mod providers;
pub mod scan;

pub use clock::{Clock, ManualClock, SystemClock};
pub use diff::{DiffInput, compute_bulk_diff, compute_diff, diff_summary};
pub use error::{CuratorError, Result};
pub use metadata::{apply_patch, validate_patch};
pub use misclassification::{MisclassificationAnalyzer, should_flag};
pub use operations::{BulkOperationService, JobRunner, PreviewTokenStore, RunnerConfig};
pub use scan::{LibraryScanner, ScanRequest};

/// Embedded schema migrations for the PostgreSQL adapters.
#[cfg(feature = "database")]
#[cfg_attr(docsrs, doc(cfg(feature = "database")))]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
