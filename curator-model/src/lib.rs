//! Core data model definitions shared across curator crates.
#![allow(missing_docs)]

pub mod diff;
pub mod error;
pub mod ids;
pub mod item;
pub mod jobs;
pub mod metadata;
pub mod misclassification;
pub mod operations;
pub mod providers;
pub mod scan;

pub use diff::{ChangeType, DiffSummary, FieldChange, ItemDiff};
pub use error::{ModelError, Result as ModelResult};
pub use ids::{ItemId, JobId, LibraryId};
pub use item::{Item, ItemType, Library, Person};
pub use jobs::{Job, JobStatus, JobType, OperationLog};
pub use metadata::{FieldKind, ItemMetadata, MetadataField};
pub use misclassification::{
    MisclassificationAnalysis, Reason, ReasonType, Severity,
};
pub use operations::{
    BulkOperationType, ExecuteRequest, ExecuteResponse, JobStatusResponse,
    MetadataPatch, OperationPreviewResponse, OperationRequest, OperationScope,
};
pub use providers::{
    Capability, ProviderArtwork, ProviderCapabilities, ProviderEpisode, ProviderInfo,
    ProviderMetadata, ProviderSearchResult,
};
pub use scan::{FlaggedItem, FlaggedItemsResponse, ScanResult, SyncReport};
