//! Store ports consumed by the analyzer, scan orchestrator and bulk
//! pipeline. Adapters live in [`super::memory`] and `super::postgres`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curator_model::{
    Item, ItemDiff, ItemId, ItemMetadata, ItemType, Job, JobId, JobStatus, JobType, Library,
    LibraryId, MetadataField, OperationLog, Reason, Severity,
};

use crate::error::Result;

/// Conjunction of optional predicates over items. Unset predicates match
/// everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    /// Set membership over internal ids
    pub ids: Option<Vec<ItemId>>,
    pub library_id: Option<LibraryId>,
    /// Empty means any type
    pub item_types: Vec<ItemType>,
    pub parent_id: Option<ItemId>,
    /// Case-insensitive substring over name, overview and path
    pub search: Option<String>,
    pub flagged: Option<bool>,
    /// Maximum reason severity must equal this level
    pub max_severity: Option<Severity>,
    pub updated_after: Option<DateTime<Utc>>,
}

impl ItemFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(mut self, ids: Vec<ItemId>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn library(mut self, library_id: Option<LibraryId>) -> Self {
        self.library_id = library_id;
        self
    }

    pub fn types(mut self, item_types: &[ItemType]) -> Self {
        self.item_types = item_types.to_vec();
        self
    }

    pub fn parent(mut self, parent_id: ItemId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn flagged(mut self, flagged: bool) -> Self {
        self.flagged = Some(flagged);
        self
    }

    pub fn max_severity(mut self, severity: Option<Severity>) -> Self {
        self.max_severity = severity;
        self
    }

    pub fn updated_after(mut self, at: DateTime<Utc>) -> Self {
        self.updated_after = Some(at);
        self
    }

    /// Reference evaluation of the filter, shared by in-process adapters.
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(ids) = &self.ids
            && !ids.contains(&item.id)
        {
            return false;
        }
        if self.library_id.is_some_and(|library| library != item.library_id) {
            return false;
        }
        if !self.item_types.is_empty() && !self.item_types.contains(&item.item_type) {
            return false;
        }
        if self.parent_id.is_some() && self.parent_id != item.parent_id {
            return false;
        }
        if let Some(query) = &self.search {
            let needle = query.to_lowercase();
            let haystacks = [
                Some(item.name.as_str()),
                item.overview.as_deref(),
                item.path.as_deref(),
            ];
            let hit = haystacks
                .into_iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self
            .flagged
            .is_some_and(|flagged| flagged != item.suspected_misclassification)
        {
            return false;
        }
        if let Some(severity) = self.max_severity
            && item.max_reason_severity() != Some(severity)
        {
            return false;
        }
        if self.updated_after.is_some_and(|after| item.updated_at <= after) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl Page {
    pub const ALL: Page = Page {
        offset: 0,
        limit: None,
    };

    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemOrder {
    /// Creation time, then id; stable across pages
    #[default]
    CreatedAsc,
    NameAsc,
    /// Highest misclassification score first, unflagged last
    ScoreDesc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MisclassificationUpdate {
    Flag {
        score: f64,
        reasons: Vec<Reason>,
        checked_at: DateTime<Utc>,
    },
    Clear {
        checked_at: DateTime<Utc>,
    },
}

/// Field-scoped item mutation. Each variant only touches its own field
/// group, so concurrent scans and bulk edits never overwrite each other's
/// columns.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemUpdate {
    /// Writes the content fields named in `fields`; the rest of `metadata`
    /// is ignored.
    Metadata {
        metadata: ItemMetadata,
        fields: BTreeSet<MetadataField>,
    },
    Misclassification(MisclassificationUpdate),
}

impl ItemUpdate {
    /// Every content field of the snapshot.
    pub fn metadata(metadata: ItemMetadata) -> Self {
        Self::metadata_fields(metadata, MetadataField::ALL)
    }

    pub fn metadata_fields(
        metadata: ItemMetadata,
        fields: impl IntoIterator<Item = MetadataField>,
    ) -> Self {
        ItemUpdate::Metadata {
            metadata,
            fields: fields.into_iter().collect(),
        }
    }

    /// Only the fields `diff` reports as changed.
    pub fn from_diff(proposed: ItemMetadata, diff: &ItemDiff) -> Self {
        let fields = diff
            .changes
            .iter()
            .filter_map(|change| MetadataField::from_wire(&change.field));
        Self::metadata_fields(proposed, fields)
    }

    pub fn apply(&self, item: &mut Item) {
        match self {
            ItemUpdate::Metadata { metadata, fields } => {
                metadata.apply_fields_to(item, fields.iter().copied())
            }
            ItemUpdate::Misclassification(MisclassificationUpdate::Flag {
                score,
                reasons,
                checked_at,
            }) => item.flag_misclassification(*score, reasons.clone(), *checked_at),
            ItemUpdate::Misclassification(MisclassificationUpdate::Clear { checked_at }) => {
                item.clear_misclassification(*checked_at)
            }
        }
        item.updated_at = Utc::now();
    }
}

#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn get(&self, id: ItemId) -> Result<Option<Item>>;
    /// Found items in the order of `ids`; unknown ids are skipped.
    async fn get_many(&self, ids: &[ItemId]) -> Result<Vec<Item>>;
    async fn get_by_jellyfin_id(&self, jellyfin_id: &str) -> Result<Option<Item>>;
    async fn find(&self, filter: &ItemFilter, page: Page, order: ItemOrder) -> Result<Vec<Item>>;
    async fn count(&self, filter: &ItemFilter) -> Result<u64>;
    /// Fails with `NotFound` when the item does not exist.
    async fn update(&self, id: ItemId, update: ItemUpdate) -> Result<Item>;
    async fn update_many(&self, filter: &ItemFilter, update: ItemUpdate) -> Result<u64>;
    /// Insert or refresh by Jellyfin id. The internal id and the
    /// misclassification fields of an existing row are preserved.
    async fn upsert(&self, item: Item) -> Result<Item>;
}

#[async_trait]
pub trait LibraryRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Library>>;
    async fn get(&self, id: LibraryId) -> Result<Option<Library>>;
    /// Insert or refresh by Jellyfin id, preserving the internal id.
    async fn upsert(&self, library: Library) -> Result<Library>;
}

/// Partial job mutation; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<f64>,
    pub items_processed: Option<u32>,
    pub items_failed: Option<u32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply(&self, job: &mut Job) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(progress) = self.progress {
            job.progress = progress.clamp(0.0, 1.0);
        }
        if let Some(processed) = self.items_processed {
            job.items_processed = processed;
        }
        if let Some(failed) = self.items_failed {
            job.items_failed = failed;
        }
        if self.start_time.is_some() {
            job.start_time = self.start_time;
        }
        if self.end_time.is_some() {
            job.end_time = self.end_time;
        }
        if self.error_message.is_some() {
            job.error_message = self.error_message.clone();
        }
        job.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub job_type: Option<JobType>,
    pub status: Option<JobStatus>,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOrder {
    #[default]
    Oldest,
    Newest,
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create_job(&self, job: Job) -> Result<Job>;
    /// Fails with `NotFound` when the job does not exist.
    async fn update_job(&self, id: JobId, update: JobUpdate) -> Result<Job>;
    async fn get_job(&self, id: JobId) -> Result<Option<Job>>;
    /// Newest first.
    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>>;
    async fn append_log(&self, entry: OperationLog) -> Result<()>;
    async fn list_logs(&self, job_id: JobId, limit: u64, order: LogOrder)
    -> Result<Vec<OperationLog>>;
}
