//! Library-wide misclassification scans.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use curator_model::{
    Item, ItemId, ItemType, Library, LibraryId, MisclassificationAnalysis, ScanResult,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::database::{
    ItemFilter, ItemOrder, ItemRepository, ItemUpdate, LibraryRepository,
    MisclassificationUpdate, Page,
};
use crate::error::{CuratorError, Result};
use crate::misclassification::{ItemContext, MisclassificationAnalyzer, should_flag};

pub const DEFAULT_SCAN_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRequest {
    /// All libraries when unset
    pub library_id: Option<LibraryId>,
    /// All types when empty
    pub item_types: Vec<ItemType>,
}

/// Runs the analyzer over every item in scope and persists the outcome.
#[derive(Clone)]
pub struct LibraryScanner {
    items: Arc<dyn ItemRepository>,
    libraries: Arc<dyn LibraryRepository>,
    analyzer: MisclassificationAnalyzer,
    batch_size: usize,
}

impl fmt::Debug for LibraryScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryScanner")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl LibraryScanner {
    pub fn new(items: Arc<dyn ItemRepository>, libraries: Arc<dyn LibraryRepository>) -> Self {
        Self {
            items,
            libraries,
            analyzer: MisclassificationAnalyzer::default(),
            batch_size: DEFAULT_SCAN_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_analyzer(mut self, analyzer: MisclassificationAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn analyzer(&self) -> &MisclassificationAnalyzer {
        &self.analyzer
    }

    /// Scan one library, or every library, in fixed-size batches.
    ///
    /// `cancel` is checked before each library and each batch; a cancelled
    /// scan returns the partial counts with `cancelled` set.
    pub async fn scan(
        &self,
        request: &ScanRequest,
        cancel: &CancellationToken,
    ) -> Result<ScanResult> {
        let started = Instant::now();
        let libraries = self.libraries_in_scope(request.library_id).await?;
        let mut result = ScanResult::default();

        info!(
            target: "curator::scan",
            libraries = libraries.len(),
            item_types = ?request.item_types,
            "starting misclassification scan"
        );

        for library in &libraries {
            if cancel.is_cancelled() {
                result.cancelled = true;
                break;
            }
            self.scan_library(library, &request.item_types, cancel, &mut result)
                .await?;
            if result.cancelled {
                break;
            }
        }

        result.duration = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            target: "curator::scan",
            total = result.total_items,
            scanned = result.items_scanned,
            failed = result.failed_items,
            flagged = result.misclassified_items,
            cancelled = result.cancelled,
            duration_ms = result.duration,
            "misclassification scan finished"
        );
        Ok(result)
    }

    async fn libraries_in_scope(&self, library_id: Option<LibraryId>) -> Result<Vec<Library>> {
        match library_id {
            Some(id) => {
                let library = self
                    .libraries
                    .get(id)
                    .await?
                    .ok_or_else(|| CuratorError::not_found(format!("library {id}")))?;
                Ok(vec![library])
            }
            None => self.libraries.list().await,
        }
    }

    async fn scan_library(
        &self,
        library: &Library,
        item_types: &[ItemType],
        cancel: &CancellationToken,
        result: &mut ScanResult,
    ) -> Result<()> {
        let filter = ItemFilter::new().library(Some(library.id)).types(item_types);
        let total = self.items.count(&filter).await?;
        result.total_items += total;

        debug!(
            target: "curator::scan",
            library = %library.name,
            total,
            "scanning library"
        );

        let mut offset = 0u64;
        loop {
            if cancel.is_cancelled() {
                result.cancelled = true;
                return Ok(());
            }

            let batch = self
                .items
                .find(
                    &filter,
                    Page::new(offset, self.batch_size as u64),
                    ItemOrder::CreatedAsc,
                )
                .await?;
            if batch.is_empty() {
                return Ok(());
            }
            offset += batch.len() as u64;

            for item in &batch {
                match self.scan_item(item).await {
                    Ok(analysis) => {
                        result.items_scanned += 1;
                        if should_flag(&analysis) {
                            result.misclassified_items += 1;
                            if let Some(severity) = analysis.max_severity() {
                                result.record_severity(severity);
                            }
                        }
                    }
                    Err(err) => {
                        result.failed_items += 1;
                        warn!(
                            target: "curator::scan",
                            item_id = %item.id,
                            error = %err,
                            "skipping item after analysis failure"
                        );
                    }
                }
            }

            if batch.len() < self.batch_size {
                return Ok(());
            }
        }
    }

    async fn scan_item(&self, item: &Item) -> Result<MisclassificationAnalysis> {
        let analysis = self.analyze_loaded(item).await?;
        self.persist(&analysis).await?;
        Ok(analysis)
    }

    /// Analyze a single item ad hoc, optionally persisting the outcome.
    pub async fn analyze_item(
        &self,
        id: ItemId,
        persist: bool,
    ) -> Result<MisclassificationAnalysis> {
        let item = self
            .items
            .get(id)
            .await?
            .ok_or_else(|| CuratorError::not_found(format!("item {id}")))?;
        let analysis = self.analyze_loaded(&item).await?;
        if persist {
            self.persist(&analysis).await?;
        }
        Ok(analysis)
    }

    async fn analyze_loaded(&self, item: &Item) -> Result<MisclassificationAnalysis> {
        let children = match item.item_type {
            ItemType::Series | ItemType::Season => {
                self.items
                    .find(
                        &ItemFilter::new().parent(item.id),
                        Page::ALL,
                        ItemOrder::CreatedAsc,
                    )
                    .await?
            }
            _ => Vec::new(),
        };
        let parent = match item.parent_id {
            Some(parent_id) => self.items.get(parent_id).await?,
            None => None,
        };

        let ctx = ItemContext {
            item,
            children: &children,
            parent: parent.as_ref(),
        };
        Ok(self.analyzer.analyze(&ctx))
    }

    async fn persist(&self, analysis: &MisclassificationAnalysis) -> Result<()> {
        let checked_at = Utc::now();
        let update = if should_flag(analysis) {
            MisclassificationUpdate::Flag {
                score: analysis.score,
                reasons: analysis.reasons.clone(),
                checked_at,
            }
        } else {
            MisclassificationUpdate::Clear { checked_at }
        };
        self.items
            .update(analysis.item_id, ItemUpdate::Misclassification(update))
            .await?;
        Ok(())
    }

    /// Clear flags on every item matching `filter`.
    pub async fn dismiss(&self, filter: &ItemFilter) -> Result<u64> {
        let filter = filter.clone().flagged(true);
        let cleared = self
            .items
            .update_many(
                &filter,
                ItemUpdate::Misclassification(MisclassificationUpdate::Clear {
                    checked_at: Utc::now(),
                }),
            )
            .await?;
        info!(target: "curator::scan", cleared, "dismissed misclassification flags");
        Ok(cleared)
    }
}
