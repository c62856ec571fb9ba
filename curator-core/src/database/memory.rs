//! In-process store adapters. Used when no database is configured and by
//! the test suites.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use curator_model::{
    Item, ItemId, Job, JobId, Library, LibraryId, OperationLog,
};
use tokio::sync::RwLock;

use super::ports::{
    ItemFilter, ItemOrder, ItemRepository, ItemUpdate, JobFilter, JobRepository, JobUpdate,
    LibraryRepository, LogOrder, Page,
};
use crate::error::{CuratorError, Result};

fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
    let limit = page
        .limit
        .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
        .unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
}

fn compare_items(order: ItemOrder, left: &Item, right: &Item) -> Ordering {
    let tie_break = || {
        left.created_at
            .cmp(&right.created_at)
            .then_with(|| left.id.cmp(&right.id))
    };
    match order {
        ItemOrder::CreatedAsc => tie_break(),
        ItemOrder::NameAsc => left
            .name
            .to_lowercase()
            .cmp(&right.name.to_lowercase())
            .then_with(tie_break),
        ItemOrder::ScoreDesc => {
            let left_score = left.misclassification_score.unwrap_or(-1.0);
            let right_score = right.misclassification_score.unwrap_or(-1.0);
            right_score.total_cmp(&left_score).then_with(tie_break)
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryItemRepository {
    items: RwLock<HashMap<ItemId, Item>>,
}

impl InMemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed items directly, bypassing upsert semantics.
    pub async fn insert_all(&self, items: impl IntoIterator<Item = Item>) {
        let mut guard = self.items.write().await;
        for item in items {
            guard.insert(item.id, item);
        }
    }
}

#[async_trait]
impl ItemRepository for InMemoryItemRepository {
    async fn get(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[ItemId]) -> Result<Vec<Item>> {
        let guard = self.items.read().await;
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }

    async fn get_by_jellyfin_id(&self, jellyfin_id: &str) -> Result<Option<Item>> {
        let guard = self.items.read().await;
        Ok(guard
            .values()
            .find(|item| item.jellyfin_id == jellyfin_id)
            .cloned())
    }

    async fn find(&self, filter: &ItemFilter, page: Page, order: ItemOrder) -> Result<Vec<Item>> {
        let guard = self.items.read().await;
        let mut matched: Vec<Item> = guard
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();
        matched.sort_by(|left, right| compare_items(order, left, right));
        Ok(paginate(matched, page))
    }

    async fn count(&self, filter: &ItemFilter) -> Result<u64> {
        let guard = self.items.read().await;
        Ok(guard.values().filter(|item| filter.matches(item)).count() as u64)
    }

    async fn update(&self, id: ItemId, update: ItemUpdate) -> Result<Item> {
        let mut guard = self.items.write().await;
        let item = guard
            .get_mut(&id)
            .ok_or_else(|| CuratorError::not_found(format!("item {id}")))?;
        update.apply(item);
        Ok(item.clone())
    }

    async fn update_many(&self, filter: &ItemFilter, update: ItemUpdate) -> Result<u64> {
        let mut guard = self.items.write().await;
        let mut touched = 0;
        for item in guard.values_mut().filter(|item| filter.matches(item)) {
            update.apply(item);
            touched += 1;
        }
        Ok(touched)
    }

    async fn upsert(&self, mut item: Item) -> Result<Item> {
        let mut guard = self.items.write().await;
        let existing = guard
            .values()
            .find(|candidate| candidate.jellyfin_id == item.jellyfin_id)
            .cloned();
        if let Some(existing) = existing {
            item.id = existing.id;
            item.created_at = existing.created_at;
            item.suspected_misclassification = existing.suspected_misclassification;
            item.misclassification_score = existing.misclassification_score;
            item.misclassification_reasons = existing.misclassification_reasons;
            item.misclassification_checked_at = existing.misclassification_checked_at;
        }
        guard.insert(item.id, item.clone());
        Ok(item)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLibraryRepository {
    libraries: RwLock<HashMap<LibraryId, Library>>,
}

impl InMemoryLibraryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LibraryRepository for InMemoryLibraryRepository {
    async fn list(&self) -> Result<Vec<Library>> {
        let mut libraries: Vec<Library> =
            self.libraries.read().await.values().cloned().collect();
        libraries.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(libraries)
    }

    async fn get(&self, id: LibraryId) -> Result<Option<Library>> {
        Ok(self.libraries.read().await.get(&id).cloned())
    }

    async fn upsert(&self, mut library: Library) -> Result<Library> {
        let mut guard = self.libraries.write().await;
        if let Some(existing) = guard
            .values()
            .find(|candidate| candidate.jellyfin_id == library.jellyfin_id)
        {
            library.id = existing.id;
            library.created_at = existing.created_at;
        }
        guard.insert(library.id, library.clone());
        Ok(library)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    jobs: RwLock<HashMap<JobId, Job>>,
    logs: RwLock<Vec<OperationLog>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn log_count(&self) -> usize {
        self.logs.read().await.len()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create_job(&self, job: Job) -> Result<Job> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn update_job(&self, id: JobId, update: JobUpdate) -> Result<Job> {
        let mut guard = self.jobs.write().await;
        let job = guard
            .get_mut(&id)
            .ok_or_else(|| CuratorError::not_found(format!("job {id}")))?;
        update.apply(job);
        Ok(job.clone())
    }

    async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        let guard = self.jobs.read().await;
        let mut jobs: Vec<Job> = guard
            .values()
            .filter(|job| filter.job_type.is_none_or(|kind| kind == job.job_type))
            .filter(|job| filter.status.is_none_or(|status| status == job.status))
            .cloned()
            .collect();
        jobs.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(paginate(jobs, Page::new(filter.offset, filter.limit)))
    }

    async fn append_log(&self, entry: OperationLog) -> Result<()> {
        self.logs.write().await.push(entry);
        Ok(())
    }

    async fn list_logs(
        &self,
        job_id: JobId,
        limit: u64,
        order: LogOrder,
    ) -> Result<Vec<OperationLog>> {
        let guard = self.logs.read().await;
        let mut logs: Vec<OperationLog> = guard
            .iter()
            .filter(|entry| entry.job_id == job_id)
            .cloned()
            .collect();
        if order == LogOrder::Newest {
            logs.reverse();
        }
        Ok(paginate(logs, Page::new(0, limit)))
    }
}
