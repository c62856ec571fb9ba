//! Pulls libraries and items from Jellyfin into the local store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use curator_model::{ItemId, ItemType, Library, SyncReport};
use tracing::{debug, info, warn};

use super::{BaseItemDto, ItemsPage, ItemsQuery, JellyfinClient, JellyfinError, VirtualFolder};
use crate::database::{ItemRepository, LibraryRepository};
use crate::error::Result;

pub const DEFAULT_SYNC_PAGE_SIZE: u32 = 200;

/// Parents are synced before children so parent ids resolve locally.
const SYNC_ORDER: [ItemType; 5] = [
    ItemType::Series,
    ItemType::Season,
    ItemType::Episode,
    ItemType::Movie,
    ItemType::Collection,
];

/// Read side of the Jellyfin API used by the sync.
#[async_trait]
pub trait LibrarySource: Send + Sync {
    async fn fetch_libraries(&self) -> std::result::Result<Vec<VirtualFolder>, JellyfinError>;

    async fn fetch_items(
        &self,
        query: &ItemsQuery,
    ) -> std::result::Result<ItemsPage, JellyfinError>;
}

#[async_trait]
impl LibrarySource for JellyfinClient {
    async fn fetch_libraries(&self) -> std::result::Result<Vec<VirtualFolder>, JellyfinError> {
        JellyfinClient::fetch_libraries(self).await
    }

    async fn fetch_items(
        &self,
        query: &ItemsQuery,
    ) -> std::result::Result<ItemsPage, JellyfinError> {
        JellyfinClient::fetch_items(self, query).await
    }
}

pub struct LibrarySyncService {
    source: Arc<dyn LibrarySource>,
    items: Arc<dyn ItemRepository>,
    libraries: Arc<dyn LibraryRepository>,
    page_size: u32,
}

impl fmt::Debug for LibrarySyncService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibrarySyncService")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl LibrarySyncService {
    pub fn new(
        source: Arc<dyn LibrarySource>,
        items: Arc<dyn ItemRepository>,
        libraries: Arc<dyn LibraryRepository>,
    ) -> Self {
        Self {
            source,
            items,
            libraries,
            page_size: DEFAULT_SYNC_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Upsert every library and item Jellyfin reports. Items that fail to
    /// map or store are counted and skipped.
    pub async fn sync_all(&self) -> Result<SyncReport> {
        let started = Instant::now();
        let folders = self.source.fetch_libraries().await?;
        let mut report = SyncReport::default();
        let mut known: HashMap<String, ItemId> = HashMap::new();

        info!(target: "curator::sync", libraries = folders.len(), "starting jellyfin sync");

        for folder in folders {
            let mut library = Library::new(folder.item_id.clone(), folder.name.clone());
            library.collection_type = folder.collection_type.clone();
            let library = self.libraries.upsert(library).await?;
            report.libraries += 1;

            for item_type in SYNC_ORDER {
                self.sync_type(&library, item_type, &mut known, &mut report)
                    .await?;
            }
        }

        report.duration = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            target: "curator::sync",
            libraries = report.libraries,
            synced = report.items_synced,
            failed = report.items_failed,
            duration_ms = report.duration,
            "jellyfin sync finished"
        );
        Ok(report)
    }

    async fn sync_type(
        &self,
        library: &Library,
        item_type: ItemType,
        known: &mut HashMap<String, ItemId>,
        report: &mut SyncReport,
    ) -> Result<()> {
        let mut start_index = 0u32;
        loop {
            let query = ItemsQuery {
                parent_id: Some(library.jellyfin_id.clone()),
                item_types: vec![item_type],
                start_index,
                limit: self.page_size,
            };
            let page = self.source.fetch_items(&query).await?;
            let fetched = page.items.len() as u32;
            debug!(
                target: "curator::sync",
                library = %library.name,
                item_type = %item_type,
                start_index,
                fetched,
                total = page.total_record_count,
                "fetched item page"
            );

            for dto in page.items {
                let jellyfin_id = dto.id.clone();
                match self.store_item(library, dto, known).await {
                    Ok(id) => {
                        known.insert(jellyfin_id, id);
                        report.items_synced += 1;
                    }
                    Err(err) => {
                        report.items_failed += 1;
                        warn!(
                            target: "curator::sync",
                            %jellyfin_id,
                            error = %err,
                            "skipping item during sync"
                        );
                    }
                }
            }

            start_index += fetched;
            if fetched < self.page_size || start_index >= page.total_record_count {
                return Ok(());
            }
        }
    }

    async fn store_item(
        &self,
        library: &Library,
        dto: BaseItemDto,
        known: &HashMap<String, ItemId>,
    ) -> Result<ItemId> {
        let parent_id = match dto.parent_jellyfin_id() {
            Some(parent) if parent != library.jellyfin_id => match known.get(parent) {
                Some(id) => Some(*id),
                None => self
                    .items
                    .get_by_jellyfin_id(parent)
                    .await?
                    .map(|item| item.id),
            },
            _ => None,
        };
        let item = dto.into_item(library.id, parent_id)?;
        Ok(self.items.upsert(item).await?.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{InMemoryItemRepository, InMemoryLibraryRepository, ItemFilter};

    struct FakeSource {
        items: Vec<BaseItemDto>,
    }

    fn dto(id: &str, name: &str, kind: &str) -> BaseItemDto {
        BaseItemDto {
            id: id.into(),
            name: name.into(),
            item_type: kind.into(),
            parent_id: Some("lib".into()),
            ..Default::default()
        }
    }

    #[async_trait]
    impl LibrarySource for FakeSource {
        async fn fetch_libraries(
            &self,
        ) -> std::result::Result<Vec<VirtualFolder>, JellyfinError> {
            Ok(vec![VirtualFolder {
                name: "Shows".into(),
                item_id: "lib".into(),
                collection_type: Some("tvshows".into()),
            }])
        }

        async fn fetch_items(
            &self,
            query: &ItemsQuery,
        ) -> std::result::Result<ItemsPage, JellyfinError> {
            let wanted = query.item_types[0].jellyfin_kind();
            let matching: Vec<_> = self
                .items
                .iter()
                .filter(|item| item.item_type == wanted)
                .cloned()
                .collect();
            let total = matching.len() as u32;
            let items = matching
                .into_iter()
                .skip(query.start_index as usize)
                .take(query.limit as usize)
                .collect();
            Ok(ItemsPage {
                items,
                total_record_count: total,
                start_index: query.start_index,
            })
        }
    }

    #[tokio::test]
    async fn children_resolve_to_synced_parents() {
        let mut season = dto("season1", "Season 1", "Season");
        season.series_id = Some("series1".into());
        let episodes: Vec<BaseItemDto> = (1..=3)
            .map(|n| {
                let mut episode = dto(&format!("ep{n}"), &format!("Episode {n}"), "Episode");
                episode.series_id = Some("series1".into());
                episode.season_id = Some("season1".into());
                episode
            })
            .collect();

        let mut all = vec![dto("series1", "Breaking Bad", "Series"), season];
        all.extend(episodes);
        let items = Arc::new(InMemoryItemRepository::new());
        let libraries = Arc::new(InMemoryLibraryRepository::new());
        let service = LibrarySyncService::new(
            Arc::new(FakeSource { items: all }),
            items.clone(),
            libraries.clone(),
        )
        .with_page_size(2);

        let report = service.sync_all().await.unwrap();
        assert_eq!(report.libraries, 1);
        assert_eq!(report.items_synced, 5);
        assert_eq!(report.items_failed, 0);

        let season = items.get_by_jellyfin_id("season1").await.unwrap().unwrap();
        let series = items.get_by_jellyfin_id("series1").await.unwrap().unwrap();
        assert_eq!(season.parent_id, Some(series.id));
        assert_eq!(series.parent_id, None);

        let children = items
            .count(&ItemFilter::new().parent(season.id))
            .await
            .unwrap();
        assert_eq!(children, 3);

        let again = service.sync_all().await.unwrap();
        assert_eq!(again.items_synced, 5);
        assert_eq!(items.count(&ItemFilter::new()).await.unwrap(), 5);
    }
}
