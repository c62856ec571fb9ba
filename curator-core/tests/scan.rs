//! Library scan orchestration against the in-memory stores.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use curator_core::database::{
    InMemoryItemRepository, InMemoryLibraryRepository, ItemFilter, ItemOrder, ItemRepository,
    ItemUpdate, LibraryRepository, Page,
};
use curator_core::error::{CuratorError, Result as CuratorResult};
use curator_core::scan::{LibraryScanner, ScanRequest};
use curator_model::{Item, ItemId, ItemMetadata, ItemType, Library, MetadataField, Severity};
use tokio_util::sync::CancellationToken;

async fn seed_library(
    items: &InMemoryItemRepository,
    libraries: &InMemoryLibraryRepository,
    name: &str,
    movies: usize,
) -> Result<Library> {
    let library = libraries.upsert(Library::new(format!("jf-{name}"), name)).await?;
    let seeded = (0..movies).map(|n| {
        Item::new(library.id, format!("{name}-{n}"), format!("Feature {n}"), ItemType::Movie)
            .with_path(format!("/media/{name}/Feature {n} (2001)/feature.mkv"))
            .with_runtime_minutes(110)
    });
    items.insert_all(seeded).await;
    Ok(library)
}

/// Delegates to the in-memory store, failing `update` for one item and
/// optionally cancelling a token on the first write.
struct FlakyItems {
    inner: InMemoryItemRepository,
    poisoned: Option<ItemId>,
    cancel_on_write: Option<CancellationToken>,
}

#[async_trait]
impl ItemRepository for FlakyItems {
    async fn get(&self, id: ItemId) -> CuratorResult<Option<Item>> {
        self.inner.get(id).await
    }

    async fn get_many(&self, ids: &[ItemId]) -> CuratorResult<Vec<Item>> {
        self.inner.get_many(ids).await
    }

    async fn get_by_jellyfin_id(&self, jellyfin_id: &str) -> CuratorResult<Option<Item>> {
        self.inner.get_by_jellyfin_id(jellyfin_id).await
    }

    async fn find(
        &self,
        filter: &ItemFilter,
        page: Page,
        order: ItemOrder,
    ) -> CuratorResult<Vec<Item>> {
        self.inner.find(filter, page, order).await
    }

    async fn count(&self, filter: &ItemFilter) -> CuratorResult<u64> {
        self.inner.count(filter).await
    }

    async fn update(&self, id: ItemId, update: ItemUpdate) -> CuratorResult<Item> {
        if let Some(token) = &self.cancel_on_write {
            token.cancel();
        }
        if self.poisoned == Some(id) {
            return Err(CuratorError::Internal("disk full".into()));
        }
        self.inner.update(id, update).await
    }

    async fn update_many(&self, filter: &ItemFilter, update: ItemUpdate) -> CuratorResult<u64> {
        self.inner.update_many(filter, update).await
    }

    async fn upsert(&self, item: Item) -> CuratorResult<Item> {
        self.inner.upsert(item).await
    }
}

#[tokio::test]
async fn batching_visits_every_item_exactly_once() -> Result<()> {
    let items = Arc::new(InMemoryItemRepository::new());
    let libraries = Arc::new(InMemoryLibraryRepository::new());
    let library = seed_library(&items, &libraries, "films", 137).await?;

    let scanner = LibraryScanner::new(items.clone(), libraries.clone()).with_batch_size(50);
    let result = scanner
        .scan(
            &ScanRequest {
                library_id: Some(library.id),
                item_types: vec![],
            },
            &CancellationToken::new(),
        )
        .await?;

    assert_eq!(result.total_items, 137);
    assert_eq!(result.items_scanned, 137);
    assert_eq!(result.failed_items, 0);
    assert_eq!(result.misclassified_items, 0);
    assert!(!result.cancelled);

    let checked = items
        .find(&ItemFilter::new(), Page::ALL, ItemOrder::CreatedAsc)
        .await?;
    assert!(checked.iter().all(|item| item.misclassification_checked_at.is_some()));
    Ok(())
}

#[tokio::test]
async fn flags_are_persisted_and_bucketed_by_severity() -> Result<()> {
    let items = Arc::new(InMemoryItemRepository::new());
    let libraries = Arc::new(InMemoryLibraryRepository::new());
    let library = seed_library(&items, &libraries, "films", 3).await?;

    let misfiled = Item::new(library.id, "misfiled", "Show.S02E03.mkv", ItemType::Movie);
    let empty_season = Item::new(library.id, "season", "Season 9", ItemType::Season);
    let short = Item::new(library.id, "short", "Short", ItemType::Movie).with_runtime_minutes(20);
    let (misfiled_id, season_id, short_id) = (misfiled.id, empty_season.id, short.id);
    items.insert_all([misfiled, empty_season, short]).await;

    let scanner = LibraryScanner::new(items.clone(), libraries.clone());
    let result = scanner
        .scan(&ScanRequest::default(), &CancellationToken::new())
        .await?;

    assert_eq!(result.items_scanned, 6);
    assert_eq!(result.misclassified_items, 2);
    assert_eq!(result.high_confidence_issues, 1);
    assert_eq!(result.medium_confidence_issues, 1);
    assert_eq!(result.low_confidence_issues, 0);

    let misfiled = items.get(misfiled_id).await?.expect("misfiled item");
    assert!(misfiled.suspected_misclassification);
    assert!(misfiled.misclassification_score.is_some_and(|s| s > 0.6));

    let season = items.get(season_id).await?.expect("season");
    assert!(season.suspected_misclassification);

    let short = items.get(short_id).await?.expect("short movie");
    assert!(!short.suspected_misclassification);
    assert!(short.misclassification_score.is_none());

    let flagged = items
        .find(
            &ItemFilter::new().flagged(true).max_severity(Some(Severity::High)),
            Page::ALL,
            ItemOrder::ScoreDesc,
        )
        .await?;
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].id, misfiled_id);
    Ok(())
}

#[tokio::test]
async fn rescan_clears_items_that_no_longer_qualify() -> Result<()> {
    let items = Arc::new(InMemoryItemRepository::new());
    let libraries = Arc::new(InMemoryLibraryRepository::new());
    let library = seed_library(&items, &libraries, "films", 0).await?;
    let misfiled = Item::new(library.id, "misfiled", "Show.S02E03.mkv", ItemType::Movie)
        .with_runtime_minutes(110);
    let misfiled_id = misfiled.id;
    items.insert_all([misfiled]).await;

    let scanner = LibraryScanner::new(items.clone(), libraries.clone());
    let first = scanner
        .scan(&ScanRequest::default(), &CancellationToken::new())
        .await?;
    assert_eq!(first.misclassified_items, 1);
    assert!(items.get(misfiled_id).await?.expect("item").suspected_misclassification);

    let renamed = ItemMetadata {
        name: Some("Heat".into()),
        ..Default::default()
    };
    items
        .update(
            misfiled_id,
            ItemUpdate::metadata_fields(renamed, [MetadataField::Name]),
        )
        .await?;

    let second = scanner
        .scan(&ScanRequest::default(), &CancellationToken::new())
        .await?;
    assert_eq!(second.items_scanned, 1);
    assert_eq!(second.misclassified_items, 0);

    let fixed = items.get(misfiled_id).await?.expect("item");
    assert!(!fixed.suspected_misclassification);
    assert!(fixed.misclassification_score.is_none());
    assert!(fixed.misclassification_reasons.is_empty());
    assert!(fixed.misclassification_checked_at.is_some());
    Ok(())
}

#[tokio::test]
async fn item_failures_are_counted_not_fatal() -> Result<()> {
    let inner = InMemoryItemRepository::new();
    let libraries = Arc::new(InMemoryLibraryRepository::new());
    let library = seed_library(&inner, &libraries, "films", 10).await?;
    let poisoned = inner
        .find(&ItemFilter::new(), Page::new(4, 1), ItemOrder::CreatedAsc)
        .await?[0]
        .id;

    let items = Arc::new(FlakyItems {
        inner,
        poisoned: Some(poisoned),
        cancel_on_write: None,
    });
    let scanner = LibraryScanner::new(items, libraries.clone()).with_batch_size(3);
    let result = scanner
        .scan(
            &ScanRequest {
                library_id: Some(library.id),
                item_types: vec![ItemType::Movie],
            },
            &CancellationToken::new(),
        )
        .await?;

    assert_eq!(result.total_items, 10);
    assert_eq!(result.items_scanned, 9);
    assert_eq!(result.failed_items, 1);
    Ok(())
}

#[tokio::test]
async fn cancellation_stops_between_batches() -> Result<()> {
    let inner = InMemoryItemRepository::new();
    let libraries = Arc::new(InMemoryLibraryRepository::new());
    seed_library(&inner, &libraries, "films", 120).await?;

    let cancel = CancellationToken::new();
    let items = Arc::new(FlakyItems {
        inner,
        poisoned: None,
        cancel_on_write: Some(cancel.clone()),
    });
    let scanner = LibraryScanner::new(items, libraries.clone()).with_batch_size(50);
    let result = scanner.scan(&ScanRequest::default(), &cancel).await?;

    assert!(result.cancelled);
    assert_eq!(result.total_items, 120);
    assert_eq!(result.items_scanned, 50);
    Ok(())
}

#[tokio::test]
async fn cancelled_before_start_scans_nothing() -> Result<()> {
    let items = Arc::new(InMemoryItemRepository::new());
    let libraries = Arc::new(InMemoryLibraryRepository::new());
    seed_library(&items, &libraries, "films", 5).await?;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = LibraryScanner::new(items, libraries)
        .scan(&ScanRequest::default(), &cancel)
        .await?;
    assert!(result.cancelled);
    assert_eq!(result.items_scanned, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_library_is_not_found() {
    let scanner = LibraryScanner::new(
        Arc::new(InMemoryItemRepository::new()),
        Arc::new(InMemoryLibraryRepository::new()),
    );
    let err = scanner
        .scan(
            &ScanRequest {
                library_id: Some(curator_model::LibraryId::new()),
                item_types: vec![],
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CuratorError::NotFound(_)));
}

#[tokio::test]
async fn ad_hoc_analysis_and_dismissal() -> Result<()> {
    let items = Arc::new(InMemoryItemRepository::new());
    let libraries = Arc::new(InMemoryLibraryRepository::new());
    let library = libraries.upsert(Library::new("jf-lib", "Mixed")).await?;
    let misfiled = Item::new(library.id, "m1", "Show.S01E01.mkv", ItemType::Movie);
    let other = Item::new(library.id, "m2", "Show.S01E02.mkv", ItemType::Movie);
    let (misfiled_id, other_id) = (misfiled.id, other.id);
    items.insert_all([misfiled, other]).await;

    let scanner = LibraryScanner::new(items.clone(), libraries);

    let dry = scanner.analyze_item(misfiled_id, false).await?;
    assert!(dry.needs_review);
    assert!(!items.get(misfiled_id).await?.expect("item").suspected_misclassification);

    scanner.analyze_item(misfiled_id, true).await?;
    scanner.analyze_item(other_id, true).await?;
    assert_eq!(items.count(&ItemFilter::new().flagged(true)).await?, 2);

    let cleared = scanner
        .dismiss(&ItemFilter::new().ids(vec![misfiled_id]))
        .await?;
    assert_eq!(cleared, 1);
    let dismissed = items.get(misfiled_id).await?.expect("item");
    assert!(!dismissed.suspected_misclassification);
    assert!(dismissed.misclassification_reasons.is_empty());

    let cleared = scanner
        .dismiss(&ItemFilter::new().library(Some(library.id)))
        .await?;
    assert_eq!(cleared, 1);
    assert_eq!(items.count(&ItemFilter::new().flagged(true)).await?, 0);
    Ok(())
}
