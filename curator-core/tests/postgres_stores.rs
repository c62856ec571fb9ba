//! PostgreSQL adapter behaviour. Needs `DATABASE_URL` and `--features pg-tests`.
#![cfg(feature = "pg-tests")]

use anyhow::Result;
use chrono::Utc;
use curator_core::database::postgres::{
    PostgresItemRepository, PostgresJobRepository, PostgresLibraryRepository,
};
use curator_core::database::{
    ItemFilter, ItemOrder, ItemRepository, ItemUpdate, JobFilter, JobRepository, JobUpdate,
    LibraryRepository, LogOrder, MisclassificationUpdate, Page,
};
use curator_model::{
    Item, ItemId, ItemMetadata, ItemType, Job, JobStatus, JobType, Library, MetadataField,
    OperationLog, Person, Reason, ReasonType, Severity,
};
use serde_json::json;
use sqlx::PgPool;

async fn seed_library(pool: &PgPool) -> Result<Library> {
    let libraries = PostgresLibraryRepository::new(pool.clone());
    Ok(libraries.upsert(Library::new("jf-shows", "Shows")).await?)
}

#[sqlx::test(migrator = "curator_core::MIGRATOR")]
async fn item_roundtrip_and_filters(pool: PgPool) -> Result<()> {
    let library = seed_library(&pool).await?;
    let repo = PostgresItemRepository::new(pool.clone());

    let series = repo
        .upsert(Item::new(library.id, "jf-series", "Breaking Bad", ItemType::Series))
        .await?;
    let mut episode = Item::new(library.id, "jf-ep", "Pilot", ItemType::Episode)
        .with_parent(series.id)
        .with_path("/tv/Breaking Bad/Season 01/S01E01.mkv")
        .with_runtime_minutes(58);
    episode.genres = vec!["Drama".into(), "Crime".into()];
    episode.people = vec![Person::new("Bryan Cranston")];
    episode.provider_ids.insert("Tvdb".into(), "349232".into());
    episode.locked_fields = vec!["Overview".into()];
    let episode = repo.upsert(episode).await?;

    let stored = repo.get(episode.id).await?.expect("episode stored");
    assert_eq!(stored.genres, vec!["Drama".to_string(), "Crime".to_string()]);
    assert_eq!(stored.people[0].name, "Bryan Cranston");
    assert_eq!(stored.provider_ids["Tvdb"], "349232");
    assert_eq!(stored.runtime_minutes(), Some(58.0));
    assert_eq!(stored.parent_id, Some(series.id));

    let by_search = repo
        .find(
            &ItemFilter::new().search("season 01"),
            Page::ALL,
            ItemOrder::NameAsc,
        )
        .await?;
    assert_eq!(by_search.len(), 1);

    let literal_percent = repo
        .count(&ItemFilter::new().search("100%"))
        .await?;
    assert_eq!(literal_percent, 0);

    let typed = repo
        .count(&ItemFilter::new().library(Some(library.id)).types(&[ItemType::Episode]))
        .await?;
    assert_eq!(typed, 1);

    let ordered = repo
        .get_many(&[episode.id, ItemId::new(), series.id])
        .await?;
    let ids: Vec<_> = ordered.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![episode.id, series.id]);
    Ok(())
}

#[sqlx::test(migrator = "curator_core::MIGRATOR")]
async fn updates_touch_only_their_field_group(pool: PgPool) -> Result<()> {
    let library = seed_library(&pool).await?;
    let repo = PostgresItemRepository::new(pool.clone());
    let item = repo
        .upsert(Item::new(library.id, "jf-m", "Show.S01E05.mkv", ItemType::Movie))
        .await?;

    let reasons = vec![Reason::new(
        ReasonType::NamingPattern,
        "Name contains an episode marker but item is a Movie",
        Severity::High,
        0.9,
    )];
    let flagged = repo
        .update(
            item.id,
            ItemUpdate::Misclassification(MisclassificationUpdate::Flag {
                score: 0.9,
                reasons: reasons.clone(),
                checked_at: Utc::now(),
            }),
        )
        .await?;
    assert!(flagged.suspected_misclassification);
    assert_eq!(flagged.misclassification_reasons, reasons);

    let mut metadata = ItemMetadata::from_item(&flagged);
    metadata.genres = Some(vec!["Drama".into()]);
    let edited = repo.update(item.id, ItemUpdate::metadata(metadata)).await?;
    assert_eq!(edited.genres, vec!["Drama".to_string()]);
    assert!(edited.suspected_misclassification);
    assert_eq!(edited.misclassification_score, Some(0.9));

    let high = repo
        .count(
            &ItemFilter::new()
                .flagged(true)
                .max_severity(Some(Severity::High)),
        )
        .await?;
    assert_eq!(high, 1);

    let refreshed = repo
        .upsert(Item::new(library.id, "jf-m", "Renamed", ItemType::Movie))
        .await?;
    assert_eq!(refreshed.id, item.id);
    assert!(refreshed.suspected_misclassification);

    let cleared = repo
        .update_many(
            &ItemFilter::new().flagged(true),
            ItemUpdate::Misclassification(MisclassificationUpdate::Clear {
                checked_at: Utc::now(),
            }),
        )
        .await?;
    assert_eq!(cleared, 1);
    let after = repo.get(item.id).await?.expect("item");
    assert!(after.misclassification_score.is_none());
    assert!(after.misclassification_reasons.is_empty());
    Ok(())
}

#[sqlx::test(migrator = "curator_core::MIGRATOR")]
async fn jobs_and_logs(pool: PgPool) -> Result<()> {
    let repo = PostgresJobRepository::new(pool.clone());
    let job = repo
        .create_job(Job::pending(
            JobType::BulkMetadataUpdate,
            2,
            json!({"itemIds": []}),
        ))
        .await?;

    let running = repo
        .update_job(
            job.id,
            JobUpdate {
                status: Some(JobStatus::Running),
                start_time: Some(Utc::now()),
                ..JobUpdate::default()
            },
        )
        .await?;
    assert_eq!(running.status, JobStatus::Running);

    let first = ItemId::new();
    let second = ItemId::new();
    repo.append_log(OperationLog::succeeded(
        job.id,
        first,
        "updateMetadata",
        json!({"name": "a"}),
        json!({"name": "b"}),
    ))
    .await?;
    repo.append_log(OperationLog::failed(
        job.id,
        second,
        "updateMetadata",
        None,
        "item not found",
    ))
    .await?;

    let oldest = repo.list_logs(job.id, 10, LogOrder::Oldest).await?;
    assert_eq!(
        oldest.iter().map(|entry| entry.item_id).collect::<Vec<_>>(),
        vec![first, second]
    );
    let newest = repo.list_logs(job.id, 1, LogOrder::Newest).await?;
    assert_eq!(newest[0].item_id, second);
    assert!(!newest[0].success);

    let listed = repo
        .list_jobs(&JobFilter {
            status: Some(JobStatus::Running),
            limit: 10,
            ..JobFilter::default()
        })
        .await?;
    assert_eq!(listed.len(), 1);
    Ok(())
}

#[sqlx::test(migrator = "curator_core::MIGRATOR")]
async fn metadata_updates_only_touch_masked_columns(pool: PgPool) -> Result<()> {
    let library = seed_library(&pool).await?;
    let repo = PostgresItemRepository::new(pool.clone());
    let mut item = Item::new(library.id, "jf-heat", "Heat", ItemType::Movie);
    item.genres = vec!["Crime".into()];
    let item = repo.upsert(item).await?;

    let stale = ItemMetadata::from_item(&item);
    let mut genres = stale.clone();
    genres.genres = Some(vec!["Crime".into(), "Thriller".into()]);
    let mut tags = stale;
    tags.tags = Some(vec!["4k".into()]);

    repo.update(item.id, ItemUpdate::metadata_fields(genres, [MetadataField::Genres]))
        .await?;
    let stored = repo
        .update(item.id, ItemUpdate::metadata_fields(tags, [MetadataField::Tags]))
        .await?;

    assert_eq!(stored.genres, vec!["Crime".to_string(), "Thriller".to_string()]);
    assert_eq!(stored.tags, vec!["4k".to_string()]);
    assert_eq!(stored.name, "Heat");
    Ok(())
}
