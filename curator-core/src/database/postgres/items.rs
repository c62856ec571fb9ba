use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use curator_model::{
    Item, ItemId, ItemMetadata, ItemType, LibraryId, MetadataField, Person, Reason,
};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::ports::{
    ItemFilter, ItemOrder, ItemRepository, ItemUpdate, MisclassificationUpdate, Page,
};
use crate::error::{CuratorError, Result};

const ITEM_COLUMNS: &str = r#"
    id, jellyfin_id, library_id, parent_id, name, original_title, overview, path,
    item_type, index_number, parent_index_number, runtime_ticks, production_year,
    premiere_date, end_date, official_rating, community_rating, genres, tags, studios,
    people, provider_ids, locked_fields, lock_data, suspected_misclassification,
    misclassification_score, misclassification_reasons, misclassification_checked_at,
    created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct PostgresItemRepository {
    pool: PgPool,
}

impl PostgresItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Appends ` AND ...` clauses; the builder must already hold a `WHERE`.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ItemFilter) {
    if let Some(ids) = &filter.ids {
        let ids: Vec<Uuid> = ids.iter().map(ItemId::to_uuid).collect();
        builder.push(" AND id = ANY(");
        builder.push_bind(ids);
        builder.push(")");
    }

    if let Some(library_id) = filter.library_id {
        builder.push(" AND library_id = ");
        builder.push_bind(library_id.to_uuid());
    }

    if !filter.item_types.is_empty() {
        let types: Vec<String> = filter
            .item_types
            .iter()
            .map(|item_type| item_type.as_str().to_string())
            .collect();
        builder.push(" AND item_type = ANY(");
        builder.push_bind(types);
        builder.push(")");
    }

    if let Some(parent_id) = filter.parent_id {
        builder.push(" AND parent_id = ");
        builder.push_bind(parent_id.to_uuid());
    }

    if let Some(query) = &filter.search {
        let pattern = format!("%{}%", escape_like(query));
        builder.push(" AND (name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR overview ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR path ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(flagged) = filter.flagged {
        builder.push(" AND suspected_misclassification = ");
        builder.push_bind(flagged);
    }

    if let Some(severity) = filter.max_severity {
        builder.push(" AND misclassification_max_severity = ");
        builder.push_bind(severity.as_str());
    }

    if let Some(after) = filter.updated_after {
        builder.push(" AND updated_at > ");
        builder.push_bind(after);
    }
}

fn push_order(builder: &mut QueryBuilder<'_, Postgres>, order: ItemOrder) {
    builder.push(match order {
        ItemOrder::CreatedAsc => " ORDER BY created_at ASC, id ASC",
        ItemOrder::NameAsc => " ORDER BY LOWER(name) ASC, created_at ASC, id ASC",
        ItemOrder::ScoreDesc => {
            " ORDER BY misclassification_score DESC NULLS LAST, created_at ASC, id ASC"
        }
    });
}

/// Appends `UPDATE items SET ...` for the field group the update owns.
fn push_update(builder: &mut QueryBuilder<'_, Postgres>, update: &ItemUpdate) -> Result<()> {
    builder.push("UPDATE items SET updated_at = NOW()");
    match update {
        ItemUpdate::Metadata { metadata, fields } => {
            for field in fields {
                push_metadata_column(builder, metadata, *field);
            }
        }
        ItemUpdate::Misclassification(MisclassificationUpdate::Flag {
            score,
            reasons,
            checked_at,
        }) => {
            let max_severity = reasons.iter().map(|reason| reason.severity).max();
            builder.push(", suspected_misclassification = TRUE, misclassification_score = ");
            builder.push_bind(score.clamp(0.0, 1.0));
            builder.push(", misclassification_reasons = ");
            builder.push_bind(serde_json::to_value(reasons)?);
            builder.push(", misclassification_max_severity = ");
            builder.push_bind(max_severity.map(|severity| severity.as_str()));
            builder.push(", misclassification_checked_at = ");
            builder.push_bind(*checked_at);
        }
        ItemUpdate::Misclassification(MisclassificationUpdate::Clear { checked_at }) => {
            builder.push(
                ", suspected_misclassification = FALSE, misclassification_score = NULL, \
                 misclassification_reasons = '[]'::jsonb, misclassification_max_severity = NULL, \
                 misclassification_checked_at = ",
            );
            builder.push_bind(*checked_at);
        }
    }
    Ok(())
}

fn push_metadata_column(
    builder: &mut QueryBuilder<'_, Postgres>,
    metadata: &ItemMetadata,
    field: MetadataField,
) {
    match field {
        MetadataField::Name => {
            builder.push(", name = COALESCE(");
            builder.push_bind(metadata.name.clone());
            builder.push(", name)");
        }
        MetadataField::OriginalTitle => {
            builder.push(", original_title = ");
            builder.push_bind(metadata.original_title.clone());
        }
        MetadataField::Overview => {
            builder.push(", overview = ");
            builder.push_bind(metadata.overview.clone());
        }
        MetadataField::OfficialRating => {
            builder.push(", official_rating = ");
            builder.push_bind(metadata.official_rating.clone());
        }
        MetadataField::ProductionYear => {
            builder.push(", production_year = ");
            builder.push_bind(metadata.production_year);
        }
        MetadataField::PremiereDate => {
            builder.push(", premiere_date = ");
            builder.push_bind(metadata.premiere_date);
        }
        MetadataField::EndDate => {
            builder.push(", end_date = ");
            builder.push_bind(metadata.end_date);
        }
        MetadataField::CommunityRating => {
            builder.push(", community_rating = ");
            builder.push_bind(metadata.community_rating);
        }
        MetadataField::Genres => {
            builder.push(", genres = ");
            builder.push_bind(metadata.genres.clone().unwrap_or_default());
        }
        MetadataField::Tags => {
            builder.push(", tags = ");
            builder.push_bind(metadata.tags.clone().unwrap_or_default());
        }
        MetadataField::Studios => {
            builder.push(", studios = ");
            builder.push_bind(metadata.studios.clone().unwrap_or_default());
        }
        MetadataField::People => {
            builder.push(", people = ");
            builder.push_bind(Json(metadata.people.clone().unwrap_or_default()));
        }
        MetadataField::ProviderIds => {
            builder.push(", provider_ids = ");
            builder.push_bind(Json(metadata.provider_ids.clone().unwrap_or_default()));
        }
    }
}

#[async_trait]
impl ItemRepository for PostgresItemRepository {
    async fn get(&self, id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"
        ))
        .bind(id.to_uuid())
        .fetch_optional(self.pool())
        .await?;
        row.map(Item::try_from).transpose()
    }

    async fn get_many(&self, ids: &[ItemId]) -> Result<Vec<Item>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(ItemId::to_uuid).collect();
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = ANY($1)"
        ))
        .bind(uuids)
        .fetch_all(self.pool())
        .await?;

        let mut by_id = rows
            .into_iter()
            .map(|row| Item::try_from(row).map(|item| (item.id, item)))
            .collect::<Result<std::collections::HashMap<_, _>>>()?;
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn get_by_jellyfin_id(&self, jellyfin_id: &str) -> Result<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE jellyfin_id = $1"
        ))
        .bind(jellyfin_id)
        .fetch_optional(self.pool())
        .await?;
        row.map(Item::try_from).transpose()
    }

    async fn find(&self, filter: &ItemFilter, page: Page, order: ItemOrder) -> Result<Vec<Item>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE 1=1"
        ));
        push_filter(&mut builder, filter);
        push_order(&mut builder, order);
        if let Some(limit) = page.limit {
            builder.push(" LIMIT ");
            builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        builder.push(" OFFSET ");
        builder.push_bind(i64::try_from(page.offset).unwrap_or(i64::MAX));

        let rows = builder
            .build_query_as::<ItemRow>()
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(Item::try_from).collect()
    }

    async fn count(&self, filter: &ItemFilter) -> Result<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items WHERE 1=1");
        push_filter(&mut builder, filter);
        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(self.pool())
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn update(&self, id: ItemId, update: ItemUpdate) -> Result<Item> {
        let mut builder = QueryBuilder::<Postgres>::new("");
        push_update(&mut builder, &update)?;
        builder.push(" WHERE id = ");
        builder.push_bind(id.to_uuid());
        builder.push(format!(" RETURNING {ITEM_COLUMNS}"));

        let row = builder
            .build_query_as::<ItemRow>()
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| CuratorError::not_found(format!("item {id}")))?;
        Item::try_from(row)
    }

    async fn update_many(&self, filter: &ItemFilter, update: ItemUpdate) -> Result<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("");
        push_update(&mut builder, &update)?;
        builder.push(" WHERE 1=1");
        push_filter(&mut builder, filter);

        let result = builder.build().execute(self.pool()).await?;
        Ok(result.rows_affected())
    }

    async fn upsert(&self, item: Item) -> Result<Item> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            INSERT INTO items (
                id, jellyfin_id, library_id, parent_id, name, original_title, overview, path,
                item_type, index_number, parent_index_number, runtime_ticks, production_year,
                premiere_date, end_date, official_rating, community_rating, genres, tags,
                studios, people, provider_ids, locked_fields, lock_data, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23, $24, $25, NOW())
            ON CONFLICT (jellyfin_id) DO UPDATE SET
                library_id = EXCLUDED.library_id,
                parent_id = EXCLUDED.parent_id,
                name = EXCLUDED.name,
                original_title = EXCLUDED.original_title,
                overview = EXCLUDED.overview,
                path = EXCLUDED.path,
                item_type = EXCLUDED.item_type,
                index_number = EXCLUDED.index_number,
                parent_index_number = EXCLUDED.parent_index_number,
                runtime_ticks = EXCLUDED.runtime_ticks,
                production_year = EXCLUDED.production_year,
                premiere_date = EXCLUDED.premiere_date,
                end_date = EXCLUDED.end_date,
                official_rating = EXCLUDED.official_rating,
                community_rating = EXCLUDED.community_rating,
                genres = EXCLUDED.genres,
                tags = EXCLUDED.tags,
                studios = EXCLUDED.studios,
                people = EXCLUDED.people,
                provider_ids = EXCLUDED.provider_ids,
                locked_fields = EXCLUDED.locked_fields,
                lock_data = EXCLUDED.lock_data,
                updated_at = NOW()
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item.id.to_uuid())
        .bind(&item.jellyfin_id)
        .bind(item.library_id.to_uuid())
        .bind(item.parent_id.map(|id| id.to_uuid()))
        .bind(&item.name)
        .bind(&item.original_title)
        .bind(&item.overview)
        .bind(&item.path)
        .bind(item.item_type.as_str())
        .bind(item.index_number)
        .bind(item.parent_index_number)
        .bind(item.runtime_ticks)
        .bind(item.production_year)
        .bind(item.premiere_date)
        .bind(item.end_date)
        .bind(&item.official_rating)
        .bind(item.community_rating)
        .bind(&item.genres)
        .bind(&item.tags)
        .bind(&item.studios)
        .bind(Json(&item.people))
        .bind(Json(&item.provider_ids))
        .bind(&item.locked_fields)
        .bind(item.lock_data)
        .bind(item.created_at)
        .fetch_one(self.pool())
        .await?;
        Item::try_from(row)
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    jellyfin_id: String,
    library_id: Uuid,
    parent_id: Option<Uuid>,
    name: String,
    original_title: Option<String>,
    overview: Option<String>,
    path: Option<String>,
    item_type: String,
    index_number: Option<i32>,
    parent_index_number: Option<i32>,
    runtime_ticks: Option<i64>,
    production_year: Option<i32>,
    premiere_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    official_rating: Option<String>,
    community_rating: Option<f64>,
    genres: Vec<String>,
    tags: Vec<String>,
    studios: Vec<String>,
    people: Json<Vec<Person>>,
    provider_ids: Json<BTreeMap<String, String>>,
    locked_fields: Vec<String>,
    lock_data: bool,
    suspected_misclassification: bool,
    misclassification_score: Option<f64>,
    misclassification_reasons: Json<Vec<Reason>>,
    misclassification_checked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = CuratorError;

    fn try_from(row: ItemRow) -> Result<Self> {
        let item_type: ItemType = row.item_type.parse().map_err(|e| {
            CuratorError::Internal(format!("Invalid item_type for item {}: {e}", row.id))
        })?;

        Ok(Item {
            id: ItemId(row.id),
            jellyfin_id: row.jellyfin_id,
            library_id: LibraryId(row.library_id),
            parent_id: row.parent_id.map(ItemId),
            name: row.name,
            original_title: row.original_title,
            overview: row.overview,
            path: row.path,
            item_type,
            index_number: row.index_number,
            parent_index_number: row.parent_index_number,
            runtime_ticks: row.runtime_ticks,
            production_year: row.production_year,
            premiere_date: row.premiere_date,
            end_date: row.end_date,
            official_rating: row.official_rating,
            community_rating: row.community_rating,
            genres: row.genres,
            tags: row.tags,
            studios: row.studios,
            people: row.people.0,
            provider_ids: row.provider_ids.0,
            locked_fields: row.locked_fields,
            lock_data: row.lock_data,
            suspected_misclassification: row.suspected_misclassification,
            misclassification_score: row.misclassification_score,
            misclassification_reasons: row.misclassification_reasons.0,
            misclassification_checked_at: row.misclassification_checked_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
