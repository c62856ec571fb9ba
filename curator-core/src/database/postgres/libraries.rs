use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curator_model::{Library, LibraryId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::ports::LibraryRepository;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct PostgresLibraryRepository {
    pool: PgPool,
}

impl PostgresLibraryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct LibraryRow {
    id: Uuid,
    jellyfin_id: String,
    name: String,
    collection_type: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LibraryRow> for Library {
    fn from(row: LibraryRow) -> Self {
        Library {
            id: LibraryId(row.id),
            jellyfin_id: row.jellyfin_id,
            name: row.name,
            collection_type: row.collection_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl LibraryRepository for PostgresLibraryRepository {
    async fn list(&self) -> Result<Vec<Library>> {
        let rows = sqlx::query_as::<_, LibraryRow>(
            r#"
            SELECT id, jellyfin_id, name, collection_type, created_at, updated_at
            FROM libraries
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Library::from).collect())
    }

    async fn get(&self, id: LibraryId) -> Result<Option<Library>> {
        let row = sqlx::query_as::<_, LibraryRow>(
            r#"
            SELECT id, jellyfin_id, name, collection_type, created_at, updated_at
            FROM libraries
            WHERE id = $1
            "#,
        )
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Library::from))
    }

    async fn upsert(&self, library: Library) -> Result<Library> {
        let row = sqlx::query_as::<_, LibraryRow>(
            r#"
            INSERT INTO libraries (id, jellyfin_id, name, collection_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (jellyfin_id) DO UPDATE SET
                name = EXCLUDED.name,
                collection_type = EXCLUDED.collection_type,
                updated_at = NOW()
            RETURNING id, jellyfin_id, name, collection_type, created_at, updated_at
            "#,
        )
        .bind(library.id.to_uuid())
        .bind(&library.jellyfin_id)
        .bind(&library.name)
        .bind(&library.collection_type)
        .bind(library.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}
