//! Image index repository: CRUD and retention queries for the image_index table.

use camgate_core::models::{ImageIndexEntry, NewImageIndexEntry, StorageTier};
use camgate_core::AppError;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};

const ENTRY_COLUMNS: &str = "id, camera_id, original_local_path, watermarked_local_path, \
     original_object_key, watermarked_object_key, ingested_at";

/// Index store operations used by the archiver, the retention engine and the read API.
///
/// Nulling and deleting are monotonic, so callers never need a lock across calls.
#[async_trait::async_trait]
pub trait ImageIndexStore: Send + Sync {
    async fn insert(&self, entry: NewImageIndexEntry) -> Result<ImageIndexEntry, AppError>;

    /// Rows ingested before `cutoff` that still reference bytes in `tier`.
    async fn select_expired(
        &self,
        tier: StorageTier,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ImageIndexEntry>, AppError>;

    /// Null both `tier` columns of `ids`, still scoped to `ingested_at < cutoff`.
    async fn clear_tier(
        &self,
        tier: StorageTier,
        ids: &[i64],
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AppError>;

    /// Delete every row whose four path columns are null.
    async fn delete_dereferenced(&self) -> Result<u64, AppError>;

    /// Fully populated rows for `camera_id` ingested at or after `since`, oldest first.
    async fn list_window(
        &self,
        camera_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ImageIndexEntry>, AppError>;

    /// Newest fully populated row for `camera_id` ingested at or after `since`.
    async fn latest(
        &self,
        camera_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<ImageIndexEntry>, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

/// Row type for image_index table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct ImageIndexRow {
    pub id: i64,
    pub camera_id: String,
    pub original_local_path: Option<String>,
    pub watermarked_local_path: Option<String>,
    pub original_object_key: Option<String>,
    pub watermarked_object_key: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

impl From<ImageIndexRow> for ImageIndexEntry {
    fn from(row: ImageIndexRow) -> Self {
        ImageIndexEntry {
            id: row.id,
            camera_id: row.camera_id,
            original_local_path: row.original_local_path,
            watermarked_local_path: row.watermarked_local_path,
            original_object_key: row.original_object_key,
            watermarked_object_key: row.watermarked_object_key,
            ingested_at: row.ingested_at,
        }
    }
}

fn tier_columns(tier: StorageTier) -> (&'static str, &'static str) {
    match tier {
        StorageTier::Local => ("original_local_path", "watermarked_local_path"),
        StorageTier::Object => ("original_object_key", "watermarked_object_key"),
    }
}

const FULLY_POPULATED: &str = "original_local_path IS NOT NULL \
     AND watermarked_local_path IS NOT NULL \
     AND original_object_key IS NOT NULL \
     AND watermarked_object_key IS NOT NULL";

#[derive(Clone)]
pub struct ImageIndexRepository {
    pool: PgPool,
}

impl ImageIndexRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ImageIndexStore for ImageIndexRepository {
    #[tracing::instrument(
        skip(self, entry),
        fields(db.table = "image_index", camera_id = %entry.camera_id)
    )]
    async fn insert(&self, entry: NewImageIndexEntry) -> Result<ImageIndexEntry, AppError> {
        let query = format!(
            r#"
            INSERT INTO image_index (camera_id, original_local_path, watermarked_local_path,
                                     original_object_key, watermarked_object_key, ingested_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ENTRY_COLUMNS}
            "#
        );
        let row: ImageIndexRow = sqlx::query_as::<Postgres, ImageIndexRow>(&query)
            .bind(&entry.camera_id)
            .bind(&entry.original_local_path)
            .bind(&entry.watermarked_local_path)
            .bind(&entry.original_object_key)
            .bind(&entry.watermarked_object_key)
            .bind(entry.ingested_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.table = "image_index", tier = %tier))]
    async fn select_expired(
        &self,
        tier: StorageTier,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ImageIndexEntry>, AppError> {
        let (original, watermarked) = tier_columns(tier);
        let query = format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM image_index
            WHERE ingested_at < $1
              AND ({original} IS NOT NULL OR {watermarked} IS NOT NULL)
            ORDER BY ingested_at
            "#
        );
        let rows: Vec<ImageIndexRow> = sqlx::query_as::<Postgres, ImageIndexRow>(&query)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(
        skip(self, ids),
        fields(db.table = "image_index", tier = %tier, count = ids.len())
    )]
    async fn clear_tier(
        &self,
        tier: StorageTier,
        ids: &[i64],
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let (original, watermarked) = tier_columns(tier);
        let query = format!(
            r#"
            UPDATE image_index
            SET {original} = NULL, {watermarked} = NULL
            WHERE id = ANY($1) AND ingested_at < $2
            "#
        );
        let result = sqlx::query(&query)
            .bind(ids)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self), fields(db.table = "image_index"))]
    async fn delete_dereferenced(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM image_index
            WHERE original_local_path IS NULL
              AND watermarked_local_path IS NULL
              AND original_object_key IS NULL
              AND watermarked_object_key IS NULL
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self), fields(db.table = "image_index"))]
    async fn list_window(
        &self,
        camera_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ImageIndexEntry>, AppError> {
        let query = format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM image_index
            WHERE camera_id = $1 AND ingested_at >= $2 AND {FULLY_POPULATED}
            ORDER BY ingested_at ASC
            "#
        );
        let rows: Vec<ImageIndexRow> = sqlx::query_as::<Postgres, ImageIndexRow>(&query)
            .bind(camera_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "image_index"))]
    async fn latest(
        &self,
        camera_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<ImageIndexEntry>, AppError> {
        let query = format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM image_index
            WHERE camera_id = $1 AND ingested_at >= $2 AND {FULLY_POPULATED}
            ORDER BY ingested_at DESC
            LIMIT 1
            "#
        );
        let row: Option<ImageIndexRow> = sqlx::query_as::<Postgres, ImageIndexRow>(&query)
            .bind(camera_id)
            .bind(since)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
