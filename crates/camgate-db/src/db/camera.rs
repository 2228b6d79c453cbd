//! Camera directory repository: reads the `cameras` table for the credential cache.

use camgate_core::models::{CameraRecord, NetworkPattern};
use camgate_core::DirectoryError;
use sqlx::{PgPool, Postgres};

/// Source of camera records for the credential cache.
#[async_trait::async_trait]
pub trait CameraDirectory: Send + Sync {
    /// Fetch every camera. An empty directory is reported as [`DirectoryError::EmptyResult`].
    async fn fetch_cameras(&self) -> Result<Vec<CameraRecord>, DirectoryError>;
}

/// Row type for the cameras table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct CameraRow {
    pub id: String,
    pub region: String,
    pub expected_network: Option<String>,
    pub ftp_target_folder: Option<String>,
    pub ftp_target_filename: Option<String>,
}

impl CameraRow {
    /// Convert into a record. A row whose expected network does not parse is dropped so the
    /// camera fails closed instead of silently skipping the address check.
    pub fn into_camera_record(self) -> Option<CameraRecord> {
        let expected_network = match self.expected_network.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<NetworkPattern>() {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(
                        camera_id = %self.id,
                        error = %e,
                        "Dropping camera with invalid expected network"
                    );
                    return None;
                }
            },
        };

        Some(CameraRecord {
            id: self.id,
            region: self.region,
            expected_network,
            ftp_target_folder: self.ftp_target_folder,
            ftp_target_filename: self.ftp_target_filename,
        })
    }
}

#[derive(Clone)]
pub struct CameraDirectoryRepository {
    pool: PgPool,
}

impl CameraDirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a camera. Used by operator tooling and tests.
    #[tracing::instrument(skip(self, camera), fields(db.table = "cameras", camera_id = %camera.id))]
    pub async fn upsert(&self, camera: &CameraRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO cameras
                (id, region, expected_network, ftp_target_folder, ftp_target_filename)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                region = EXCLUDED.region,
                expected_network = EXCLUDED.expected_network,
                ftp_target_folder = EXCLUDED.ftp_target_folder,
                ftp_target_filename = EXCLUDED.ftp_target_filename,
                updated_at = NOW()
            "#,
        )
        .bind(&camera.id)
        .bind(&camera.region)
        .bind(camera.expected_network.as_ref().map(|n| n.to_string()))
        .bind(&camera.ftp_target_folder)
        .bind(&camera.ftp_target_filename)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CameraDirectory for CameraDirectoryRepository {
    #[tracing::instrument(skip(self), fields(db.table = "cameras"))]
    async fn fetch_cameras(&self) -> Result<Vec<CameraRecord>, DirectoryError> {
        let rows: Vec<CameraRow> = sqlx::query_as::<Postgres, CameraRow>(
            r#"
            SELECT id, region, expected_network, ftp_target_folder, ftp_target_filename
            FROM cameras
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DirectoryError::Unreachable(e.to_string()))?;

        let total = rows.len();
        let cameras: Vec<CameraRecord> = rows
            .into_iter()
            .filter_map(CameraRow::into_camera_record)
            .collect();

        if cameras.is_empty() {
            return Err(DirectoryError::EmptyResult);
        }

        tracing::debug!(
            loaded = cameras.len(),
            dropped = total - cameras.len(),
            "Camera directory fetched"
        );
        Ok(cameras)
    }
}
