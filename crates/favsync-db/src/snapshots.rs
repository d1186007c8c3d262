//! Persistence of the single favourites snapshot.
//!
//! The snapshot lives under a fixed key and every write replaces it whole.
//! Concurrent writers race; the last write to commit wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::RwLock;

use favsync_core::{FavoriteRecord, Snapshot, SNAPSHOT_ID};

use crate::DbError;

/// Keyed replace-only storage for [`Snapshot`] documents.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Inserts or wholly replaces the document at `snapshot.id`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Write`] if the replace did not commit; the previous
    /// document is then unchanged.
    async fn write(&self, snapshot: &Snapshot) -> Result<(), DbError>;

    /// Returns the document at the fixed key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if nothing was ever written.
    async fn read(&self) -> Result<Snapshot, DbError>;
}

#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    id: String,
    records: Json<Vec<FavoriteRecord>>,
    updated_at: DateTime<Utc>,
}

impl From<SnapshotRow> for Snapshot {
    fn from(row: SnapshotRow) -> Self {
        Self {
            id: row.id,
            records: row.records.0,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres-backed store keeping the records as one JSONB column.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn write(&self, snapshot: &Snapshot) -> Result<(), DbError> {
        // Single statement: readers see the old row or the new one, never a mix.
        sqlx::query(
            "INSERT INTO favorite_snapshots (id, records, updated_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE \
             SET records = EXCLUDED.records, updated_at = EXCLUDED.updated_at",
        )
        .bind(&snapshot.id)
        .bind(Json(&snapshot.records))
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::Write)?;

        tracing::debug!(
            id = %snapshot.id,
            records = snapshot.record_count(),
            "snapshot replaced"
        );
        Ok(())
    }

    async fn read(&self) -> Result<Snapshot, DbError> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            "SELECT id, records, updated_at FROM favorite_snapshots WHERE id = $1",
        )
        .bind(SNAPSHOT_ID)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Snapshot::from).ok_or(DbError::NotFound)
    }
}

/// Process-local store for tests and database-less runs.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    current: RwLock<Option<Snapshot>>,
}

impl InMemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Some(snapshot)),
        }
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn write(&self, snapshot: &Snapshot) -> Result<(), DbError> {
        *self.current.write().await = Some(snapshot.clone());
        Ok(())
    }

    async fn read(&self) -> Result<Snapshot, DbError> {
        self.current.read().await.clone().ok_or(DbError::NotFound)
    }
}

#[cfg(test)]
#[path = "snapshots_test.rs"]
mod tests;
