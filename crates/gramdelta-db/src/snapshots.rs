//! Database operations for the `snapshots` table.
//!
//! One live row per target handle; every upsert is a full-row replacement.
//! Rows leave the table only through the retention sweep.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gramdelta_core::{NewSnapshot, Person, Snapshot, SnapshotStore, StoreError};

use crate::DbError;

/// A row from the `snapshots` table, with the people lists still as JSONB.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub id: Uuid,
    pub handle: String,
    pub profile: serde_json::Value,
    pub followers: serde_json::Value,
    pub following: serde_json::Value,
    pub total_followers: i64,
    pub total_following: i64,
    pub last_full_update: DateTime<Utc>,
    pub last_followers_update: DateTime<Utc>,
    pub last_following_update: DateTime<Utc>,
    pub update_frequency_minutes: i32,
    pub is_stale: bool,
}

impl SnapshotRow {
    /// Decodes the JSONB columns into the domain type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Json`] if a stored column does not decode; that
    /// indicates a corrupt row, not a caller mistake.
    pub fn into_snapshot(self) -> Result<Snapshot, DbError> {
        Ok(Snapshot {
            id: self.id,
            handle: self.handle,
            profile: serde_json::from_value(self.profile)?,
            followers: serde_json::from_value(self.followers)?,
            following: serde_json::from_value(self.following)?,
            total_followers: self.total_followers,
            total_following: self.total_following,
            last_full_update: self.last_full_update,
            last_followers_update: self.last_followers_update,
            last_following_update: self.last_following_update,
            update_frequency_minutes: self.update_frequency_minutes,
            is_stale: self.is_stale,
        })
    }
}

const SELECT_COLUMNS: &str = "id, handle, profile, followers, following, \
     total_followers, total_following, last_full_update, last_followers_update, \
     last_following_update, update_frequency_minutes, is_stale";

/// Returns the live snapshot for `handle`, if one exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, [`DbError::Json`] if a
/// stored column does not decode.
pub async fn get_snapshot_by_handle(
    pool: &PgPool,
    handle: &str,
) -> Result<Option<Snapshot>, DbError> {
    let row = sqlx::query_as::<_, SnapshotRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM snapshots WHERE handle = $1"
    ))
    .bind(handle)
    .fetch_optional(pool)
    .await?;

    row.map(SnapshotRow::into_snapshot).transpose()
}

/// Creates or fully replaces the snapshot for `snapshot.handle`.
///
/// Totals are recomputed from the list lengths here; callers never supply
/// them. On conflict every mutable column is overwritten and all three
/// update timestamps are reset, so a replaced row carries no residue of the
/// previous fetch.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails, [`DbError::Json`] if the
/// lists cannot be serialized or the returned row does not decode.
pub async fn upsert_snapshot(pool: &PgPool, snapshot: NewSnapshot) -> Result<Snapshot, DbError> {
    let total_followers = i64::try_from(snapshot.followers.len()).unwrap_or(i64::MAX);
    let total_following = i64::try_from(snapshot.following.len()).unwrap_or(i64::MAX);
    let profile = serde_json::to_value(&snapshot.profile)?;
    let followers = serde_json::to_value(&snapshot.followers)?;
    let following = serde_json::to_value(&snapshot.following)?;

    let row = sqlx::query_as::<_, SnapshotRow>(&format!(
        "INSERT INTO snapshots \
             (handle, profile, followers, following, total_followers, total_following) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (handle) DO UPDATE SET \
             profile                = EXCLUDED.profile, \
             followers              = EXCLUDED.followers, \
             following              = EXCLUDED.following, \
             total_followers        = EXCLUDED.total_followers, \
             total_following        = EXCLUDED.total_following, \
             last_full_update       = NOW(), \
             last_followers_update  = NOW(), \
             last_following_update  = NOW(), \
             is_stale               = FALSE \
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(&snapshot.handle)
    .bind(profile)
    .bind(followers)
    .bind(following)
    .bind(total_followers)
    .bind(total_following)
    .fetch_one(pool)
    .await?;

    row.into_snapshot()
}

/// Flags a snapshot as stale without touching its data.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no snapshot exists for `handle`,
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_snapshot_stale(pool: &PgPool, handle: &str) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE snapshots SET is_stale = TRUE WHERE handle = $1")
        .bind(handle)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Retention sweep: deletes snapshots whose last full update is older than
/// `days` days. Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_snapshots_older_than(pool: &PgPool, days: i64) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM snapshots WHERE last_full_update < NOW() - ($1 * INTERVAL '1 day')",
    )
    .bind(days)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// [`SnapshotStore`] backed by Postgres.
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
    async fn get(&self, handle: &str) -> Result<Option<Snapshot>, StoreError> {
        get_snapshot_by_handle(&self.pool, handle)
            .await
            .map_err(|e| StoreError::Snapshot(e.to_string()))
    }

    async fn upsert(&self, snapshot: NewSnapshot) -> Result<Snapshot, StoreError> {
        upsert_snapshot(&self.pool, snapshot)
            .await
            .map_err(|e| StoreError::Snapshot(e.to_string()))
    }
}
