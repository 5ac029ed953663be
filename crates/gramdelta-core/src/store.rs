//! Collaborator traits for snapshot persistence and search history.
//!
//! The search engine only needs keyed read/upsert over snapshots and a
//! write-only history sink; the Postgres implementations live in
//! `gramdelta-db`, and tests substitute in-memory doubles.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{NewSnapshot, SearchRecord, Snapshot};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot store error: {0}")]
    Snapshot(String),

    #[error("history sink error: {0}")]
    History(String),
}

/// Durable keyed storage mapping a target handle to its last-known state.
///
/// Writes are full replacements: `upsert` must atomically replace every field
/// of an existing row for the same handle, never merge.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns the live snapshot for `handle`, if one exists.
    async fn get(&self, handle: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Creates or fully replaces the snapshot for `snapshot.handle` and
    /// returns the stored row.
    async fn upsert(&self, snapshot: NewSnapshot) -> Result<Snapshot, StoreError>;
}

/// Write-only audit sink for search records. The engine never reads records
/// back within a request.
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn record(&self, record: &SearchRecord) -> Result<(), StoreError>;

    /// Most recent completed search by `requester` against `handle`, if any.
    /// Used by the routing layer for history views; the engine itself diffs
    /// against the snapshot store, not history.
    async fn latest_completed(
        &self,
        requester: Uuid,
        handle: &str,
    ) -> Result<Option<SearchRecord>, StoreError>;
}
