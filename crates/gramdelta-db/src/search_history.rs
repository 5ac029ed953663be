//! Database operations for the `search_history` table.
//!
//! Records are keyed by the caller-generated UUID so a pending record and its
//! later completion or failure land in the same row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gramdelta_core::{HistorySink, SearchRecord, StoreError};

use crate::DbError;

/// A row from the `search_history` table, with JSONB columns undecoded.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchRecordRow {
    pub id: Uuid,
    pub requester_id: Option<Uuid>,
    pub target_handle: String,
    pub search_kind: String,
    pub data_source: String,
    pub new_followers: serde_json::Value,
    pub new_following: serde_json::Value,
    pub total_new_followers: i64,
    pub total_new_following: i64,
    pub processing_time_ms: i64,
    pub cache_hit: bool,
    pub status: String,
    pub error_message: Option<String>,
    pub results: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl SearchRecordRow {
    /// Decodes the JSONB and enum columns into the domain type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Json`] or [`DbError::InvalidEnum`] for a corrupt
    /// row.
    pub fn into_record(self) -> Result<SearchRecord, DbError> {
        Ok(SearchRecord {
            id: self.id,
            requester_id: self.requester_id,
            target_handle: self.target_handle,
            search_kind: self.search_kind.parse().map_err(DbError::InvalidEnum)?,
            data_source: self.data_source,
            new_followers: serde_json::from_value(self.new_followers)?,
            new_following: serde_json::from_value(self.new_following)?,
            total_new_followers: self.total_new_followers,
            total_new_following: self.total_new_following,
            processing_time_ms: self.processing_time_ms,
            cache_hit: self.cache_hit,
            status: self.status.parse().map_err(DbError::InvalidEnum)?,
            error_message: self.error_message,
            results: self.results,
            created_at: self.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, requester_id, target_handle, search_kind, data_source, \
     new_followers, new_following, total_new_followers, total_new_following, \
     processing_time_ms, cache_hit, status, error_message, results, created_at";

/// Writes a search record, replacing any prior write for the same id.
///
/// The totals stored are recomputed from the delta list lengths, not taken
/// from the record's total fields.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the write fails, [`DbError::Json`] if a list
/// cannot be serialized.
pub async fn insert_search_record(pool: &PgPool, record: &SearchRecord) -> Result<(), DbError> {
    let total_new_followers = i64::try_from(record.new_followers.len()).unwrap_or(i64::MAX);
    let total_new_following = i64::try_from(record.new_following.len()).unwrap_or(i64::MAX);
    let new_followers = serde_json::to_value(&record.new_followers)?;
    let new_following = serde_json::to_value(&record.new_following)?;

    sqlx::query(
        "INSERT INTO search_history \
             (id, requester_id, target_handle, search_kind, data_source, \
              new_followers, new_following, total_new_followers, total_new_following, \
              processing_time_ms, cache_hit, status, error_message, results, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         ON CONFLICT (id) DO UPDATE SET \
             new_followers       = EXCLUDED.new_followers, \
             new_following       = EXCLUDED.new_following, \
             total_new_followers = EXCLUDED.total_new_followers, \
             total_new_following = EXCLUDED.total_new_following, \
             processing_time_ms  = EXCLUDED.processing_time_ms, \
             cache_hit           = EXCLUDED.cache_hit, \
             status              = EXCLUDED.status, \
             error_message       = EXCLUDED.error_message, \
             results             = EXCLUDED.results",
    )
    .bind(record.id)
    .bind(record.requester_id)
    .bind(&record.target_handle)
    .bind(record.search_kind.as_str())
    .bind(&record.data_source)
    .bind(new_followers)
    .bind(new_following)
    .bind(total_new_followers)
    .bind(total_new_following)
    .bind(record.processing_time_ms)
    .bind(record.cache_hit)
    .bind(record.status.as_str())
    .bind(record.error_message.as_deref())
    .bind(record.results.clone())
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Completed searches by `requester`, most recent first, paged.
///
/// `page` is 1-based; `per_page` is clamped to at least 1.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, [`DbError::Json`] or
/// [`DbError::InvalidEnum`] for a corrupt row.
pub async fn list_search_history(
    pool: &PgPool,
    requester: Uuid,
    page: i64,
    per_page: i64,
) -> Result<Vec<SearchRecord>, DbError> {
    let per_page = per_page.max(1);
    let offset = (page.max(1) - 1) * per_page;

    let rows = sqlx::query_as::<_, SearchRecordRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM search_history \
         WHERE requester_id = $1 AND status = 'completed' \
         ORDER BY created_at DESC \
         LIMIT $2 OFFSET $3"
    ))
    .bind(requester)
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SearchRecordRow::into_record).collect()
}

/// One search record by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_search_record(pool: &PgPool, id: Uuid) -> Result<Option<SearchRecord>, DbError> {
    let row = sqlx::query_as::<_, SearchRecordRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM search_history WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(SearchRecordRow::into_record).transpose()
}

/// Number of searches the requester has run since midnight UTC.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_searches_today(pool: &PgPool, requester: Uuid) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM search_history \
         WHERE requester_id = $1 AND created_at >= date_trunc('day', NOW())",
    )
    .bind(requester)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// [`HistorySink`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgHistorySink {
    pool: PgPool,
}

impl PgHistorySink {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistorySink for PgHistorySink {
    async fn record(&self, record: &SearchRecord) -> Result<(), StoreError> {
        insert_search_record(&self.pool, record)
            .await
            .map_err(|e| StoreError::History(e.to_string()))
    }

    async fn latest_completed(
        &self,
        requester: Uuid,
        handle: &str,
    ) -> Result<Option<SearchRecord>, StoreError> {
        let row = sqlx::query_as::<_, SearchRecordRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM search_history \
             WHERE requester_id = $1 AND target_handle = $2 AND status = 'completed' \
             ORDER BY created_at DESC \
             LIMIT 1"
        ))
        .bind(requester)
        .bind(handle)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::History(e.to_string()))?;

        row.map(SearchRecordRow::into_record)
            .transpose()
            .map_err(|e| StoreError::History(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramdelta_core::{Person, SearchKind, SearchStatus};

    fn person(id: &str) -> Person {
        Person {
            id: id.to_owned(),
            handle: format!("user_{id}"),
            display_name: String::new(),
            avatar_url: None,
            is_verified: false,
            is_private: false,
            follower_count: None,
            following_count: None,
            media_count: None,
            biography: None,
            external_url: None,
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn insert_then_complete_updates_same_row(pool: PgPool) {
        let requester = Uuid::new_v4();
        let mut record = SearchRecord::new(Some(requester), "alice", SearchKind::Both, "scraper");
        insert_search_record(&pool, &record).await.expect("insert");

        record.set_deltas(vec![person("1")], vec![]);
        record.complete(250, serde_json::json!({ "ok": true }));
        insert_search_record(&pool, &record).await.expect("update");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search_history")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 1);

        let stored = get_search_record(&pool, record.id)
            .await
            .expect("get")
            .expect("row exists");
        assert_eq!(stored.status, SearchStatus::Completed);
        assert_eq!(stored.total_new_followers, 1);
        assert_eq!(stored.processing_time_ms, 250);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn stored_totals_come_from_list_lengths(pool: PgPool) {
        let mut record = SearchRecord::new(None, "alice", SearchKind::Followers, "scraper");
        record.new_followers = vec![person("1"), person("2")];
        record.total_new_followers = 999; // deliberately wrong
        insert_search_record(&pool, &record).await.expect("insert");

        let stored = get_search_record(&pool, record.id)
            .await
            .expect("get")
            .expect("row exists");
        assert_eq!(stored.total_new_followers, 2);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_returns_completed_only_most_recent_first(pool: PgPool) {
        let requester = Uuid::new_v4();

        let mut older = SearchRecord::new(Some(requester), "alice", SearchKind::Both, "scraper");
        older.created_at = Utc::now() - chrono::Duration::minutes(10);
        older.complete(100, serde_json::json!({}));
        insert_search_record(&pool, &older).await.expect("older");

        let mut newer = SearchRecord::new(Some(requester), "bob", SearchKind::Both, "scraper");
        newer.complete(100, serde_json::json!({}));
        insert_search_record(&pool, &newer).await.expect("newer");

        let mut failed = SearchRecord::new(Some(requester), "carol", SearchKind::Both, "scraper");
        failed.fail(50, "boom", false);
        insert_search_record(&pool, &failed).await.expect("failed");

        let records = list_search_history(&pool, requester, 1, 10)
            .await
            .expect("list");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].target_handle, "bob");
        assert_eq!(records[1].target_handle, "alice");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn latest_completed_scopes_by_requester_and_handle(pool: PgPool) {
        let requester = Uuid::new_v4();
        let other = Uuid::new_v4();
        let sink = PgHistorySink::new(pool.clone());

        let mut mine = SearchRecord::new(Some(requester), "alice", SearchKind::Both, "scraper");
        mine.complete(100, serde_json::json!({}));
        sink.record(&mine).await.expect("mine");

        let mut theirs = SearchRecord::new(Some(other), "alice", SearchKind::Both, "scraper");
        theirs.complete(100, serde_json::json!({}));
        sink.record(&theirs).await.expect("theirs");

        let found = sink
            .latest_completed(requester, "alice")
            .await
            .expect("query")
            .expect("record exists");
        assert_eq!(found.id, mine.id);

        let none = sink
            .latest_completed(requester, "bob")
            .await
            .expect("query");
        assert!(none.is_none());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn count_searches_today_ignores_other_requesters(pool: PgPool) {
        let requester = Uuid::new_v4();
        let record = SearchRecord::new(Some(requester), "alice", SearchKind::Both, "scraper");
        insert_search_record(&pool, &record).await.expect("insert");

        let other = SearchRecord::new(Some(Uuid::new_v4()), "bob", SearchKind::Both, "scraper");
        insert_search_record(&pool, &other).await.expect("other");

        let count = count_searches_today(&pool, requester).await.expect("count");
        assert_eq!(count, 1);
    }
}
