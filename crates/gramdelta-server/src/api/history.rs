use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gramdelta_core::SearchRecord;

use crate::middleware::{RequestId, Requester};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// History list entry: delta counts without the full people lists.
#[derive(Debug, Serialize)]
pub(super) struct HistoryItem {
    id: Uuid,
    target_handle: String,
    search_kind: String,
    data_source: String,
    total_new_followers: i64,
    total_new_following: i64,
    processing_time_ms: i64,
    created_at: DateTime<Utc>,
}

impl HistoryItem {
    fn from_record(record: &SearchRecord) -> Self {
        Self {
            id: record.id,
            target_handle: record.target_handle.clone(),
            search_kind: record.search_kind.as_str().to_owned(),
            data_source: record.data_source.clone(),
            total_new_followers: record.total_new_followers,
            total_new_following: record.total_new_following,
            processing_time_ms: record.processing_time_ms,
            created_at: record.created_at,
        }
    }
}

pub(super) async fn list(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(requester): Extension<Requester>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<HistoryItem>>>, ApiError> {
    let Some(requester) = requester.0 else {
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "search history requires an authenticated requester",
        ));
    };

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let records = gramdelta_db::list_search_history(&state.pool, requester, page, per_page)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = records.iter().map(HistoryItem::from_record).collect();
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn detail(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SearchRecord>>, ApiError> {
    let Some(requester) = requester.0 else {
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "search history requires an authenticated requester",
        ));
    };

    let record = gramdelta_db::get_search_record(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    // A record belonging to someone else is indistinguishable from a missing
    // one.
    match record {
        Some(record) if record.requester_id == Some(requester) => Ok(Json(ApiResponse {
            data: record,
            meta: ResponseMeta::new(req_id.0),
        })),
        _ => Err(ApiError::new(
            req_id.0,
            "not_found",
            "search record not found",
        )),
    }
}
