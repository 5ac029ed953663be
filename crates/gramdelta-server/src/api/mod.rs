mod history;
mod search;

use std::sync::{Arc, LazyLock};

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use gramdelta_db::{PgHistorySink, PgSnapshotStore};
use gramdelta_engine::{SearchEngine, SearchError};
use gramdelta_upstream::UpstreamError;

use crate::middleware::{request_id, requester_identity, RequestId};

pub type Engine = SearchEngine<PgSnapshotStore, PgHistorySink>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub engine: Arc<Engine>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                retry_after_secs: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

static HANDLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._]{1,30}$").expect("valid regex"));

/// Rejects malformed handles before any upstream call is made.
pub(super) fn validate_handle(request_id: &str, handle: &str) -> Result<(), ApiError> {
    if HANDLE_PATTERN.is_match(handle) {
        Ok(())
    } else {
        Err(ApiError::new(
            request_id.to_owned(),
            "validation_error",
            "handle must be 1-30 characters of letters, digits, '.' or '_'",
        ))
    }
}

pub(super) fn map_search_error(request_id: String, error: &SearchError) -> ApiError {
    match error {
        SearchError::Unauthorized => ApiError::new(request_id, "unauthorized", error.to_string()),
        SearchError::InvalidArgument(_) => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        SearchError::Upstream(upstream) => map_upstream_error(request_id, upstream),
        SearchError::Store(e) => {
            tracing::error!(error = %e, "store operation failed");
            ApiError::new(request_id, "internal_error", "storage operation failed")
        }
    }
}

fn map_upstream_error(request_id: String, error: &UpstreamError) -> ApiError {
    match error {
        UpstreamError::NotFound { .. } | UpstreamError::PrivateAccount { .. } => {
            ApiError::new(request_id, "not_found", error.to_string())
        }
        UpstreamError::RateLimited { retry_after_secs } => {
            let mut api_error = ApiError::new(request_id, "rate_limited", error.to_string());
            api_error.error.retry_after_secs = Some(*retry_after_secs);
            api_error
        }
        UpstreamError::Unavailable { .. } => {
            ApiError::new(request_id, "upstream_unavailable", error.to_string())
        }
        UpstreamError::Forbidden { .. } => {
            ApiError::new(request_id, "forbidden", error.to_string())
        }
        UpstreamError::Http(_) | UpstreamError::UnexpectedStatus { .. }
        | UpstreamError::Deserialize { .. } => {
            tracing::error!(error = %error, "upstream request failed");
            ApiError::new(request_id, "internal_error", "upstream request failed")
        }
    }
}

pub(super) fn map_db_error(request_id: String, error: &gramdelta_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static("x-requester-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/search/basic", post(search::basic))
        .route("/api/v1/search/advanced", post(search::advanced))
        .route("/api/v1/search/shared", post(search::shared))
        .route("/api/v1/search/admirers", post(search::admirers))
        .route("/api/v1/search/profile", post(search::profile))
        .route("/api/v1/search/followers/next", post(search::next_followers))
        .route("/api/v1/search/following/next", post(search::next_following))
        .route("/api/v1/search/media/next", post(search::next_media))
        .route("/api/v1/search/history", get(history::list))
        .route("/api/v1/search/history/{id}", get(history::detail))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(axum::middleware::from_fn(requester_identity)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match gramdelta_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramdelta_core::StoreError;

    #[test]
    fn handle_validation_accepts_typical_handles() {
        assert!(validate_handle("req-1", "some_user.99").is_ok());
        assert!(validate_handle("req-1", "a").is_ok());
    }

    #[test]
    fn handle_validation_rejects_bad_input() {
        assert!(validate_handle("req-1", "").is_err());
        assert!(validate_handle("req-1", "has spaces").is_err());
        assert!(validate_handle("req-1", "way_too_long_for_any_real_account_name").is_err());
        assert!(validate_handle("req-1", "emoji🙂").is_err());
    }

    #[test]
    fn rate_limited_error_carries_retry_guidance() {
        let error = SearchError::Upstream(UpstreamError::RateLimited {
            retry_after_secs: 120,
        });
        let api_error = map_search_error("req-1".to_owned(), &error);
        assert_eq!(api_error.error.code, "rate_limited");
        assert_eq!(api_error.error.retry_after_secs, Some(120));
        let response = api_error.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn private_account_maps_to_not_found() {
        let error = SearchError::Upstream(UpstreamError::PrivateAccount {
            handle: "someone".to_owned(),
        });
        let api_error = map_search_error("req-1".to_owned(), &error);
        assert_eq!(api_error.error.code, "not_found");
        assert_eq!(
            api_error.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn unavailable_maps_to_service_unavailable() {
        let error = SearchError::Upstream(UpstreamError::Unavailable { status: 402 });
        let api_error = map_search_error("req-1".to_owned(), &error);
        assert_eq!(
            api_error.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn store_error_does_not_leak_details() {
        let error = SearchError::Store(StoreError::Snapshot("connection refused".to_owned()));
        let api_error = map_search_error("req-1".to_owned(), &error);
        assert_eq!(api_error.error.code, "internal_error");
        assert!(!api_error.error.message.contains("connection refused"));
    }
}
