use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use gramdelta_core::SearchKind;
use gramdelta_engine::{
    AdmirersResult, AdvancedSearchResult, BasicSearchResult, MediaPageResult, PeoplePageResult,
    ProfileDetailsResult, SharedActivityResult,
};

use crate::middleware::{RequestId, Requester};

use super::{map_search_error, validate_handle, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct BasicSearchRequest {
    pub handle: String,
    #[serde(default = "default_kind")]
    pub kind: SearchKind,
}

fn default_kind() -> SearchKind {
    SearchKind::Both
}

#[derive(Debug, Deserialize)]
pub(super) struct TargetRequest {
    pub handle: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct SharedRequest {
    pub handle_a: String,
    pub handle_b: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct PageRequest {
    pub user_id: String,
    pub cursor: String,
}

pub(super) async fn basic(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<BasicSearchRequest>,
) -> Result<Json<ApiResponse<BasicSearchResult>>, ApiError> {
    validate_handle(&req_id.0, &body.handle)?;

    let data = state
        .engine
        .basic_search(&body.handle, body.kind)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn advanced(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(requester): Extension<Requester>,
    Json(body): Json<TargetRequest>,
) -> Result<Json<ApiResponse<AdvancedSearchResult>>, ApiError> {
    validate_handle(&req_id.0, &body.handle)?;

    let data = state
        .engine
        .advanced_search(&body.handle, requester.0)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn shared(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(requester): Extension<Requester>,
    Json(body): Json<SharedRequest>,
) -> Result<Json<ApiResponse<SharedActivityResult>>, ApiError> {
    validate_handle(&req_id.0, &body.handle_a)?;
    validate_handle(&req_id.0, &body.handle_b)?;

    let data = state
        .engine
        .shared_activity(&body.handle_a, &body.handle_b, requester.0)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn admirers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(requester): Extension<Requester>,
    Json(body): Json<TargetRequest>,
) -> Result<Json<ApiResponse<AdmirersResult>>, ApiError> {
    validate_handle(&req_id.0, &body.handle)?;

    let data = state
        .engine
        .admirers(&body.handle, requester.0)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn profile(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(requester): Extension<Requester>,
    Json(body): Json<TargetRequest>,
) -> Result<Json<ApiResponse<ProfileDetailsResult>>, ApiError> {
    validate_handle(&req_id.0, &body.handle)?;

    let data = state
        .engine
        .profile_details(&body.handle, requester.0)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn next_followers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<PageRequest>,
) -> Result<Json<ApiResponse<PeoplePageResult>>, ApiError> {
    let data = state
        .engine
        .load_more_followers(&body.user_id, &body.cursor)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn next_following(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<PageRequest>,
) -> Result<Json<ApiResponse<PeoplePageResult>>, ApiError> {
    let data = state
        .engine
        .load_more_following(&body.user_id, &body.cursor)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn next_media(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<PageRequest>,
) -> Result<Json<ApiResponse<MediaPageResult>>, ApiError> {
    let data = state
        .engine
        .load_more_media(&body.user_id, &body.cursor)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
