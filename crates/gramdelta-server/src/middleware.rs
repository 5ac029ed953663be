use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The authenticated requester, as asserted by the gateway in front of this
/// service. Session issuance and verification happen there; this service only
/// reads the identity header.
#[derive(Debug, Clone, Copy)]
pub struct Requester(pub Option<Uuid>);

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Axum middleware that reads the requester identity from `x-requester-id`.
///
/// A missing or malformed header yields `Requester(None)`; the engine decides
/// per operation whether an anonymous caller is acceptable.
pub async fn requester_identity(mut req: Request, next: Next) -> Response {
    let requester = req
        .headers()
        .get("x-requester-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok());

    req.extensions_mut().insert(Requester(requester));
    next.run(req).await
}
