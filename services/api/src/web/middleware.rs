//! services/api/src/web/middleware.rs
//!
//! Caller identity middleware for protecting routes.

use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

use crate::error::ApiError;

/// The header the upstream identity provider sets on every authenticated request.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Middleware that extracts the caller's user id.
///
/// If valid, inserts the user_id into request extensions for handlers to use.
/// If missing or not a UUID, returns 401 Unauthorized.
pub async fn require_user(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}
