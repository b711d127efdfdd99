//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::protocol::{
    AttendanceResponse, CheckInBody, ErrorResponse, HistoryResponse, LivenessResponse,
    SessionCountResponse, SummaryResponse, TokenResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use checkin_core::{CheckInRequest, Coordinate};
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        issue_token_handler,
        check_in_handler,
        liveness_handler,
        summary_handler,
        my_attendance_handler,
    ),
    components(
        schemas(
            CheckInBody,
            AttendanceResponse,
            TokenResponse,
            LivenessResponse,
            SummaryResponse,
            SessionCountResponse,
            HistoryResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Check-in API", description = "Proximity-verified event check-in.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Issue the check-in token the host display should show now.
///
/// Tokens are valid for ten seconds; the display polls this endpoint to rotate its QR code.
#[utoipa::path(
    get,
    path = "/events/{event_id}/token",
    responses(
        (status = 200, description = "Fresh token", body = TokenResponse),
        (status = 403, description = "Caller is not the event host", body = ErrorResponse),
        (status = 404, description = "Unknown event", body = ErrorResponse)
    ),
    params(
        ("event_id" = String, Path, description = "The event to display."),
        ("x-user-id" = Uuid, Header, description = "The host's user id.")
    )
)]
pub async fn issue_token_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(event_id): Path<String>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = app_state.checkins.issue_token(&event_id, user_id).await?;
    Ok(Json(token.into()))
}

/// Check in to an event with a scanned token and the device position.
#[utoipa::path(
    post,
    path = "/events/{event_id}/check-ins",
    request_body = CheckInBody,
    responses(
        (status = 201, description = "Attendance recorded", body = AttendanceResponse),
        (status = 400, description = "Malformed token or coordinates", body = ErrorResponse),
        (status = 403, description = "Event not live, or position outside the radius", body = ErrorResponse),
        (status = 409, description = "Already checked in, or token for another event", body = ErrorResponse),
        (status = 410, description = "Token expired", body = ErrorResponse),
        (status = 503, description = "Storage unavailable; retry", body = ErrorResponse)
    ),
    params(
        ("event_id" = String, Path, description = "The event being checked in to."),
        ("x-user-id" = Uuid, Header, description = "The attendee's user id.")
    )
)]
pub async fn check_in_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(event_id): Path<String>,
    Json(body): Json<CheckInBody>,
) -> Result<impl IntoResponse, ApiError> {
    let position = Coordinate::new(body.latitude, body.longitude)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let record = app_state
        .checkins
        .check_in(CheckInRequest {
            event_id,
            user_id,
            token: body.token,
            position,
            accuracy_meters: body.accuracy_meters,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AttendanceResponse::from(record))))
}

/// Whether the event is accepting check-ins right now.
#[utoipa::path(
    get,
    path = "/events/{event_id}/live",
    responses(
        (status = 200, description = "Current liveness", body = LivenessResponse),
        (status = 404, description = "Unknown event", body = ErrorResponse)
    ),
    params(("event_id" = String, Path, description = "The event to evaluate."))
)]
pub async fn liveness_handler(
    State(app_state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Json<LivenessResponse>, ApiError> {
    let (live, session) = app_state.checkins.liveness(&event_id).await?;
    Ok(Json(LivenessResponse {
        event_id,
        live,
        session_date: session.session_date,
    }))
}

/// Attendance statistics for an event's dashboard.
#[utoipa::path(
    get,
    path = "/events/{event_id}/summary",
    responses(
        (status = 200, description = "Attendance statistics", body = SummaryResponse),
        (status = 404, description = "Unknown event", body = ErrorResponse)
    ),
    params(("event_id" = String, Path, description = "The event to summarise."))
)]
pub async fn summary_handler(
    State(app_state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let (event, aggregator) = app_state.checkins.statistics(&event_id).await?;
    let summary = aggregator.summary(event.max_attendees);
    Ok(Json(SummaryResponse::new(event.id, event.max_attendees, summary)))
}

/// The caller's own check-ins for an event, newest first.
#[utoipa::path(
    get,
    path = "/events/{event_id}/attendance/me",
    responses(
        (status = 200, description = "Caller's attendance history", body = HistoryResponse),
        (status = 404, description = "Unknown event", body = ErrorResponse)
    ),
    params(
        ("event_id" = String, Path, description = "The event."),
        ("x-user-id" = Uuid, Header, description = "The attendee's user id.")
    )
)]
pub async fn my_attendance_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(event_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (event, aggregator) = app_state.checkins.statistics(&event_id).await?;
    let history: Vec<AttendanceResponse> = aggregator
        .user_history(user_id)
        .into_iter()
        .map(AttendanceResponse::from)
        .collect();
    let last_check_in = aggregator.last_check_in(user_id).map(AttendanceResponse::from);

    Ok(Json(HistoryResponse {
        event_id: event.id,
        user_id,
        last_check_in,
        history,
    }))
}
