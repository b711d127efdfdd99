//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client (host display,
//! attendee scanner, dashboards) and the API server.

use chrono::{DateTime, NaiveDate, Utc};
use checkin_core::{AttendanceRecord, CheckInToken, EventSummary, SessionCount};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Payloads Sent FROM the Client TO the Server
//=========================================================================================

/// A decoded QR code plus the attendee's reported position.
#[derive(Deserialize, Debug, ToSchema)]
pub struct CheckInBody {
    /// The decoded `CHECKIN-...` string.
    pub token: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy reported by the device, if any. Informational only.
    pub accuracy_meters: Option<f64>,
}

//=========================================================================================
// Payloads Sent FROM the Server TO the Client
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
pub struct AttendanceResponse {
    pub id: Uuid,
    pub event_id: String,
    pub user_id: Uuid,
    pub session_date: NaiveDate,
    pub checked_in_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_meters: f64,
}

impl From<AttendanceRecord> for AttendanceResponse {
    fn from(r: AttendanceRecord) -> Self {
        Self {
            id: r.id,
            event_id: r.event_id,
            user_id: r.user_id,
            session_date: r.session_date,
            checked_in_at: r.checked_in_at,
            latitude: r.position.latitude(),
            longitude: r.position.longitude(),
            distance_meters: r.distance_meters,
        }
    }
}

/// What the host display should render as a QR code right now.
#[derive(Serialize, Debug, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub issued_at_ms: i64,
    /// Last instant the token is accepted; the display should refresh before this.
    pub expires_at_ms: i64,
}

impl From<CheckInToken> for TokenResponse {
    fn from(t: CheckInToken) -> Self {
        Self {
            token: t.encode(),
            issued_at_ms: t.issued_at_millis,
            expires_at_ms: t.expires_at_millis(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct LivenessResponse {
    pub event_id: String,
    pub live: bool,
    /// The session a check-in made now would count towards.
    pub session_date: NaiveDate,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SessionCountResponse {
    pub session_date: NaiveDate,
    pub attendees: usize,
}

impl From<SessionCount> for SessionCountResponse {
    fn from(s: SessionCount) -> Self {
        Self {
            session_date: s.session_date,
            attendees: s.attendees,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SummaryResponse {
    pub event_id: String,
    pub max_attendees: Option<u32>,
    pub total_sessions: usize,
    pub unique_attendees: usize,
    pub peak_attendance: usize,
    pub average_attendance: usize,
    pub latest_session: Option<NaiveDate>,
    pub latest_session_attendees: usize,
    /// Percentage of `max_attendees`, 0 when no capacity is set.
    pub latest_session_rate: u32,
    pub sessions: Vec<SessionCountResponse>,
}

impl SummaryResponse {
    pub fn new(event_id: String, max_attendees: Option<u32>, summary: EventSummary) -> Self {
        Self {
            event_id,
            max_attendees,
            total_sessions: summary.total_sessions,
            unique_attendees: summary.unique_attendees,
            peak_attendance: summary.peak_attendance,
            average_attendance: summary.average_attendance,
            latest_session: summary.latest_session,
            latest_session_attendees: summary.latest_session_attendees,
            latest_session_rate: summary.latest_session_rate,
            sessions: summary.sessions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HistoryResponse {
    pub event_id: String,
    pub user_id: Uuid,
    pub last_check_in: Option<AttendanceResponse>,
    /// Newest first.
    pub history: Vec<AttendanceResponse>,
}

/// Body of every non-2xx response.
#[derive(Serialize, Debug, ToSchema)]
pub struct ErrorResponse {
    /// Stable machine-readable code, e.g. `out_of_range`.
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}
