//! crates/checkin_core/src/verifier.rs
//!
//! The single accept/reject decision for a check-in attempt.
//!
//! An attempt moves through `Received -> TokenChecked -> LivenessChecked ->
//! GeofenceChecked` and stops at the first failing stage. Nothing is persisted
//! here; [`crate::recorder::AttendanceRecorder`] consumes the accepted verdict.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{Coordinate, Event, SessionKey};
use crate::geo;
use crate::liveness;
use crate::token::{self, TokenError};

/// Why an attempt was turned away. All of these are recoverable by the attendee.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    TokenMalformed,
    TokenExpired,
    EventMismatch,
    EventNotLive,
    OutOfRange { distance_meters: f64 },
}

/// Proof that an attempt passed every check. Only [`verify`] constructs one.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedVerdict {
    event_id: String,
    session_key: SessionKey,
    position: Coordinate,
    distance_meters: f64,
    verified_at: DateTime<Utc>,
}

impl AcceptedVerdict {
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    pub fn position(&self) -> Coordinate {
        self.position
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    pub fn verified_at(&self) -> DateTime<Utc> {
        self.verified_at
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted(AcceptedVerdict),
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Received,
    TokenChecked,
    LivenessChecked,
    GeofenceChecked,
}

fn reject(stage: Stage, reason: RejectReason) -> Verdict {
    debug!(?stage, ?reason, "Check-in attempt rejected");
    Verdict::Rejected(reason)
}

/// Checks a scanned token and claimed position against `event` at instant `now`.
pub fn verify(
    token_raw: &str,
    claimed_position: Coordinate,
    event: &Event,
    now: DateTime<Utc>,
) -> Verdict {
    let stage = Stage::Received;
    let token = match token::parse(token_raw, now.timestamp_millis()) {
        Ok(token) => token,
        Err(TokenError::Expired { .. }) => return reject(stage, RejectReason::TokenExpired),
        Err(_) => return reject(stage, RejectReason::TokenMalformed),
    };

    if token.event_id != event.id {
        return reject(stage, RejectReason::EventMismatch);
    }
    let stage = Stage::TokenChecked;

    let local_now = event.local_time(now);
    if !liveness::is_live(event, &local_now) {
        return reject(stage, RejectReason::EventNotLive);
    }
    let stage = Stage::LivenessChecked;

    let distance_meters = geo::distance(claimed_position, event.location);
    // Written so a NaN distance or radius falls through to rejection.
    if !event.has_valid_radius() || !(distance_meters <= event.radius_meters) {
        return reject(stage, RejectReason::OutOfRange { distance_meters });
    }
    let stage = Stage::GeofenceChecked;

    debug!(?stage, event_id = %event.id, distance_meters, "Check-in attempt accepted");
    Verdict::Accepted(AcceptedVerdict {
        event_id: event.id.clone(),
        session_key: SessionKey::for_event(event, local_now.date_naive()),
        position: claimed_position,
        distance_meters,
        verified_at: now,
    })
}
