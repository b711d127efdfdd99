//! crates/checkin_core/src/error.rs
//!
//! The outcome taxonomy for a check-in request as seen by callers.

use crate::ports::PortError;
use crate::recorder::RecordError;
use crate::token::TokenError;
use crate::verifier::RejectReason;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckInError {
    #[error("The scanned code is not a check-in token")]
    TokenMalformed,
    #[error("The check-in token has expired; scan the current code")]
    TokenExpired,
    #[error("The token belongs to a different event")]
    EventMismatch,
    #[error("The event is not accepting check-ins right now")]
    EventNotLive,
    #[error("You are {0:.0} m from the event, outside the allowed radius")]
    OutOfRange(f64),
    #[error("Already checked in for this session")]
    AlreadyCheckedIn,
    #[error("Event not found: {0}")]
    EventNotFound(String),
    #[error("Only the event host can display its check-in code")]
    NotEventHost,
    #[error("Cannot issue a token: {0}")]
    TokenIssue(#[from] TokenError),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl CheckInError {
    /// True for outcomes the attendee can fix by retrying an action
    /// (rescan, move closer, wait). These are not system faults.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CheckInError::TokenMalformed
                | CheckInError::TokenExpired
                | CheckInError::EventMismatch
                | CheckInError::EventNotLive
                | CheckInError::OutOfRange(_)
                | CheckInError::AlreadyCheckedIn
        )
    }
}

impl From<RejectReason> for CheckInError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::TokenMalformed => CheckInError::TokenMalformed,
            RejectReason::TokenExpired => CheckInError::TokenExpired,
            RejectReason::EventMismatch => CheckInError::EventMismatch,
            RejectReason::EventNotLive => CheckInError::EventNotLive,
            RejectReason::OutOfRange { distance_meters } => CheckInError::OutOfRange(distance_meters),
        }
    }
}

impl From<RecordError> for CheckInError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::AlreadyCheckedIn => CheckInError::AlreadyCheckedIn,
            RecordError::StorageUnavailable(msg) => CheckInError::StorageUnavailable(msg),
        }
    }
}

impl From<PortError> for CheckInError {
    fn from(e: PortError) -> Self {
        CheckInError::StorageUnavailable(e.to_string())
    }
}
