//! crates/checkin_core/src/ports.rs
//!
//! Defines the service contracts (traits) the check-in core depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of a specific database or time source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AttendanceRecord, Event, NewAttendance};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The backing service could not be reached; callers may retry at the transport level.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Result of an atomic insert-if-absent.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(AttendanceRecord),
    AlreadyExists,
}

/// Storage collaborator for events and attendance.
///
/// `insert_attendance_if_absent` must be atomic with respect to the
/// `(event_id, user_id, session_date)` triple: of any number of concurrent calls
/// for the same triple, exactly one may return `Inserted`.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn get_event(&self, event_id: &str) -> PortResult<Event>;

    async fn insert_attendance_if_absent(
        &self,
        attendance: NewAttendance,
    ) -> PortResult<InsertOutcome>;

    async fn list_attendance(&self, event_id: &str) -> PortResult<Vec<AttendanceRecord>>;
}

/// Source of "now". Every time-dependent decision reads the clock through this port.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
