//! crates/checkin_core/src/domain.rs
//!
//! Defines the pure, core data structures for check-in verification.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

//=========================================================================================
// Coordinates
//=========================================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("Latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("Longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// A position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Builds a coordinate, rejecting out-of-range or NaN values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

//=========================================================================================
// Schedules
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Start time {start} must be before end time {end}")]
    InvertedWindow { start: NaiveTime, end: NaiveTime },
    #[error("Weekday {0} is outside 0 (Sunday) ..= 6 (Saturday)")]
    InvalidWeekday(u8),
    #[error("A recurring schedule needs at least one weekday")]
    NoWeekdays,
}

/// When an event accepts check-ins. Windows never cross midnight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSchedule {
    OneTime {
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    },
    /// `days_of_week` uses 0 = Sunday through 6 = Saturday.
    Recurring {
        days_of_week: BTreeSet<u8>,
        start_time: NaiveTime,
        end_time: NaiveTime,
    },
}

impl EventSchedule {
    pub fn one_time(
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Self, ScheduleError> {
        check_window(start_time, end_time)?;
        Ok(Self::OneTime {
            date,
            start_time,
            end_time,
        })
    }

    pub fn recurring(
        days_of_week: impl IntoIterator<Item = u8>,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Self, ScheduleError> {
        check_window(start_time, end_time)?;
        let days_of_week: BTreeSet<u8> = days_of_week.into_iter().collect();
        if days_of_week.is_empty() {
            return Err(ScheduleError::NoWeekdays);
        }
        if let Some(&day) = days_of_week.iter().find(|&&d| d > 6) {
            return Err(ScheduleError::InvalidWeekday(day));
        }
        Ok(Self::Recurring {
            days_of_week,
            start_time,
            end_time,
        })
    }

    pub fn start_time(&self) -> NaiveTime {
        match self {
            Self::OneTime { start_time, .. } | Self::Recurring { start_time, .. } => *start_time,
        }
    }

    pub fn end_time(&self) -> NaiveTime {
        match self {
            Self::OneTime { end_time, .. } | Self::Recurring { end_time, .. } => *end_time,
        }
    }
}

fn check_window(start: NaiveTime, end: NaiveTime) -> Result<(), ScheduleError> {
    if start < end {
        Ok(())
    } else {
        Err(ScheduleError::InvertedWindow { start, end })
    }
}

//=========================================================================================
// Events
//=========================================================================================

/// An event that attendees check in to. Owned by a host.
#[derive(Debug, Clone)]
pub struct Event {
    /// Opaque identifier. Ids minted by this system never contain `-`.
    pub id: String,
    pub host_id: Uuid,
    pub name: String,
    pub location: Coordinate,
    pub radius_meters: f64,
    pub schedule: EventSchedule,
    pub max_attendees: Option<u32>,
    pub is_active: bool,
    /// Offset of the event's local wall clock from UTC, in minutes.
    pub utc_offset_minutes: i32,
}

impl Event {
    /// The event's fixed offset; out-of-range offsets fall back to UTC.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or(Utc.fix())
    }

    /// A geofence is only enforceable with a finite, positive radius.
    pub fn has_valid_radius(&self) -> bool {
        self.radius_meters.is_finite() && self.radius_meters > 0.0
    }

    /// Converts an instant into the event's local wall-clock time.
    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset())
    }
}

//=========================================================================================
// Sessions and attendance
//=========================================================================================

/// Groups attendance per occurrence of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    pub event_id: String,
    pub session_date: NaiveDate,
}

impl SessionKey {
    /// One-time events always use their scheduled date; recurring events use the
    /// local calendar date of the verification instant.
    pub fn for_event(event: &Event, local_today: NaiveDate) -> Self {
        let session_date = match &event.schedule {
            EventSchedule::OneTime { date, .. } => *date,
            EventSchedule::Recurring { .. } => local_today,
        };
        Self {
            event_id: event.id.clone(),
            session_date,
        }
    }
}

/// A verified attendance. Created once per (event, user, session) and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub event_id: String,
    pub user_id: Uuid,
    pub session_date: NaiveDate,
    pub checked_in_at: DateTime<Utc>,
    pub position: Coordinate,
    pub distance_meters: f64,
}

impl AttendanceRecord {
    pub fn session_key(&self) -> SessionKey {
        SessionKey {
            event_id: self.event_id.clone(),
            session_date: self.session_date,
        }
    }

    pub fn checked_in_at_millis(&self) -> i64 {
        self.checked_in_at.timestamp_millis()
    }
}

/// The attendance a store is asked to insert; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub event_id: String,
    pub user_id: Uuid,
    pub session_date: NaiveDate,
    pub checked_in_at: DateTime<Utc>,
    pub position: Coordinate,
    pub distance_meters: f64,
}

impl NewAttendance {
    pub fn session_key(&self) -> SessionKey {
        SessionKey {
            event_id: self.event_id.clone(),
            session_date: self.session_date,
        }
    }

    pub fn into_record(self, id: Uuid) -> AttendanceRecord {
        AttendanceRecord {
            id,
            event_id: self.event_id,
            user_id: self.user_id,
            session_date: self.session_date,
            checked_in_at: self.checked_in_at,
            position: self.position,
            distance_meters: self.distance_meters,
        }
    }
}

/// Weekday numbered 0 = Sunday through 6 = Saturday.
pub fn weekday_index<D: Datelike>(date: &D) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}
