//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `AttendanceStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! The "one attendance per session" rule lives in the `attendance_once_per_session`
//! unique constraint; inserts use `ON CONFLICT DO NOTHING` so a losing racer sees
//! `AlreadyExists` rather than an error.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use checkin_core::domain::{AttendanceRecord, Coordinate, Event, EventSchedule, NewAttendance};
use checkin_core::ports::{AttendanceStore, InsertOutcome, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use tracing::{error, instrument};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `AttendanceStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Connection-level failures are worth a transport retry; everything else is unexpected.
fn port_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(e.to_string()),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => PortError::Unavailable(e.to_string()),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct EventRecord {
    id: String,
    host_id: Uuid,
    name: String,
    latitude: f64,
    longitude: f64,
    radius_meters: f64,
    schedule_kind: String,
    event_date: Option<NaiveDate>,
    days_of_week: Option<Vec<i16>>,
    start_time: NaiveTime,
    end_time: NaiveTime,
    max_attendees: Option<i32>,
    is_active: bool,
    utc_offset_minutes: i32,
}

impl EventRecord {
    fn to_domain(self) -> PortResult<Event> {
        let invalid = |what: String| PortError::Unexpected(format!("Event {}: {}", self.id, what));

        let location = Coordinate::new(self.latitude, self.longitude)
            .map_err(|e| invalid(e.to_string()))?;
        // Postgres accepts 'NaN' and 'Infinity' in DOUBLE PRECISION columns.
        if !(self.radius_meters.is_finite() && self.radius_meters > 0.0) {
            return Err(invalid(format!("unusable radius {}", self.radius_meters)));
        }

        let schedule = match self.schedule_kind.as_str() {
            "one_time" => {
                let date = self
                    .event_date
                    .ok_or_else(|| invalid("one-time event without a date".to_string()))?;
                EventSchedule::one_time(date, self.start_time, self.end_time)
            }
            "recurring" => {
                let days = self
                    .days_of_week
                    .clone()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|d| u8::try_from(d).unwrap_or(u8::MAX));
                EventSchedule::recurring(days, self.start_time, self.end_time)
            }
            other => return Err(invalid(format!("unknown schedule kind '{}'", other))),
        }
        .map_err(|e| invalid(e.to_string()))?;

        let max_attendees = self
            .max_attendees
            .map(u32::try_from)
            .transpose()
            .map_err(|_| invalid("negative max_attendees".to_string()))?;

        Ok(Event {
            id: self.id,
            host_id: self.host_id,
            name: self.name,
            location,
            radius_meters: self.radius_meters,
            schedule,
            max_attendees,
            is_active: self.is_active,
            utc_offset_minutes: self.utc_offset_minutes,
        })
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: Uuid,
    event_id: String,
    user_id: Uuid,
    session_date: NaiveDate,
    checked_in_at: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    distance_meters: f64,
}

impl AttendanceRow {
    fn to_domain(self) -> PortResult<AttendanceRecord> {
        let position = Coordinate::new(self.latitude, self.longitude).map_err(|e| {
            PortError::Unexpected(format!("Attendance {}: {}", self.id, e))
        })?;
        Ok(AttendanceRecord {
            id: self.id,
            event_id: self.event_id,
            user_id: self.user_id,
            session_date: self.session_date,
            checked_in_at: self.checked_in_at,
            position,
            distance_meters: self.distance_meters,
        })
    }
}

//=========================================================================================
// `AttendanceStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AttendanceStore for DbAdapter {
    #[instrument(skip(self))]
    async fn get_event(&self, event_id: &str) -> PortResult<Event> {
        let record = sqlx::query_as::<_, EventRecord>(
            r#"
            SELECT id, host_id, name, latitude, longitude, radius_meters, schedule_kind,
                   event_date, days_of_week, start_time, end_time, max_attendees,
                   is_active, utc_offset_minutes
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Event {} not found", event_id)),
            other => {
                error!("Failed to load event: {}", other);
                port_error(other)
            }
        })?;

        record.to_domain()
    }

    #[instrument(skip(self, attendance), fields(event_id = %attendance.event_id, user_id = %attendance.user_id))]
    async fn insert_attendance_if_absent(
        &self,
        attendance: NewAttendance,
    ) -> PortResult<InsertOutcome> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            INSERT INTO attendance
                (id, event_id, user_id, session_date, checked_in_at, latitude, longitude, distance_meters)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT ON CONSTRAINT attendance_once_per_session DO NOTHING
            RETURNING id, event_id, user_id, session_date, checked_in_at,
                      latitude, longitude, distance_meters
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&attendance.event_id)
        .bind(attendance.user_id)
        .bind(attendance.session_date)
        .bind(attendance.checked_in_at)
        .bind(attendance.position.latitude())
        .bind(attendance.position.longitude())
        .bind(attendance.distance_meters)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to insert attendance: {}", e);
            port_error(e)
        })?;

        Ok(match row {
            Some(row) => InsertOutcome::Inserted(row.to_domain()?),
            None => InsertOutcome::AlreadyExists,
        })
    }

    #[instrument(skip(self))]
    async fn list_attendance(&self, event_id: &str) -> PortResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, event_id, user_id, session_date, checked_in_at,
                   latitude, longitude, distance_meters
            FROM attendance
            WHERE event_id = $1
            ORDER BY checked_in_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list attendance: {}", e);
            port_error(e)
        })?;

        rows.into_iter().map(AttendanceRow::to_domain).collect()
    }
}
