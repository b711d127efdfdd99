//! In-memory implementation of [`AttendanceStore`].
//!
//! Provides the same insert-if-absent semantics as the PostgreSQL adapter: the
//! existence check and the insert happen under one write lock, so the
//! `(event_id, user_id, session_date)` triple is unique no matter how many
//! callers race.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::{AttendanceRecord, Event, NewAttendance};
use crate::ports::{AttendanceStore, InsertOutcome, PortError, PortResult};

type AttendanceKey = (String, Uuid, NaiveDate);

/// In-memory store, primarily for tests and local demos.
///
/// # Example
///
/// ```
/// use checkin_core::InMemoryAttendanceStore;
///
/// let store = InMemoryAttendanceStore::new();
/// assert_eq!(store.attendance_count(), 0);
/// ```
#[derive(Default)]
pub struct InMemoryAttendanceStore {
    events: RwLock<HashMap<String, Event>>,
    attendance: RwLock<HashMap<AttendanceKey, AttendanceRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an event.
    pub fn put_event(&self, event: Event) {
        self.events.write().insert(event.id.clone(), event);
    }

    /// Removes an event and, like the database cascade, all of its attendance.
    pub fn delete_event(&self, event_id: &str) {
        self.events.write().remove(event_id);
        self.attendance
            .write()
            .retain(|(id, _, _), _| id.as_str() != event_id);
    }

    pub fn attendance_count(&self) -> usize {
        self.attendance.read().len()
    }

    /// Simulates an outage: every call fails with [`PortError::Unavailable`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> PortResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(PortError::Unavailable("in-memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AttendanceStore for InMemoryAttendanceStore {
    async fn get_event(&self, event_id: &str) -> PortResult<Event> {
        self.check_available()?;
        self.events
            .read()
            .get(event_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Event {} not found", event_id)))
    }

    async fn insert_attendance_if_absent(
        &self,
        attendance: NewAttendance,
    ) -> PortResult<InsertOutcome> {
        self.check_available()?;
        let key = (
            attendance.event_id.clone(),
            attendance.user_id,
            attendance.session_date,
        );

        let mut rows = self.attendance.write();
        if rows.contains_key(&key) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        let record = attendance.into_record(Uuid::new_v4());
        rows.insert(key, record.clone());
        Ok(InsertOutcome::Inserted(record))
    }

    async fn list_attendance(&self, event_id: &str) -> PortResult<Vec<AttendanceRecord>> {
        self.check_available()?;
        let mut records: Vec<AttendanceRecord> = self
            .attendance
            .read()
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.checked_in_at);
        Ok(records)
    }
}
