//! crates/checkin_core/src/recorder.rs
//!
//! Turns an accepted verdict into at most one attendance record per
//! `(event, user, session)`. Uniqueness is delegated to the store's atomic
//! insert; this module never looks before it leaps and never retries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{AttendanceRecord, NewAttendance};
use crate::ports::{AttendanceStore, InsertOutcome, PortError};
use crate::verifier::AcceptedVerdict;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("Already checked in for this session")]
    AlreadyCheckedIn,
    /// The insert did not complete; the caller may retry the whole request.
    #[error("Attendance storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<PortError> for RecordError {
    fn from(e: PortError) -> Self {
        RecordError::StorageUnavailable(e.to_string())
    }
}

#[derive(Clone)]
pub struct AttendanceRecorder {
    store: Arc<dyn AttendanceStore>,
}

impl AttendanceRecorder {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        verdict: &AcceptedVerdict,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, RecordError> {
        let attendance = NewAttendance {
            event_id: verdict.event_id().to_string(),
            user_id,
            session_date: verdict.session_key().session_date,
            checked_in_at: now,
            position: verdict.position(),
            distance_meters: verdict.distance_meters(),
        };

        match self.store.insert_attendance_if_absent(attendance).await {
            Ok(InsertOutcome::Inserted(record)) => {
                info!(
                    event_id = %record.event_id,
                    %user_id,
                    session_date = %record.session_date,
                    distance_meters = record.distance_meters,
                    "Attendance recorded"
                );
                Ok(record)
            }
            Ok(InsertOutcome::AlreadyExists) => {
                info!(event_id = %verdict.event_id(), %user_id, "Duplicate check-in ignored");
                Err(RecordError::AlreadyCheckedIn)
            }
            Err(e) => {
                warn!(event_id = %verdict.event_id(), %user_id, "Attendance insert failed: {}", e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, Event, EventSchedule};
    use crate::memory::InMemoryAttendanceStore;
    use crate::verifier::{verify, Verdict};
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap()
    }

    fn event() -> Event {
        Event {
            id: "evt1".into(),
            host_id: Uuid::nil(),
            name: "Weekly seminar".into(),
            location: Coordinate::new(13.736, 100.523).unwrap(),
            radius_meters: 50.0,
            schedule: EventSchedule::recurring(
                [1, 3],
                NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            )
            .unwrap(),
            max_attendees: None,
            is_active: true,
            utc_offset_minutes: 0,
        }
    }

    fn accepted(at: DateTime<Utc>) -> AcceptedVerdict {
        let e = event();
        let raw = format!("CHECKIN-evt1-s-{}", at.timestamp_millis());
        match verify(&raw, e.location, &e, at) {
            Verdict::Accepted(v) => v,
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn first_check_in_is_recorded_and_second_is_a_duplicate() {
        let store = Arc::new(InMemoryAttendanceStore::new());
        let recorder = AttendanceRecorder::new(store.clone());
        let user = Uuid::new_v4();

        let record = recorder.record(&accepted(now()), user, now()).await.unwrap();
        assert_eq!(record.user_id, user);
        assert_eq!(record.session_date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(record.checked_in_at, now());
        assert_eq!(record.distance_meters, 0.0);

        // Same token still fresh: a duplicate, not a token error.
        let again = recorder.record(&accepted(now()), user, now()).await;
        assert_eq!(again, Err(RecordError::AlreadyCheckedIn));
        assert_eq!(store.list_attendance("evt1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn next_occurrence_of_a_recurring_event_is_a_new_session() {
        let store = Arc::new(InMemoryAttendanceStore::new());
        let recorder = AttendanceRecorder::new(store.clone());
        let user = Uuid::new_v4();

        let wednesday = Utc.with_ymd_and_hms(2026, 10, 21, 14, 30, 0).unwrap();
        recorder.record(&accepted(now()), user, now()).await.unwrap();
        recorder
            .record(&accepted(wednesday), user, wednesday)
            .await
            .unwrap();
        assert_eq!(store.attendance_count(), 2);
    }

    #[tokio::test]
    async fn storage_outage_is_not_a_duplicate() {
        let store = Arc::new(InMemoryAttendanceStore::new());
        let recorder = AttendanceRecorder::new(store.clone());
        store.set_unavailable(true);

        let result = recorder.record(&accepted(now()), Uuid::new_v4(), now()).await;
        assert!(matches!(result, Err(RecordError::StorageUnavailable(_))));

        store.set_unavailable(false);
        assert_eq!(store.attendance_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn simultaneous_accepted_attempts_record_once() {
        let store = Arc::new(InMemoryAttendanceStore::new());
        let recorder = AttendanceRecorder::new(store.clone());
        let user = Uuid::new_v4();
        let verdict = accepted(now());

        let attempts = (0..16).map(|_| {
            let recorder = recorder.clone();
            let verdict = verdict.clone();
            tokio::spawn(async move { recorder.record(&verdict, user, now()).await })
        });
        let results: Vec<_> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == RecordError::AlreadyCheckedIn));
        assert_eq!(store.attendance_count(), 1);
    }
}
