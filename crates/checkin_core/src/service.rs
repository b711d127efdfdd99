//! crates/checkin_core/src/service.rs
//!
//! The end-to-end check-in flow: load the event, verify the attempt, record the
//! attendance. Also the host-side and reporting entry points that need the same
//! store and clock.

use std::sync::Arc;

use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::aggregator::AttendanceAggregator;
use crate::domain::{AttendanceRecord, Coordinate, Event, SessionKey};
use crate::error::CheckInError;
use crate::liveness;
use crate::ports::{AttendanceStore, Clock, PortError};
use crate::recorder::AttendanceRecorder;
use crate::token::{self, CheckInToken};
use crate::verifier::{self, Verdict};

/// A scanned token plus where the attendee claims to be.
#[derive(Debug, Clone)]
pub struct CheckInRequest {
    pub event_id: String,
    pub user_id: Uuid,
    pub token: String,
    pub position: Coordinate,
    /// Reported by the position source; logged, never used to reject.
    pub accuracy_meters: Option<f64>,
}

#[derive(Clone)]
pub struct CheckInService {
    store: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    recorder: AttendanceRecorder,
}

impl CheckInService {
    pub fn new(store: Arc<dyn AttendanceStore>, clock: Arc<dyn Clock>) -> Self {
        let recorder = AttendanceRecorder::new(store.clone());
        Self {
            store,
            clock,
            recorder,
        }
    }

    async fn load_event(&self, event_id: &str) -> Result<Event, CheckInError> {
        self.store.get_event(event_id).await.map_err(|e| match e {
            PortError::NotFound(_) => CheckInError::EventNotFound(event_id.to_string()),
            other => {
                error!("Failed to load event {}: {}", event_id, other);
                other.into()
            }
        })
    }

    /// Verifies a check-in attempt and records it on success.
    #[instrument(skip(self, request), fields(event_id = %request.event_id, user_id = %request.user_id))]
    pub async fn check_in(&self, request: CheckInRequest) -> Result<AttendanceRecord, CheckInError> {
        let event = self.load_event(&request.event_id).await?;
        let now = self.clock.now();

        debug!(accuracy_meters = ?request.accuracy_meters, "Verifying check-in");
        match verifier::verify(&request.token, request.position, &event, now) {
            Verdict::Accepted(verdict) => {
                let record = self
                    .recorder
                    .record(&verdict, request.user_id, now)
                    .await
                    .map_err(|e| {
                        let e = CheckInError::from(e);
                        if !e.is_user_facing() {
                            error!("Check-in could not be stored: {}", e);
                        }
                        e
                    })?;
                Ok(record)
            }
            Verdict::Rejected(reason) => {
                info!(?reason, "Check-in rejected");
                Err(reason.into())
            }
        }
    }

    /// Issues the token the host's display should show right now.
    #[instrument(skip(self))]
    pub async fn issue_token(
        &self,
        event_id: &str,
        host_id: Uuid,
    ) -> Result<CheckInToken, CheckInError> {
        let event = self.load_event(event_id).await?;
        if event.host_id != host_id {
            return Err(CheckInError::NotEventHost);
        }
        let token = CheckInToken::issue(
            event.id,
            token::generate_secret(),
            self.clock.now().timestamp_millis(),
        )?;
        Ok(token)
    }

    /// Whether the event is live now, with the session an attempt now would count towards.
    pub async fn liveness(&self, event_id: &str) -> Result<(bool, SessionKey), CheckInError> {
        let event = self.load_event(event_id).await?;
        let local_now = event.local_time(self.clock.now());
        let live = liveness::is_live(&event, &local_now);
        Ok((live, SessionKey::for_event(&event, local_now.date_naive())))
    }

    /// Loads the event together with an aggregator over its attendance.
    pub async fn statistics(
        &self,
        event_id: &str,
    ) -> Result<(Event, AttendanceAggregator), CheckInError> {
        let event = self.load_event(event_id).await?;
        let records = self.store.list_attendance(event_id).await.map_err(|e| {
            error!("Failed to list attendance for {}: {}", event_id, e);
            CheckInError::from(e)
        })?;
        Ok((event, AttendanceAggregator::new(records)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::EventSchedule;
    use crate::geo;
    use crate::memory::InMemoryAttendanceStore;
    use crate::token::FRESHNESS_WINDOW_MS;
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};

    fn venue() -> Coordinate {
        Coordinate::new(13.736, 100.523).unwrap()
    }

    fn host() -> Uuid {
        Uuid::from_u128(0x42)
    }

    fn setup() -> (CheckInService, Arc<InMemoryAttendanceStore>, Arc<FixedClock>) {
        let store = Arc::new(InMemoryAttendanceStore::new());
        store.put_event(Event {
            id: "evt1".into(),
            host_id: host(),
            name: "Morning lecture".into(),
            location: venue(),
            radius_meters: 50.0,
            schedule: EventSchedule::one_time(
                NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            )
            .unwrap(),
            max_attendees: Some(2),
            is_active: true,
            utc_offset_minutes: 0,
        });
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 10, 19, 9, 15, 0).unwrap(),
        ));
        let service = CheckInService::new(store.clone(), clock.clone());
        (service, store, clock)
    }

    fn request(token: String, user_id: Uuid, position: Coordinate) -> CheckInRequest {
        CheckInRequest {
            event_id: "evt1".into(),
            user_id,
            token,
            position,
            accuracy_meters: Some(8.0),
        }
    }

    #[tokio::test]
    async fn issued_token_checks_in_once_per_session() {
        let (service, store, clock) = setup();
        let user = Uuid::new_v4();
        let token = service.issue_token("evt1", host()).await.unwrap().encode();

        clock.advance(Duration::seconds(3));
        let here = geo::destination(venue(), 10.0, 30.0).unwrap();
        let record = service
            .check_in(request(token.clone(), user, here))
            .await
            .unwrap();
        assert!((record.distance_meters - 30.0).abs() < 1e-6);

        let again = service.check_in(request(token, user, here)).await;
        assert_eq!(again, Err(CheckInError::AlreadyCheckedIn));
        assert_eq!(store.attendance_count(), 1);
    }

    #[tokio::test]
    async fn stale_token_is_rejected_before_anything_is_stored() {
        let (service, store, clock) = setup();
        let token = service.issue_token("evt1", host()).await.unwrap().encode();

        clock.advance(Duration::milliseconds(FRESHNESS_WINDOW_MS + 1));
        let result = service
            .check_in(request(token, Uuid::new_v4(), venue()))
            .await;
        assert_eq!(result, Err(CheckInError::TokenExpired));
        assert_eq!(store.attendance_count(), 0);
    }

    #[tokio::test]
    async fn out_of_range_reports_distance() {
        let (service, _, _) = setup();
        let token = service.issue_token("evt1", host()).await.unwrap().encode();
        let far = geo::destination(venue(), 0.0, 80.0).unwrap();

        match service.check_in(request(token, Uuid::new_v4(), far)).await {
            Err(CheckInError::OutOfRange(d)) => assert_eq!(d.round(), 80.0),
            other => panic!("expected OutOfRange, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_event_and_outage_are_distinct() {
        let (service, store, _) = setup();
        assert_eq!(
            service.issue_token("nope", host()).await,
            Err(CheckInError::EventNotFound("nope".into()))
        );
        assert_eq!(
            service.issue_token("evt1", Uuid::new_v4()).await,
            Err(CheckInError::NotEventHost)
        );

        store.set_unavailable(true);
        assert!(matches!(
            service.liveness("evt1").await,
            Err(CheckInError::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn liveness_and_statistics_follow_the_clock() {
        let (service, _, clock) = setup();
        let (live, key) = service.liveness("evt1").await.unwrap();
        assert!(live);
        assert_eq!(key.session_date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());

        let token = service.issue_token("evt1", host()).await.unwrap().encode();
        service
            .check_in(request(token, Uuid::new_v4(), venue()))
            .await
            .unwrap();

        let (event, agg) = service.statistics("evt1").await.unwrap();
        assert_eq!(agg.attendance_rate(key.session_date, event.max_attendees), 50);

        clock.set(Utc.with_ymd_and_hms(2026, 10, 19, 10, 31, 0).unwrap());
        let (live, _) = service.liveness("evt1").await.unwrap();
        assert!(!live);
    }
}
