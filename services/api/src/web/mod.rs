pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

pub use middleware::require_user;
pub use rest::{
    check_in_handler, issue_token_handler, liveness_handler, my_attendance_handler,
    summary_handler,
};

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use state::AppState;
use std::sync::Arc;

/// Builds the API routes (extracted from the binary so tests can drive it).
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no caller identity needed)
    let public_routes = Router::new()
        .route("/events/{event_id}/live", get(liveness_handler))
        .route("/events/{event_id}/summary", get(summary_handler));

    // Routes that act on behalf of a user
    let identified_routes = Router::new()
        .route("/events/{event_id}/token", get(issue_token_handler))
        .route("/events/{event_id}/check-ins", post(check_in_handler))
        .route("/events/{event_id}/attendance/me", get(my_attendance_handler))
        .layer(axum_middleware::from_fn(require_user));

    Router::new()
        .merge(public_routes)
        .merge(identified_routes)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
    use checkin_core::geo;
    use checkin_core::{Coordinate, Event, EventSchedule, FixedClock, InMemoryAttendanceStore};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    const HOST: Uuid = Uuid::from_u128(0x4057);

    fn venue() -> Coordinate {
        Coordinate::new(13.736, 100.523).unwrap()
    }

    struct Harness {
        app: Router,
        store: Arc<InMemoryAttendanceStore>,
        clock: Arc<FixedClock>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryAttendanceStore::new());
        store.put_event(Event {
            id: "evt1".into(),
            host_id: HOST,
            name: "Weekly seminar".into(),
            location: venue(),
            radius_meters: 50.0,
            schedule: EventSchedule::recurring(
                [1, 3],
                NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            )
            .unwrap(),
            max_attendees: Some(4),
            is_active: true,
            utc_offset_minutes: 0,
        });
        // Monday 2026-10-19, inside the window.
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap(),
        ));
        let state = Arc::new(AppState::new(store.clone(), clock.clone()));
        Harness {
            app: router(state),
            store,
            clock,
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_as(uri: &str, user: Uuid) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-user-id", user.to_string())
            .body(Body::empty())
            .unwrap()
    }

    fn check_in(user: Uuid, token: &str, position: Coordinate) -> Request<Body> {
        check_in_at(user, token, position.latitude(), position.longitude())
    }

    fn check_in_at(user: Uuid, token: &str, latitude: f64, longitude: f64) -> Request<Body> {
        let body = json!({
            "token": token,
            "latitude": latitude,
            "longitude": longitude,
            "accuracy_meters": 5.0,
        });
        Request::builder()
            .method("POST")
            .uri("/events/evt1/check-ins")
            .header("x-user-id", user.to_string())
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn fresh_token(app: &Router) -> String {
        let (status, body) = send(app, get_as("/events/evt1/token", HOST)).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn check_in_flow_records_once() {
        let h = harness();
        let attendee = Uuid::new_v4();
        let token = fresh_token(&h.app).await;
        let here = geo::destination(venue(), 0.0, 30.0).unwrap();

        let (status, body) = send(&h.app, check_in(attendee, &token, here)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["session_date"], "2026-10-19");
        assert_eq!(body["user_id"], attendee.to_string());

        let (status, body) = send(&h.app, check_in(attendee, &token, here)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "already_checked_in");
        assert_eq!(h.store.attendance_count(), 1);
    }

    #[tokio::test]
    async fn rejections_carry_stable_codes() {
        let h = harness();
        let attendee = Uuid::new_v4();
        let token = fresh_token(&h.app).await;

        let far = geo::destination(venue(), 90.0, 80.0).unwrap();
        let (status, body) = send(&h.app, check_in(attendee, &token, far)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "out_of_range");
        assert_eq!(body["distance_meters"].as_f64().unwrap().round(), 80.0);

        let (status, body) = send(&h.app, check_in(attendee, "CHECKIN-onlytwoparts", venue())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "token_malformed");

        h.clock.advance(Duration::milliseconds(10_001));
        let (status, body) = send(&h.app, check_in(attendee, &token, venue())).await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body["error"], "token_expired");
        assert_eq!(h.store.attendance_count(), 0);
    }

    #[tokio::test]
    async fn only_the_host_gets_tokens_and_identity_is_required() {
        let h = harness();
        let (status, body) = send(&h.app, get_as("/events/evt1/token", Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "not_event_host");

        let anonymous = Request::builder()
            .uri("/events/evt1/token")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&h.app, anonymous).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&h.app, get_as("/events/nope/token", HOST)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "event_not_found");
    }

    #[tokio::test]
    async fn invalid_coordinates_are_a_bad_request() {
        let h = harness();
        let token = fresh_token(&h.app).await;
        let (status, body) = send(&h.app, check_in_at(Uuid::new_v4(), &token, 123.0, 0.0)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }

    #[tokio::test]
    async fn liveness_tracks_the_clock() {
        let h = harness();
        let uri = "/events/evt1/live";
        let request = || Request::builder().uri(uri).body(Body::empty()).unwrap();

        let (status, body) = send(&h.app, request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["live"], true);

        // Tuesday
        h.clock.set(Utc.with_ymd_and_hms(2026, 10, 20, 14, 30, 0).unwrap());
        let (_, body) = send(&h.app, request()).await;
        assert_eq!(body["live"], false);
        assert_eq!(body["session_date"], "2026-10-20");
    }

    #[tokio::test]
    async fn summary_and_history_reflect_recorded_sessions() {
        let h = harness();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        for user in [alice, bob] {
            let token = fresh_token(&h.app).await;
            let (status, _) = send(&h.app, check_in(user, &token, venue())).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        // Wednesday session, Alice only.
        h.clock.set(Utc.with_ymd_and_hms(2026, 10, 21, 14, 5, 0).unwrap());
        let token = fresh_token(&h.app).await;
        send(&h.app, check_in(alice, &token, venue())).await;

        let summary = Request::builder()
            .uri("/events/evt1/summary")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&h.app, summary).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_sessions"], 2);
        assert_eq!(body["peak_attendance"], 2);
        assert_eq!(body["unique_attendees"], 2);
        assert_eq!(body["latest_session_attendees"], 1);
        assert_eq!(body["latest_session_rate"], 25);

        let (status, body) = send(&h.app, get_as("/events/evt1/attendance/me", alice)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["history"].as_array().unwrap().len(), 2);
        let wednesday = NaiveDate::from_ymd_opt(2026, 10, 21).unwrap().to_string();
        assert_eq!(body["last_check_in"]["session_date"], wednesday.as_str());
    }

    #[tokio::test]
    async fn storage_outage_is_service_unavailable() {
        let h = harness();
        let token = fresh_token(&h.app).await;
        h.store.set_unavailable(true);

        let (status, body) = send(&h.app, check_in(Uuid::new_v4(), &token, venue())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "storage_unavailable");
    }
}
