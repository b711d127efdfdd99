//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use checkin_core::ports::{AttendanceStore, Clock};
use checkin_core::CheckInService;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub checkins: CheckInService,
}

impl AppState {
    pub fn new(store: Arc<dyn AttendanceStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            checkins: CheckInService::new(store, clock),
        }
    }
}
