pub mod aggregator;
pub mod clock;
pub mod domain;
pub mod error;
pub mod geo;
pub mod liveness;
pub mod memory;
pub mod ports;
pub mod recorder;
pub mod service;
pub mod token;
pub mod verifier;

pub use aggregator::{AttendanceAggregator, EventSummary, SessionCount};
pub use clock::{FixedClock, SystemClock};
pub use domain::{
    AttendanceRecord, Coordinate, CoordinateError, Event, EventSchedule, NewAttendance,
    ScheduleError, SessionKey,
};
pub use error::CheckInError;
pub use memory::InMemoryAttendanceStore;
pub use ports::{AttendanceStore, Clock, InsertOutcome, PortError, PortResult};
pub use recorder::{AttendanceRecorder, RecordError};
pub use service::{CheckInRequest, CheckInService};
pub use token::{CheckInToken, TokenError, FRESHNESS_WINDOW_MS, TOKEN_PREFIX};
pub use verifier::{AcceptedVerdict, RejectReason, Verdict};
