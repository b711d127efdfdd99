//! Read-side statistics over one event's attendance snapshot.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::AttendanceRecord;

/// Distinct attendees for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCount {
    pub session_date: NaiveDate,
    pub attendees: usize,
}

/// Dashboard figures for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSummary {
    pub total_sessions: usize,
    pub unique_attendees: usize,
    pub peak_attendance: usize,
    pub average_attendance: usize,
    pub latest_session: Option<NaiveDate>,
    pub latest_session_attendees: usize,
    pub latest_session_rate: u32,
    pub sessions: Vec<SessionCount>,
}

pub struct AttendanceAggregator {
    records: Vec<AttendanceRecord>,
    by_session: BTreeMap<NaiveDate, BTreeSet<Uuid>>,
}

impl AttendanceAggregator {
    pub fn new(records: Vec<AttendanceRecord>) -> Self {
        let mut by_session: BTreeMap<NaiveDate, BTreeSet<Uuid>> = BTreeMap::new();
        for r in &records {
            by_session.entry(r.session_date).or_default().insert(r.user_id);
        }
        Self {
            records,
            by_session,
        }
    }

    pub fn total_attendees(&self, session_date: NaiveDate) -> usize {
        self.by_session.get(&session_date).map_or(0, BTreeSet::len)
    }

    /// Percentage of capacity used, rounded. 0 when there is no capacity.
    pub fn attendance_rate(&self, session_date: NaiveDate, max_attendees: Option<u32>) -> u32 {
        match max_attendees {
            Some(max) if max > 0 => {
                let total = self.total_attendees(session_date) as f64;
                (total / f64::from(max) * 100.0).round() as u32
            }
            _ => 0,
        }
    }

    pub fn peak_attendance(&self) -> usize {
        self.by_session.values().map(BTreeSet::len).max().unwrap_or(0)
    }

    pub fn average_attendance(&self) -> usize {
        if self.by_session.is_empty() {
            return 0;
        }
        let sum: usize = self.by_session.values().map(BTreeSet::len).sum();
        (sum as f64 / self.by_session.len() as f64).round() as usize
    }

    /// A user's records, newest first.
    pub fn user_history(&self, user_id: Uuid) -> Vec<AttendanceRecord> {
        let mut history: Vec<AttendanceRecord> = self
            .records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.checked_in_at.cmp(&a.checked_in_at));
        history
    }

    pub fn last_check_in(&self, user_id: Uuid) -> Option<AttendanceRecord> {
        self.user_history(user_id).into_iter().next()
    }

    pub fn session_dates(&self) -> Vec<NaiveDate> {
        self.by_session.keys().copied().collect()
    }

    pub fn session_breakdown(&self) -> Vec<SessionCount> {
        self.by_session
            .iter()
            .map(|(date, users)| SessionCount {
                session_date: *date,
                attendees: users.len(),
            })
            .collect()
    }

    pub fn unique_attendees(&self) -> usize {
        self.by_session
            .values()
            .flatten()
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn summary(&self, max_attendees: Option<u32>) -> EventSummary {
        let latest_session = self.by_session.keys().next_back().copied();
        let (latest_session_attendees, latest_session_rate) = match latest_session {
            Some(date) => (
                self.total_attendees(date),
                self.attendance_rate(date, max_attendees),
            ),
            None => (0, 0),
        };

        EventSummary {
            total_sessions: self.by_session.len(),
            unique_attendees: self.unique_attendees(),
            peak_attendance: self.peak_attendance(),
            average_attendance: self.average_attendance(),
            latest_session,
            latest_session_attendees,
            latest_session_rate,
            sessions: self.session_breakdown(),
        }
    }
}
