//! Decides whether an event's schedule covers a given instant.
//!
//! The instant is evaluated in whatever time zone it carries; callers convert to
//! the event's local time first (see [`Event::local_time`]). Windows are compared
//! at minute resolution, both ends inclusive.

use chrono::{DateTime, NaiveTime, TimeZone, Timelike};

use crate::domain::{weekday_index, Event, EventSchedule};

pub fn is_live<Tz: TimeZone>(event: &Event, now: &DateTime<Tz>) -> bool {
    if !event.is_active {
        return false;
    }

    let local = now.naive_local();
    let Some(minute) = NaiveTime::from_hms_opt(local.hour(), local.minute(), 0) else {
        return false;
    };

    match &event.schedule {
        EventSchedule::OneTime {
            date,
            start_time,
            end_time,
        } => local.date() == *date && within(minute, *start_time, *end_time),
        EventSchedule::Recurring {
            days_of_week,
            start_time,
            end_time,
        } => {
            days_of_week.contains(&weekday_index(&local.date()))
                && within(minute, *start_time, *end_time)
        }
    }
}

fn within(t: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    start <= t && t <= end
}
