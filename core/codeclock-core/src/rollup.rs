//! Rolling-window and summary arithmetic over day buckets.
//!
//! Everything here is pure: inputs are borrowed, nothing is persisted.

use chrono::{DateTime, Days, NaiveDate, TimeZone};
use serde::Serialize;

use crate::types::{DailyTimes, ProjectRecords, ProjectTimerRecord};

/// Number of calendar days in the rolling window, today included.
pub const ROLLING_WINDOW_DAYS: u64 = 14;

/// Day-bucket key format.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Formats a date as a day-bucket key (`YYYY-MM-DD`).
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Seconds recorded on the reference instant's calendar date and the 13 days
/// before it. The date is taken in the reference's own time zone, so pass
/// `Local::now()` for the user's local calendar.
pub fn recent_window_seconds<Tz: TimeZone>(daily: &DailyTimes, reference: &DateTime<Tz>) -> u64 {
    recent_window_seconds_on(daily, reference.date_naive())
}

/// Same as [`recent_window_seconds`] for an already-resolved date.
pub fn recent_window_seconds_on(daily: &DailyTimes, date: NaiveDate) -> u64 {
    (0..ROLLING_WINDOW_DAYS)
        .filter_map(|offset| date.checked_sub_days(Days::new(offset)))
        .map(|day| daily.get(&date_key(day)).copied().unwrap_or(0))
        .sum()
}

/// Today / rolling window / lifetime seconds for one project or an aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSummary {
    pub today: u64,
    pub recent_window: u64,
    pub total: u64,
}

impl TimeSummary {
    fn add(self, other: TimeSummary) -> TimeSummary {
        TimeSummary {
            today: self.today + other.today,
            recent_window: self.recent_window + other.recent_window,
            total: self.total + other.total,
        }
    }
}

/// Summarizes a single project record as of `date`.
pub fn summarize(record: &ProjectTimerRecord, date: NaiveDate) -> TimeSummary {
    TimeSummary {
        today: record.daily_times.get(&date_key(date)).copied().unwrap_or(0),
        recent_window: recent_window_seconds_on(&record.daily_times, date),
        total: record.seconds_total,
    }
}

/// Sums [`summarize`] over every project.
pub fn summarize_all(records: &ProjectRecords, date: NaiveDate) -> TimeSummary {
    records
        .values()
        .map(|record| summarize(record, date))
        .fold(TimeSummary::default(), TimeSummary::add)
}
