//! Persisted record types.
//!
//! Field names follow the JSON documents the launcher has always written
//! (`secondsTotal`, `dailyTimes`), so existing data files keep loading.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Calendar date (`YYYY-MM-DD`, local time) → seconds worked that day.
pub type DailyTimes = BTreeMap<String, u64>;

/// Project path → that project's record.
pub type ProjectRecords = BTreeMap<String, ProjectTimerRecord>;

/// Cumulative seconds the editor has been observed running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalTimerRecord {
    /// Older builds wrote `{"seconds": N}`.
    #[serde(rename = "secondsTotal", alias = "seconds", default)]
    pub seconds_total: u64,
}

impl GlobalTimerRecord {
    pub fn new(seconds_total: u64) -> Self {
        Self { seconds_total }
    }
}

/// Time tracked for a single project path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTimerRecord {
    #[serde(rename = "secondsTotal", default)]
    pub seconds_total: u64,
    #[serde(rename = "dailyTimes", default)]
    pub daily_times: DailyTimes,
}

impl ProjectTimerRecord {
    /// Adds one second to the total and to the bucket for `date_key`.
    pub fn record_second(&mut self, date_key: &str) {
        self.seconds_total += 1;
        *self.daily_times.entry(date_key.to_string()).or_insert(0) += 1;
    }

    /// Sum of all day buckets.
    pub fn bucket_sum(&self) -> u64 {
        self.daily_times.values().sum()
    }

    /// True when `seconds_total` matches the day buckets.
    pub fn is_consistent(&self) -> bool {
        self.seconds_total == self.bucket_sum()
    }
}
