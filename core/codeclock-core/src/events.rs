//! Notifications from the timer engine to whatever renders them.
//!
//! The engine only knows [`EventSink`]; a desktop shell, a terminal UI or the
//! JSON-lines bridge in the `codeclock` binary implement it.
//!
//! Serialized form (one object per event, tagged by `event`):
//!
//! ```json
//! {"event":"update-totalTimer","seconds":5120}
//! {"event":"update-project-timer","projectPath":"/repo/a","seconds":5,
//!  "dailyTimes":{"2024-01-10":3,"2024-01-11":2},"twoWeeksTimes":5}
//! {"event":"launch-failed","projectPath":"/repo/a","message":"..."}
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::DailyTimes;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum TimerEvent {
    #[serde(rename = "update-totalTimer")]
    GlobalTimerUpdated { seconds: u64 },

    #[serde(rename = "update-project-timer", rename_all = "camelCase")]
    ProjectTimerUpdated {
        project_path: String,
        seconds: u64,
        daily_times: DailyTimes,
        #[serde(rename = "twoWeeksTimes")]
        recent_window_seconds: u64,
    },

    #[serde(rename = "launch-failed", rename_all = "camelCase")]
    LaunchFailed { project_path: String, message: String },
}

/// Receives engine notifications. Called from timer tasks; must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TimerEvent);
}

/// Forwards events into an unbounded Tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TimerEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: TimerEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Event receiver dropped, discarding timer event");
        }
    }
}
