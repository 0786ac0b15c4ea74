//! JSON-lines bridge between the engine and a front end.
//!
//! Outbound: every [`TimerEvent`] is written as one JSON object per line.
//! Inbound: one request per line, e.g.
//! `{"request":"launch-project","path":"/repo/a"}`. Malformed lines are
//! logged and skipped.

use std::io::Write;
use std::sync::Mutex;

use codeclock_core::{EventSink, TimerEvent};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// Requests a front end can send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "request", rename_all = "kebab-case")]
pub enum BridgeRequest {
    LaunchProject { path: String },
}

/// Writes events as JSON lines to `W` (stdout in production).
pub struct JsonLineSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLineSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<W: Write + Send> EventSink for JsonLineSink<W> {
    fn emit(&self, event: TimerEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "Failed to serialize timer event");
                return;
            }
        };

        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(err) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            warn!(error = %err, "Failed to write timer event");
        }
    }
}

/// Parses one inbound line. Blank lines are ignored silently.
pub fn parse_request(line: &str) -> Option<BridgeRequest> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(request) => Some(request),
        Err(err) => {
            warn!(error = %err, line = %trimmed, "Ignoring malformed bridge request");
            None
        }
    }
}

/// Reads requests until EOF, handing each to `on_request`.
pub async fn serve_requests<R, F>(reader: R, mut on_request: F)
where
    R: AsyncBufRead + Unpin,
    F: FnMut(BridgeRequest),
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(request) = parse_request(&line) {
                    debug!(request = ?request, "Bridge request received");
                    on_request(request);
                }
            }
            Ok(None) => {
                debug!("Bridge input closed");
                break;
            }
            Err(err) => {
                warn!(error = %err, "Failed to read bridge input");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_json_object_per_line() {
        let sink = JsonLineSink::new(Vec::new());
        sink.emit(TimerEvent::GlobalTimerUpdated { seconds: 7 });
        sink.emit(TimerEvent::LaunchFailed {
            project_path: "/repo/a".to_string(),
            message: "boom".to_string(),
        });

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"event":"update-totalTimer","seconds":7}"#);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "launch-failed");
        assert_eq!(second["projectPath"], "/repo/a");
    }

    #[test]
    fn parses_launch_request() {
        assert_eq!(
            parse_request(r#"{"request":"launch-project","path":"/repo/a"}"#),
            Some(BridgeRequest::LaunchProject {
                path: "/repo/a".to_string()
            })
        );
    }

    #[test]
    fn rejects_malformed_requests() {
        assert_eq!(parse_request(""), None);
        assert_eq!(parse_request("   "), None);
        assert_eq!(parse_request("not json"), None);
        assert_eq!(parse_request(r#"{"request":"delete-everything"}"#), None);
        assert_eq!(parse_request(r#"{"request":"launch-project"}"#), None);
    }

    #[tokio::test]
    async fn serves_requests_until_eof() {
        let input = b"{\"request\":\"launch-project\",\"path\":\"/repo/a\"}\n\
garbage\n\
\n\
{\"request\":\"launch-project\",\"path\":\"/repo/b\"}\n";
        let mut seen = Vec::new();

        serve_requests(&input[..], |request| seen.push(request)).await;

        assert_eq!(
            seen,
            vec![
                BridgeRequest::LaunchProject {
                    path: "/repo/a".to_string()
                },
                BridgeRequest::LaunchProject {
                    path: "/repo/b".to_string()
                },
            ]
        );
    }
}
