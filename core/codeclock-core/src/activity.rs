//! Editor activity detection.
//!
//! "Working" is approximated by process presence: the editor counts as active
//! while one of its processes is alive, and a project counts as open while an
//! editor process holds a file handle under the project path. This cannot tell
//! an idle window from active typing; it only needs to be cheap and robust.
//!
//! Two layers:
//!
//! - [`ActivityDetector`]: synchronous raw inspection that may fail.
//! - [`ActivityMonitor`]: what the timer engine calls. Runs the detector on a
//!   blocking thread with a timeout, and turns every failure into `false`.
//!
//! Nothing is cached; each call inspects the system again.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use sysinfo::{ProcessRefreshKind, System, UpdateKind};
use tracing::{debug, warn};

use crate::config::{ClockConfig, PathMatch};
use crate::error::{ClockError, Result};

/// Raw process inspection.
pub trait ActivityDetector: Send + Sync {
    /// Is any editor process alive?
    fn editor_running(&self) -> Result<bool>;

    /// Does any editor process hold a handle belonging to `project_path`?
    fn project_open(&self, project_path: &str) -> Result<bool>;
}

/// Process-table and `lsof` backed detector.
#[derive(Debug, Clone)]
pub struct SystemActivityDetector {
    process_names: Vec<String>,
    lsof: String,
    path_match: PathMatch,
}

impl SystemActivityDetector {
    pub fn new(process_names: Vec<String>, lsof: impl Into<String>, path_match: PathMatch) -> Self {
        Self {
            process_names,
            lsof: lsof.into(),
            path_match,
        }
    }

    pub fn from_config(config: &ClockConfig) -> Self {
        Self::new(
            config.editor.process_names.clone(),
            config.detection.lsof.clone(),
            config.detection.path_match,
        )
    }

    /// Editor PIDs, sorted. Never includes this process.
    fn editor_pids(&self) -> Vec<u32> {
        let own_pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes_specifics(
            ProcessRefreshKind::new().with_exe(UpdateKind::OnlyIfNotSet),
        );

        let mut pids: Vec<u32> = sys
            .processes()
            .iter()
            .map(|(pid, process)| (pid.as_u32(), process))
            .filter(|(pid, _)| *pid != own_pid)
            .filter(|(_, process)| {
                process_matches(process.name(), process.exe(), &self.process_names)
            })
            .map(|(pid, _)| pid)
            .collect();
        pids.sort_unstable();
        pids
    }
}

impl ActivityDetector for SystemActivityDetector {
    fn editor_running(&self) -> Result<bool> {
        Ok(!self.editor_pids().is_empty())
    }

    fn project_open(&self, project_path: &str) -> Result<bool> {
        let pids = self.editor_pids();
        if pids.is_empty() {
            return Ok(false);
        }

        let pid_list = pids
            .iter()
            .map(|pid| pid.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let output = Command::new(&self.lsof)
            .args(["-n", "-P", "-F", "n", "-p", &pid_list])
            .output()
            .map_err(|e| ClockError::CommandFailed {
                command: self.lsof.clone(),
                details: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() && stdout.trim().is_empty() {
            // lsof exits non-zero when none of the PIDs has anything to list.
            debug!(
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "lsof reported no handles"
            );
            return Ok(false);
        }

        let open = lsof_handle_names(&stdout)
            .any(|handle| self.path_match.matches(handle, project_path));
        Ok(open)
    }
}

/// True when the process name or the executable's file name equals one of
/// `names` (ASCII case-insensitive). Arguments are not looked at.
pub fn process_matches(name: &str, exe: Option<&Path>, names: &[String]) -> bool {
    let exe_name = exe
        .and_then(|path| path.file_name())
        .and_then(|file| file.to_str());

    names.iter().filter(|wanted| !wanted.is_empty()).any(|wanted| {
        name.eq_ignore_ascii_case(wanted)
            || exe_name.is_some_and(|file| file.eq_ignore_ascii_case(wanted))
    })
}

/// Handle names from `lsof -F n` output (lines starting with `n`).
pub fn lsof_handle_names(output: &str) -> impl Iterator<Item = &str> {
    output.lines().filter_map(|line| line.strip_prefix('n'))
}

/// Async, bounded, fail-to-false front for an [`ActivityDetector`].
#[derive(Clone)]
pub struct ActivityMonitor {
    detector: Arc<dyn ActivityDetector>,
    timeout: Duration,
}

impl ActivityMonitor {
    pub fn new(detector: Arc<dyn ActivityDetector>, timeout: Duration) -> Self {
        Self { detector, timeout }
    }

    pub async fn is_editor_running(&self) -> bool {
        self.probe("editor", |detector| detector.editor_running()).await
    }

    pub async fn is_project_open(&self, project_path: &str) -> bool {
        let path = project_path.to_string();
        self.probe("project", move |detector| detector.project_open(&path))
            .await
    }

    async fn probe<F>(&self, scope: &'static str, inspect: F) -> bool
    where
        F: FnOnce(&dyn ActivityDetector) -> Result<bool> + Send + 'static,
    {
        let detector = Arc::clone(&self.detector);
        let task = tokio::task::spawn_blocking(move || inspect(detector.as_ref()));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(active))) => active,
            Ok(Ok(Err(err))) => {
                debug!(error = %err, scope, "Activity probe failed, treating as inactive");
                false
            }
            Ok(Err(err)) => {
                warn!(error = %err, scope, "Activity probe task aborted, treating as inactive");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    scope,
                    "Activity probe timed out, treating as inactive"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        editor: Result<bool>,
        project: fn(&str) -> Result<bool>,
    }

    impl ActivityDetector for Fixed {
        fn editor_running(&self) -> Result<bool> {
            match &self.editor {
                Ok(value) => Ok(*value),
                Err(_) => Err(ClockError::CommandFailed {
                    command: "ps".to_string(),
                    details: "unavailable".to_string(),
                }),
            }
        }

        fn project_open(&self, project_path: &str) -> Result<bool> {
            (self.project)(project_path)
        }
    }

    struct Slow;

    impl ActivityDetector for Slow {
        fn editor_running(&self) -> Result<bool> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(true)
        }

        fn project_open(&self, _project_path: &str) -> Result<bool> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(true)
        }
    }

    struct Panicking;

    impl ActivityDetector for Panicking {
        fn editor_running(&self) -> Result<bool> {
            panic!("inspection blew up");
        }

        fn project_open(&self, _project_path: &str) -> Result<bool> {
            panic!("inspection blew up");
        }
    }

    fn monitor(detector: impl ActivityDetector + 'static) -> ActivityMonitor {
        ActivityMonitor::new(Arc::new(detector), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn passes_through_detector_answers() {
        let monitor = monitor(Fixed {
            editor: Ok(true),
            project: |path| Ok(path == "/repo/a"),
        });

        assert!(monitor.is_editor_running().await);
        assert!(monitor.is_project_open("/repo/a").await);
        assert!(!monitor.is_project_open("/repo/b").await);
    }

    #[tokio::test]
    async fn detector_error_is_false() {
        let monitor = monitor(Fixed {
            editor: Err(ClockError::StorageUnavailable),
            project: |_| {
                Err(ClockError::CommandFailed {
                    command: "lsof".to_string(),
                    details: "not found".to_string(),
                })
            },
        });

        assert!(!monitor.is_editor_running().await);
        assert!(!monitor.is_project_open("/repo/a").await);
    }

    #[tokio::test]
    async fn timeout_is_false() {
        let monitor = ActivityMonitor::new(Arc::new(Slow), Duration::from_millis(20));

        assert!(!monitor.is_editor_running().await);
        assert!(!monitor.is_project_open("/repo/a").await);
    }

    #[tokio::test]
    async fn panic_is_false() {
        let monitor = monitor(Panicking);

        assert!(!monitor.is_editor_running().await);
    }

    #[test]
    fn process_matching_is_exact_on_name_or_exe() {
        let names = vec!["code".to_string(), "Code Helper".to_string()];

        assert!(process_matches("Code", None, &names));
        assert!(process_matches("code helper", None, &names));
        assert!(process_matches(
            "electron-wrapper",
            Some(Path::new("/usr/share/code/code")),
            &names
        ));
        assert!(!process_matches("codeclock", None, &names));
        assert!(!process_matches("vscode-server", None, &names));
        assert!(!process_matches(
            "bash",
            Some(Path::new("/home/me/code/bin/bash")),
            &names
        ));
        assert!(!process_matches("code", None, &["".to_string()]));
    }

    #[test]
    fn parses_lsof_field_output() {
        let output = "p4242\nfcwd\nn/repo/a\nftxt\nn/usr/share/code/code\np4243\nf12\nn/repo/a/src/lib.rs\n";
        let names: Vec<&str> = lsof_handle_names(output).collect();
        assert_eq!(
            names,
            vec!["/repo/a", "/usr/share/code/code", "/repo/a/src/lib.rs"]
        );
    }

    fn own_process_name() -> String {
        let exe = std::env::current_exe().unwrap();
        exe.file_name().unwrap().to_string_lossy().into_owned()
    }

    #[test]
    fn default_config_never_reports_this_process() {
        let detector = SystemActivityDetector::from_config(&ClockConfig::default());

        assert!(!detector.editor_pids().contains(&std::process::id()));
    }

    #[test]
    fn own_process_is_excluded_even_when_named() {
        let detector =
            SystemActivityDetector::new(vec![own_process_name()], "lsof", PathMatch::Boundary);

        assert!(!detector.editor_pids().contains(&std::process::id()));
    }

    #[cfg(unix)]
    #[test]
    fn missing_lsof_is_a_command_failure() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        let detector = SystemActivityDetector::new(
            vec!["sleep".to_string()],
            "/definitely/not/lsof",
            PathMatch::Boundary,
        );

        let pids = detector.editor_pids();
        let result = detector.project_open("/repo/a");
        child.kill().unwrap();
        let _ = child.wait();

        assert!(pids.contains(&child.id()));
        assert!(matches!(result, Err(ClockError::CommandFailed { .. })));
    }

    #[test]
    fn empty_process_names_match_nothing() {
        let detector = SystemActivityDetector::new(vec![], "lsof", PathMatch::Boundary);
        assert!(!detector.editor_running().unwrap());
    }

    #[test]
    fn unknown_editor_is_not_running() {
        let detector = SystemActivityDetector::new(
            vec!["no-such-editor-process-name-1f3a9".to_string()],
            "lsof",
            PathMatch::Boundary,
        );
        assert!(!detector.editor_running().unwrap());
        assert!(!detector.project_open("/repo/a").unwrap());
    }
}
