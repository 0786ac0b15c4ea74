//! Opening projects in the editor.
//!
//! The editor's CLI is located once per launch (explicit config, then `PATH`,
//! then well-known install locations), spawned with the project path, and its
//! output is forwarded to the log. The caller gets an [`ExitWatch`] that
//! resolves when the CLI process exits.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::EditorConfig;
use crate::error::{ClockError, Result};

/// Exit notification of a launched editor process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorExit {
    /// `None` when the process was killed by a signal or could not be awaited.
    pub code: Option<i32>,
}

/// Resolves once the launched process exits.
pub type ExitWatch = oneshot::Receiver<EditorExit>;

/// Spawns the editor for a project path.
pub trait EditorLauncher: Send + Sync {
    fn launch(&self, project_path: &str) -> Result<ExitWatch>;
}

/// Finds the editor executable using the current `PATH`.
pub fn locate_editor(editor: &EditorConfig) -> Result<PathBuf> {
    locate_editor_in(editor, std::env::var_os("PATH"))
}

/// Finds the editor executable, searching `path_var` as if it were `PATH`.
pub fn locate_editor_in(editor: &EditorConfig, path_var: Option<OsString>) -> Result<PathBuf> {
    let mut searched = Vec::new();

    if let Some(command) = &editor.command {
        if command.is_file() {
            return Ok(command.clone());
        }
        searched.push(command.clone());
    }

    if !editor.binary.is_empty() {
        if let Some(path_var) = path_var {
            for dir in std::env::split_paths(&path_var) {
                let candidate = dir.join(&editor.binary);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }
        searched.push(PathBuf::from(format!("$PATH/{}", editor.binary)));
    }

    for fallback in &editor.fallback_paths {
        if fallback.is_file() {
            return Ok(fallback.clone());
        }
        searched.push(fallback.clone());
    }

    Err(ClockError::EditorNotFound { searched })
}

/// Launches the configured editor CLI as a child process.
#[derive(Debug, Clone)]
pub struct SystemEditorLauncher {
    editor: EditorConfig,
}

impl SystemEditorLauncher {
    pub fn new(editor: EditorConfig) -> Self {
        Self { editor }
    }
}

impl EditorLauncher for SystemEditorLauncher {
    fn launch(&self, project_path: &str) -> Result<ExitWatch> {
        let program = locate_editor(&self.editor)?;

        let mut command = Command::new(&program);
        command.arg(project_path);
        if self.editor.reuse_window {
            command.arg("--reuse-window");
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| ClockError::LaunchFailed {
            command: program.display().to_string(),
            source: e,
        })?;

        info!(
            editor = %program.display(),
            project = %project_path,
            pid = child.id(),
            "Opened project in editor"
        );

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, project_path.to_string(), false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, project_path.to_string(), true));
        }

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(err) => {
                    warn!(error = %err, "Failed to wait for editor process");
                    None
                }
            };
            let _ = tx.send(EditorExit { code });
        });

        Ok(rx)
    }
}

async fn forward_output<R>(stream: R, project: String, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if is_stderr => warn!(project = %project, "editor stderr: {}", line),
            Ok(Some(line)) => info!(project = %project, "editor stdout: {}", line),
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "Failed to read editor output");
                break;
            }
        }
    }
}
