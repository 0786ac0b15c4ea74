//! User configuration (`config.toml` in the data directory).
//!
//! Every field has a default, so a missing file and an empty file both give
//! the stock setup: Visual Studio Code's `code` CLI, 1-second ticks, 2-second
//! probe timeout, 5-second exit grace and path-boundary matching.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClockError, Result};

/// How an open handle is matched against a project path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMatch {
    /// Handle equals the path or lies beneath it (`/repo/a` never matches `/repo/ab`).
    #[default]
    Boundary,
    /// Handle contains the path anywhere.
    Substring,
}

impl PathMatch {
    /// Returns true when `handle` belongs to `project_path` under this mode.
    pub fn matches(self, handle: &str, project_path: &str) -> bool {
        let project = normalize_path(project_path);
        if project.is_empty() {
            return false;
        }
        match self {
            PathMatch::Substring => handle.contains(project),
            PathMatch::Boundary => {
                if project == "/" {
                    return handle.starts_with('/');
                }
                match handle.strip_prefix(project) {
                    Some(rest) => rest.is_empty() || rest.starts_with('/'),
                    None => false,
                }
            }
        }
    }
}

/// Strips trailing slashes (except for root "/").
fn normalize_path(path: &str) -> &str {
    if path == "/" {
        path
    } else {
        path.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Process or executable names that count as the editor. Compared whole,
    /// ignoring ASCII case.
    pub process_names: Vec<String>,
    /// Executable name searched on `PATH`.
    pub binary: String,
    /// Explicit executable, tried before `PATH`.
    pub command: Option<PathBuf>,
    /// Pass `--reuse-window` when launching.
    pub reuse_window: bool,
    /// Locations tried after `PATH`.
    pub fallback_paths: Vec<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            process_names: [
                "code",
                "code-oss",
                "Code Helper",
                "Code Helper (Renderer)",
                "Code Helper (Plugin)",
                "Electron",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
            binary: "code".to_string(),
            command: None,
            reuse_window: true,
            fallback_paths: vec![
                PathBuf::from("/usr/local/bin/code"),
                PathBuf::from("/opt/homebrew/bin/code"),
                PathBuf::from("/Applications/Visual Studio Code.app/Contents/Resources/app/bin/code"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub path_match: PathMatch,
    /// `lsof` executable used to list open handles.
    pub lsof: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            path_match: PathMatch::Boundary,
            lsof: "lsof".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub tick_interval_ms: u64,
    pub probe_timeout_ms: u64,
    /// Wait after the editor CLI exits before checking whether the project is
    /// still open.
    pub exit_grace_ms: u64,
    pub editor: EditorConfig,
    pub detection: DetectionConfig,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            probe_timeout_ms: 2000,
            exit_grace_ms: 5000,
            editor: EditorConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

impl ClockConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.max(1))
    }

    pub fn exit_grace(&self) -> Duration {
        Duration::from_millis(self.exit_grace_ms)
    }

    /// Loads the config file, returning defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs_err::read_to_string(path).map_err(|e| ClockError::Io {
            context: format!("Failed to read config {}", path.display()),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ClockError::ConfigMalformed {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }

    /// Renders the config as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ClockError::ConfigMalformed {
            path: PathBuf::new(),
            details: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_file_missing() {
        let temp = TempDir::new().unwrap();
        let config = ClockConfig::load(&temp.path().join("missing.toml")).unwrap();
        assert_eq!(config, ClockConfig::default());
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.probe_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn empty_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs_err::write(&path, "").unwrap();

        assert_eq!(ClockConfig::load(&path).unwrap(), ClockConfig::default());
    }

    #[test]
    fn parses_partial_overrides() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs_err::write(
            &path,
            r#"
probe_timeout_ms = 500

[editor]
process_names = ["Visual Studio Code"]
command = "/opt/code/bin/code"

[detection]
path_match = "substring"
"#,
        )
        .unwrap();

        let config = ClockConfig::load(&path).unwrap();

        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.probe_timeout_ms, 500);
        assert_eq!(config.editor.process_names, vec!["Visual Studio Code".to_string()]);
        assert_eq!(config.exit_grace(), Duration::from_secs(5));
        assert_eq!(config.editor.binary, "code");
        assert_eq!(config.editor.command, Some(PathBuf::from("/opt/code/bin/code")));
        assert!(config.editor.reuse_window);
        assert_eq!(config.detection.path_match, PathMatch::Substring);
        assert_eq!(config.detection.lsof, "lsof");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs_err::write(&path, "tick_interval_ms = \"fast\"").unwrap();

        let err = ClockConfig::load(&path).unwrap_err();
        assert!(matches!(err, ClockError::ConfigMalformed { .. }));
    }

    #[test]
    fn zero_durations_are_clamped() {
        let config = ClockConfig {
            tick_interval_ms: 0,
            probe_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(1));
        assert_eq!(config.probe_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn rendered_toml_loads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs_err::write(&path, ClockConfig::default().to_toml().unwrap()).unwrap();

        assert_eq!(ClockConfig::load(&path).unwrap(), ClockConfig::default());
    }

    #[test]
    fn boundary_match_respects_path_segments() {
        let mode = PathMatch::Boundary;
        assert!(mode.matches("/repo/a", "/repo/a"));
        assert!(mode.matches("/repo/a/src/main.rs", "/repo/a"));
        assert!(mode.matches("/repo/a/src/main.rs", "/repo/a/"));
        assert!(!mode.matches("/repo/ab/src/main.rs", "/repo/a"));
        assert!(!mode.matches("/other/repo/a", "/repo/a"));
    }

    #[test]
    fn substring_match_accepts_any_containment() {
        let mode = PathMatch::Substring;
        assert!(mode.matches("/repo/ab/src/main.rs", "/repo/a"));
        assert!(mode.matches("/mnt/repo/a", "/repo/a"));
        assert!(!mode.matches("/repo/b", "/repo/a"));
    }

    #[test]
    fn empty_project_path_never_matches() {
        assert!(!PathMatch::Boundary.matches("/repo/a", ""));
        assert!(!PathMatch::Substring.matches("/repo/a", ""));
    }
}
