//! Locating the ffmpeg and ffprobe executables.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use vf_core::config::ToolsConfig;
use vf_core::{Error, Result};

/// The external executables the codec depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::Ffmpeg, Tool::Ffprobe];

    pub fn binary_name(self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
        }
    }

    fn configured(self, config: &ToolsConfig) -> Option<&Path> {
        match self {
            Tool::Ffmpeg => config.ffmpeg_path.as_deref(),
            Tool::Ffprobe => config.ffprobe_path.as_deref(),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// Availability report for one tool, printed by `vidforge check-tools` and
/// logged at startup.
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub tool: Tool,
    pub path: Option<PathBuf>,
    /// First line of `-version` output.
    pub version: Option<String>,
}

impl ToolStatus {
    pub fn available(&self) -> bool {
        self.path.is_some()
    }
}

/// Resolved executable paths, built once per process.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    paths: HashMap<Tool, PathBuf>,
}

impl ToolRegistry {
    /// Resolve every [`Tool`]. An explicitly configured path wins when it
    /// exists; otherwise `PATH` is searched. Missing tools are left out and
    /// reported by [`require`](Self::require) at use.
    pub fn discover(config: &ToolsConfig) -> Self {
        let paths = Tool::ALL
            .into_iter()
            .filter_map(|tool| {
                let path = match tool.configured(config) {
                    Some(p) if p.exists() => Some(p.to_path_buf()),
                    Some(p) => {
                        tracing::warn!(%tool, path = %p.display(), "Configured tool path does not exist; searching PATH");
                        which::which(tool.binary_name()).ok()
                    }
                    None => which::which(tool.binary_name()).ok(),
                };
                path.map(|p| (tool, p))
            })
            .collect();
        Self { paths }
    }

    /// Path of `tool`, or a codec error naming it.
    pub fn require(&self, tool: Tool) -> Result<&Path> {
        self.paths
            .get(&tool)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::codec(tool.binary_name(), format!("{tool} not found; is it installed and in PATH?")))
    }

    /// Status of every tool, probing versions of the ones found.
    pub fn status(&self) -> Vec<ToolStatus> {
        Tool::ALL
            .into_iter()
            .map(|tool| {
                let path = self.paths.get(&tool).cloned();
                let version = path.as_deref().and_then(first_version_line);
                ToolStatus { tool, path, version }
            })
            .collect()
    }
}

fn first_version_line(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path).arg("-version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout).lines().next().map(str::to_owned)
}
