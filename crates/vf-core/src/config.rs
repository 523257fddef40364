//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the HTTP server, byte storage, the dispatch channel, the
//! worker pool and external tools. Every section defaults sensibly so a
//! completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub dispatch: DispatchConfig,
    pub workers: WorkerConfig,
    pub tools: ToolsConfig,
    pub upload: UploadConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.workers.slots == 0 {
            warnings.push("workers.slots is 0; no job will ever run".into());
        } else if self.workers.slots > num_cpus::get() {
            warnings.push(format!(
                "workers.slots ({}) exceeds available cores ({}); codec work will be oversubscribed",
                self.workers.slots,
                num_cpus::get()
            ));
        }

        if self.workers.job_timeout_secs == 0 {
            warnings.push("workers.job_timeout_secs is 0; every job will time out".into());
        }

        if self.dispatch.addr.parse::<std::net::SocketAddr>().is_err() {
            warnings.push(format!(
                "dispatch.addr '{}' is not a socket address",
                self.dispatch.addr
            ));
        }

        if self.upload.formats.is_empty() {
            warnings.push("upload.formats is empty; every upload will be rejected".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8060,
            static_dir: Some(PathBuf::from("./public")),
            db_path: PathBuf::from("./data/vidforge.db"),
        }
    }
}

/// Byte storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./storage"),
        }
    }
}

/// Dispatch channel between request-handling processes and the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Address the coordinator listens on and front-ends connect to.
    pub addr: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_ms: u64,
}

fn default_connect_timeout() -> u64 {
    2_000
}
fn default_ack_timeout() -> u64 {
    5_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8061".into(),
            connect_timeout_ms: default_connect_timeout(),
            ack_timeout_ms: default_ack_timeout(),
        }
    }
}

/// Worker pool sizing and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent execution slots.
    #[serde(default = "default_slots")]
    pub slots: usize,
    /// Upper bound for a single codec invocation.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,
}

fn default_slots() -> usize {
    // ffmpeg already multithreads a single encode
    (num_cpus::get() / 2).max(1)
}
fn default_job_timeout() -> u64 {
    30 * 60
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            slots: default_slots(),
            job_timeout_secs: default_job_timeout(),
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Upload acceptance rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Accepted container extensions, lowercase.
    pub formats: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            formats: vec!["mov".into(), "mp4".into()],
        }
    }
}

impl UploadConfig {
    pub fn accepts(&self, extension: &str) -> bool {
        self.formats.iter().any(|f| f.eq_ignore_ascii_case(extension))
    }
}
