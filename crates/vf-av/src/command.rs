//! Running one external tool invocation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use vf_core::{Error, Result};

/// Used when the caller sets no timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Bytes of stderr kept in a failure message.
const STDERR_TAIL: usize = 2_000;

/// A single ffmpeg/ffprobe run: program, arguments and a deadline.
///
/// The child is spawned with `kill_on_drop`, so it dies both when the
/// deadline passes and when the caller drops the future (for instance from
/// the job timeout in the executor).
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a file path argument without lossy conversion.
    pub fn path(&mut self, path: &Path) -> &mut Self {
        self.arg(path.as_os_str())
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Run to completion and return stdout.
    ///
    /// Spawn failures, non-zero exits (with the end of stderr) and the
    /// deadline all surface as [`Error::Codec`].
    pub async fn run(&self) -> Result<String> {
        let tool = self.tool_name();
        tracing::debug!(%tool, args = ?self.args, "Running tool");

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::codec(&tool, format!("failed to spawn: {e}")))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::codec(&tool, format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| Error::codec(&tool, format!("waiting for process: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::codec(
                tool,
                format!("exited with {}: {}", output.status, stderr_tail(stderr.trim())),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Last [`STDERR_TAIL`] bytes of `stderr`, cut on a char boundary.
fn stderr_tail(stderr: &str) -> &str {
    let mut start = stderr.len().saturating_sub(STDERR_TAIL);
    while !stderr.is_char_boundary(start) {
        start += 1;
    }
    &stderr[start..]
}
