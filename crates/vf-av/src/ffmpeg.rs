//! [`MediaCodec`] backed by the ffmpeg and ffprobe executables.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use vf_core::{Dimensions, Error, Result};

use crate::codec::MediaCodec;
use crate::command::ToolCommand;
use crate::tools::{Tool, ToolRegistry};

/// Runs ffmpeg/ffprobe as child processes.
///
/// Each invocation is a separate OS process, so concurrent calls from
/// different worker slots transcode in parallel.
#[derive(Debug, Clone)]
pub struct FfmpegCodec {
    tools: Arc<ToolRegistry>,
    timeout: Duration,
}

impl FfmpegCodec {
    pub fn new(tools: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self { tools, timeout }
    }

    fn command(&self, tool: Tool) -> Result<ToolCommand> {
        let mut cmd = ToolCommand::new(self.tools.require(tool)?);
        cmd.timeout(self.timeout);
        Ok(cmd)
    }

    /// `ffmpeg -y -v error -i <input>`, ready for output options.
    fn ffmpeg_from(&self, input: &Path) -> Result<ToolCommand> {
        let mut cmd = self.command(Tool::Ffmpeg)?;
        cmd.args(["-y", "-v", "error", "-i"]).path(input);
        Ok(cmd)
    }

    /// Probe the width and height of the first video stream.
    pub async fn probe_dimensions(&self, input: &Path) -> Result<Dimensions> {
        let mut cmd = self.command(Tool::Ffprobe)?;
        cmd.args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "json",
        ]);
        cmd.path(input);
        parse_dimensions(&cmd.run().await?)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Parse `ffprobe -show_entries stream=width,height -of json` output.
fn parse_dimensions(json: &str) -> Result<Dimensions> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| Error::codec("ffprobe", format!("unparseable output: {e}")))?;

    probe
        .streams
        .into_iter()
        .find_map(|s| match (s.width, s.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(Dimensions::new(w, h)),
            _ => None,
        })
        .ok_or_else(|| Error::codec("ffprobe", "no video stream with dimensions"))
}

#[async_trait]
impl MediaCodec for FfmpegCodec {
    async fn thumbnail_and_dimensions(&self, input: &Path, thumbnail_out: &Path) -> Result<Dimensions> {
        tracing::debug!(input = %input.display(), "Generating thumbnail");

        self.ffmpeg_from(input)?
            .args(["-vf", "thumbnail", "-frames:v", "1", "-f", "image2"])
            .path(thumbnail_out)
            .run()
            .await?;

        self.probe_dimensions(input).await
    }

    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<()> {
        tracing::debug!(input = %input.display(), "Extracting audio");

        self.ffmpeg_from(input)?
            .args(["-vn", "-c:a", "copy", "-f", "adts"])
            .path(output)
            .run()
            .await?;
        Ok(())
    }

    async fn resize(&self, input: &Path, output: &Path, dimensions: Dimensions) -> Result<()> {
        tracing::debug!(input = %input.display(), %dimensions, "Resizing");

        let scale = format!("scale={}:{}", dimensions.width, dimensions.height);
        self.ffmpeg_from(input)?
            .args(["-vf", scale.as_str(), "-c:v", "libx264", "-c:a", "copy"])
            .path(output)
            .run()
            .await?;
        Ok(())
    }
}
