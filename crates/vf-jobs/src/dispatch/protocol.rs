//! Wire format between request-handling processes and the coordinator.
//!
//! Each frame is one JSON document inside a length-delimited frame
//! ([`LengthDelimitedCodec`](tokio_util::codec::LengthDelimitedCodec): a
//! 4-byte big-endian length prefix).

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::codec::LengthDelimitedCodec;
use vf_core::{Error, JobId, Result};

use crate::job::Job;

/// Largest frame either side will accept.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Framing used on both ends of a dispatch connection.
pub fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LEN)
        .new_codec()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchFrame {
    /// Client → coordinator: enqueue this job.
    Submit { job: Job },
    /// Coordinator → client: the job is queued.
    Accepted { job_id: JobId },
    /// Coordinator → client: the previous frame was not acted on.
    Rejected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job_id: Option<JobId>,
        reason: String,
    },
    Ping,
    Pong,
}

impl DispatchFrame {
    pub fn encode(&self) -> Result<Bytes> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| Error::Internal(format!("encode dispatch frame: {e}")))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Validation(format!("malformed dispatch frame: {e}")))
    }
}
