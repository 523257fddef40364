use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use vf_core::config::DispatchConfig;
use vf_core::{Error, Result};

use super::protocol::{frame_codec, DispatchFrame};
use super::Dispatcher;
use crate::job::Job;

type Connection = Framed<TcpStream, LengthDelimitedCodec>;

/// Dispatcher for request-handling processes: forwards jobs to the
/// coordinator over TCP and waits for its acknowledgement.
///
/// A single connection is shared behind an async mutex, so jobs submitted by
/// one process reach the coordinator in submission order. After any failure
/// the connection is dropped and the next submit reconnects.
pub struct RemoteDispatcher {
    addr: String,
    connect_timeout: Duration,
    ack_timeout: Duration,
    conn: Mutex<Option<Connection>>,
}

impl std::fmt::Debug for RemoteDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteDispatcher")
            .field("addr", &self.addr)
            .field("connect_timeout", &self.connect_timeout)
            .field("ack_timeout", &self.ack_timeout)
            .finish()
    }
}

fn unavailable(message: impl Into<String>) -> Error {
    Error::DispatchUnavailable(message.into())
}

impl RemoteDispatcher {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration, ack_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
            ack_timeout,
            conn: Mutex::new(None),
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(
            config.addr.clone(),
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.ack_timeout_ms),
        )
    }

    async fn connect(&self) -> Result<Connection> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| unavailable(format!("connect to {} timed out", self.addr)))?
            .map_err(|e| unavailable(format!("connect to {}: {e}", self.addr)))?;
        stream.set_nodelay(true)?;
        tracing::debug!(addr = %self.addr, "Connected to coordinator");
        Ok(Framed::new(stream, frame_codec()))
    }

    /// Send `request` and hand the reply to `check`.
    ///
    /// The connection is taken out of the slot for the duration of the
    /// exchange and only put back once a reply has been checked. If this
    /// future is dropped between send and reply, the connection goes with it
    /// and an unread acknowledgement can never be read by a later submit.
    async fn round_trip<T>(
        &self,
        request: DispatchFrame,
        check: impl FnOnce(DispatchFrame) -> Result<T>,
    ) -> Result<T> {
        let bytes = request.encode()?;
        let mut guard = self.conn.lock().await;

        let mut conn = match guard.take() {
            Some(conn) => conn,
            None => self.connect().await?,
        };

        let result = match exchange(&mut conn, bytes, self.ack_timeout).await {
            Ok(reply) => check(reply),
            Err(e) => Err(e),
        };
        match &result {
            Ok(_) => *guard = Some(conn),
            Err(e) => tracing::warn!(addr = %self.addr, error = %e, "Dropping dispatch connection"),
        }
        result
    }
}

/// Write one frame and read the reply, bounded by `ack_timeout`.
async fn exchange(conn: &mut Connection, bytes: Bytes, ack_timeout: Duration) -> Result<DispatchFrame> {
    let io = async {
        conn.send(bytes).await?;
        match conn.next().await {
            Some(frame) => frame,
            None => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "coordinator closed the connection",
            )),
        }
    };

    let frame: BytesMut = tokio::time::timeout(ack_timeout, io)
        .await
        .map_err(|_| unavailable(format!("no acknowledgement within {ack_timeout:?}")))?
        .map_err(|e| unavailable(e.to_string()))?;

    DispatchFrame::decode(&frame)
}

#[async_trait]
impl Dispatcher for RemoteDispatcher {
    async fn submit(&self, job: Job) -> Result<()> {
        let job_id = job.id();
        let video_id = job.video_id().clone();

        self.round_trip(DispatchFrame::Submit { job }, |reply| match reply {
            DispatchFrame::Accepted { job_id: acked } if acked == job_id => Ok(()),
            DispatchFrame::Rejected { reason, .. } => {
                Err(Error::Internal(format!("coordinator rejected job {job_id}: {reason}")))
            }
            other => Err(unavailable(format!("unexpected reply to submit: {other:?}"))),
        })
        .await?;

        tracing::debug!(job_id = %job_id, video_id = %video_id, "Job handed to coordinator");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.round_trip(DispatchFrame::Ping, |reply| match reply {
            DispatchFrame::Pong => Ok(()),
            other => Err(unavailable(format!("unexpected reply to ping: {other:?}"))),
        })
        .await
    }
}
