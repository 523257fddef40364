use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use vf_core::Result;

use super::protocol::{frame_codec, DispatchFrame};
use crate::queue::JobQueue;

/// Coordinator side of the dispatch channel.
///
/// Every accepted connection gets its own task. Frames on one connection are
/// handled strictly in order and each `Submit` is enqueued before its
/// `Accepted` reply is written.
#[derive(Debug)]
pub struct DispatchListener {
    listener: TcpListener,
    queue: Arc<JobQueue>,
}

impl DispatchListener {
    pub async fn bind(addr: &str, queue: Arc<JobQueue>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, queue })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "Dispatch listener started");
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let queue = Arc::clone(&self.queue);
                        let cancel = cancel.child_token();
                        tokio::spawn(serve_connection(stream, peer, queue, cancel));
                    }
                    Err(e) => tracing::warn!(error = %e, "Dispatch accept failed"),
                },
            }
        }

        tracing::info!("Dispatch listener stopped");
    }
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, queue: Arc<JobQueue>, cancel: CancellationToken) {
    let _ = stream.set_nodelay(true);
    let mut framed = Framed::new(stream, frame_codec());
    tracing::debug!(%peer, "Dispatch client connected");

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = framed.next() => next,
        };
        let bytes = match next {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                tracing::warn!(%peer, error = %e, "Dispatch read failed");
                break;
            }
            None => break,
        };

        let reply = match DispatchFrame::decode(&bytes) {
            Ok(DispatchFrame::Submit { job }) => {
                let job_id = job.id();
                tracing::info!(
                    job_id = %job_id,
                    video_id = %job.video_id(),
                    kind = %job.kind(),
                    %peer,
                    "Job received"
                );
                queue.enqueue(job);
                DispatchFrame::Accepted { job_id }
            }
            Ok(DispatchFrame::Ping) => DispatchFrame::Pong,
            Ok(other) => DispatchFrame::Rejected {
                job_id: None,
                reason: format!("unexpected frame: {other:?}"),
            },
            Err(e) => {
                tracing::warn!(%peer, error = %e, "Rejecting dispatch frame");
                DispatchFrame::Rejected {
                    job_id: None,
                    reason: e.to_string(),
                }
            }
        };

        let encoded = match reply.encode() {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(%peer, error = %e, "Failed to encode dispatch reply");
                break;
            }
        };
        if let Err(e) = framed.send(encoded).await {
            tracing::warn!(%peer, error = %e, "Dispatch write failed");
            break;
        }
    }

    tracing::debug!(%peer, "Dispatch client disconnected");
}
