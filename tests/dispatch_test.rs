//! Dispatch channel tests over real TCP sockets.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use common::unused_addr;
use vf_core::{Error, ResizeKey, VideoId};
use vf_jobs::dispatch::protocol::{frame_codec, DispatchFrame};
use vf_jobs::{DispatchListener, Dispatcher, Job, JobQueue, RemoteDispatcher};

struct Coordinator {
    queue: Arc<JobQueue>,
    addr: String,
    cancel: CancellationToken,
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn listen() -> Coordinator {
    let queue = Arc::new(JobQueue::new());
    let listener = DispatchListener::bind("127.0.0.1:0", Arc::clone(&queue)).await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let cancel = CancellationToken::new();
    tokio::spawn(listener.run(cancel.clone()));
    Coordinator { queue, addr, cancel }
}

fn dispatcher(addr: &str) -> RemoteDispatcher {
    RemoteDispatcher::new(addr, Duration::from_millis(500), Duration::from_secs(1))
}

fn resize_job(width: u32) -> Job {
    Job::resize(VideoId::new(), "mp4", ResizeKey::new(width, 240).unwrap())
}

#[tokio::test]
async fn submitted_jobs_arrive_in_order() {
    let coordinator = listen().await;
    let remote = dispatcher(&coordinator.addr);

    let jobs: Vec<Job> = (0..5).map(|i| resize_job(320 + i * 2)).collect();
    for job in &jobs {
        remote.submit(job.clone()).await.unwrap();
    }

    // Accepted is only sent after the enqueue.
    assert_eq!(coordinator.queue.len(), jobs.len());
    for job in &jobs {
        assert_eq!(coordinator.queue.try_dequeue().as_ref(), Some(job));
    }
}

#[tokio::test]
async fn concurrent_submitters_share_one_listener() {
    let coordinator = listen().await;

    let mut handles = Vec::new();
    for i in 0..4u32 {
        let addr = coordinator.addr.clone();
        handles.push(tokio::spawn(async move {
            let remote = dispatcher(&addr);
            for j in 0..5u32 {
                remote.submit(resize_job(320 + (i * 5 + j) * 2)).await.unwrap();
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(coordinator.queue.len(), 20);
}

#[tokio::test]
async fn no_listener_is_unavailable() {
    let remote = dispatcher(&unused_addr().await);

    assert_matches!(remote.submit(resize_job(640)).await, Err(Error::DispatchUnavailable(_)));
    assert_matches!(remote.ping().await, Err(Error::DispatchUnavailable(_)));
}

#[tokio::test]
async fn reconnects_after_coordinator_restart() {
    let coordinator = listen().await;
    let addr = coordinator.addr.clone();
    let remote = dispatcher(&addr);
    remote.ping().await.unwrap();

    drop(coordinator);
    // The old connection is dead; the first attempt fails and drops it.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let queue = Arc::new(JobQueue::new());
    let listener = match DispatchListener::bind(&addr, Arc::clone(&queue)).await {
        Ok(l) => l,
        // Port taken by another test in the meantime; nothing to check.
        Err(_) => return,
    };
    let cancel = CancellationToken::new();
    tokio::spawn(listener.run(cancel.clone()));

    let mut delivered = false;
    for _ in 0..3 {
        if remote.submit(resize_job(640)).await.is_ok() {
            delivered = true;
            break;
        }
    }
    cancel.cancel();

    assert!(delivered);
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn silent_peer_times_out() {
    // Accepts the connection but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let _hold = tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let remote = RemoteDispatcher::new(&addr, Duration::from_millis(500), Duration::from_millis(200));
    let started = std::time::Instant::now();
    assert_matches!(remote.submit(resize_job(640)).await, Err(Error::DispatchUnavailable(_)));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn malformed_frames_are_rejected_without_closing() {
    let coordinator = listen().await;
    let stream = TcpStream::connect(&coordinator.addr).await.unwrap();
    let mut framed = Framed::new(stream, frame_codec());

    framed.send(Bytes::from_static(b"{\"type\":\"submit\"}")).await.unwrap();
    let reply = DispatchFrame::decode(&framed.next().await.unwrap().unwrap()).unwrap();
    assert_matches!(reply, DispatchFrame::Rejected { job_id: None, .. });

    framed.send(DispatchFrame::Pong.encode().unwrap()).await.unwrap();
    let reply = DispatchFrame::decode(&framed.next().await.unwrap().unwrap()).unwrap();
    assert_matches!(reply, DispatchFrame::Rejected { .. });

    // The connection is still usable.
    let job = resize_job(640);
    framed
        .send(DispatchFrame::Submit { job: job.clone() }.encode().unwrap())
        .await
        .unwrap();
    let reply = DispatchFrame::decode(&framed.next().await.unwrap().unwrap()).unwrap();
    assert_eq!(reply, DispatchFrame::Accepted { job_id: job.id() });
    assert_eq!(coordinator.queue.len(), 1);
}

#[tokio::test]
async fn ping_answers_pong() {
    let coordinator = listen().await;
    let remote = dispatcher(&coordinator.addr);

    remote.ping().await.unwrap();
    remote.ping().await.unwrap();
    assert!(coordinator.queue.is_empty());
}

/// A coordinator that acknowledges every submit after `delay`.
async fn slow_coordinator(delay: Duration) -> (String, tokio::sync::mpsc::UnboundedReceiver<Job>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut framed = Framed::new(stream, frame_codec());
                while let Some(Ok(bytes)) = framed.next().await {
                    let reply = match DispatchFrame::decode(&bytes).unwrap() {
                        DispatchFrame::Submit { job } => {
                            let job_id = job.id();
                            let _ = tx.send(job);
                            tokio::time::sleep(delay).await;
                            DispatchFrame::Accepted { job_id }
                        }
                        _ => DispatchFrame::Pong,
                    };
                    if framed.send(reply.encode().unwrap()).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    (addr, rx)
}

#[tokio::test]
async fn abandoned_submit_does_not_leak_its_ack() {
    let (addr, mut received) = slow_coordinator(Duration::from_millis(150)).await;
    let remote = dispatcher(&addr);

    // Give up after the frame is on the wire but before the ack arrives.
    let first = resize_job(640);
    let abandoned = tokio::time::timeout(Duration::from_millis(50), remote.submit(first.clone())).await;
    assert!(abandoned.is_err());
    assert_eq!(received.recv().await.unwrap().id(), first.id());

    // The next submit must see its own acknowledgement, not the stale one.
    let second = resize_job(320);
    remote.submit(second.clone()).await.unwrap();
    assert_eq!(received.recv().await.unwrap().id(), second.id());
    remote.submit(resize_job(480)).await.unwrap();
}
