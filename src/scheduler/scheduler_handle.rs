use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::scheduler::frame_pacer::{FramePacer, PaceDecision};
use crate::snapshot::SimSnapshot;

// Scheduler settings
#[derive(Clone, Debug)]
pub struct SchedulerSettings {
    /// Minimum time between two delivered frames in milliseconds
    pub min_interval_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: 50, // One frame per 50ms keeps the panel fluid without repaint storms
        }
    }
}

// Scheduler errors
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Failed to deliver frame: {0}")]
    FrameDeliveryError(String),
}

/// Handle for the snapshot pacing task.
///
/// Spawns one tokio task that owns the `FramePacer` and the single
/// trailing-flush timer. Snapshots come in on `snapshot_receiver` at
/// whatever rate the link produces them; paced frames go out on
/// `frame_sender` for the UI to pick up.
pub struct SchedulerHandle {}

impl SchedulerHandle {
    pub fn spawn(
        snapshot_receiver: mpsc::Receiver<SimSnapshot>,
        frame_sender: mpsc::Sender<SimSnapshot>,
        settings: Option<SchedulerSettings>,
        shutdown: CancellationToken,
    ) -> Result<Self, SchedulerError> {
        let settings = settings.unwrap_or_default();
        info!("Spawning frame scheduler with settings: {:?}", settings);

        let pacer = FramePacer::new(Duration::from_millis(settings.min_interval_ms));

        let task_handle = tokio::spawn(async move {
            if let Err(e) = run_scheduler_loop(pacer, snapshot_receiver, frame_sender, shutdown).await
            {
                error!("Scheduler task terminated with error: {}", e);
            } else {
                info!("Scheduler task finished");
            }
        });

        debug!("Tokio task spawned with handle: {:?}", task_handle);
        Ok(Self {})
    }
}

async fn run_scheduler_loop(
    mut pacer: FramePacer,
    mut snapshot_receiver: mpsc::Receiver<SimSnapshot>,
    frame_sender: mpsc::Sender<SimSnapshot>,
    shutdown: CancellationToken,
) -> Result<(), SchedulerError> {
    info!("Entering scheduler loop");

    loop {
        let deadline = pacer.flush_deadline();

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Scheduler shutdown requested");
                return Ok(());
            }

            received = snapshot_receiver.recv() => {
                match received {
                    Some(snapshot) => match pacer.on_snapshot(snapshot, Instant::now()) {
                        PaceDecision::RenderNow(frame) => {
                            trace!("Window open, delivering frame immediately");
                            deliver(&frame_sender, frame).await?;
                        }
                        PaceDecision::FlushArmed(at) => {
                            trace!("Trailing flush armed for {:?}", at);
                        }
                        PaceDecision::Coalesced => {
                            trace!("Snapshot coalesced into armed flush");
                        }
                    },
                    None => {
                        // Producer is gone. An armed flush still owes the UI
                        // the final snapshot; honor the interval, then stop.
                        warn!("Snapshot channel closed, draining scheduler");
                        if let Some(at) = pacer.flush_deadline() {
                            tokio::time::sleep_until(at.into()).await;
                            if let Some(frame) = pacer.on_flush(Instant::now()) {
                                deliver(&frame_sender, frame).await?;
                            }
                        }
                        return Ok(());
                    }
                }
            }

            _ = flush_timer(deadline), if deadline.is_some() => {
                if let Some(frame) = pacer.on_flush(Instant::now()) {
                    trace!("Trailing flush fired");
                    deliver(&frame_sender, frame).await?;
                }
            }
        }
    }
}

async fn flush_timer(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at.into()).await,
        // Unreachable behind the select guard; never resolves.
        None => std::future::pending().await,
    }
}

async fn deliver(
    frame_sender: &mpsc::Sender<SimSnapshot>,
    frame: SimSnapshot,
) -> Result<(), SchedulerError> {
    frame_sender
        .send(frame)
        .await
        .map_err(|e| SchedulerError::FrameDeliveryError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(tag: usize) -> SimSnapshot {
        SimSnapshot {
            current_line: tag,
            ..SimSnapshot::default()
        }
    }

    // Driver-level check of the pacing contract with real timers: a burst
    // of three snapshots yields exactly two frames, and the second one is
    // the last of the burst.
    #[tokio::test(flavor = "multi_thread")]
    async fn burst_yields_leading_and_trailing_frame() {
        let (snapshot_tx, snapshot_rx) = mpsc::channel(16);
        let (frame_tx, mut frame_rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();

        let settings = SchedulerSettings {
            min_interval_ms: 50,
        };
        SchedulerHandle::spawn(snapshot_rx, frame_tx, Some(settings), shutdown.clone()).unwrap();

        snapshot_tx.send(snap(1)).await.unwrap();
        snapshot_tx.send(snap(2)).await.unwrap();
        snapshot_tx.send(snap(3)).await.unwrap();

        let first = tokio::time::timeout(Duration::from_millis(500), frame_rx.recv())
            .await
            .expect("leading frame within deadline")
            .expect("channel open");
        assert_eq!(first.current_line, 1);

        let second = tokio::time::timeout(Duration::from_millis(500), frame_rx.recv())
            .await
            .expect("trailing frame within deadline")
            .expect("channel open");
        assert_eq!(second.current_line, 3);

        // No third frame may exist for this burst.
        let extra = tokio::time::timeout(Duration::from_millis(150), frame_rx.recv()).await;
        assert!(extra.is_err(), "burst must coalesce to exactly two frames");

        shutdown.cancel();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn final_snapshot_is_never_stranded() {
        let (snapshot_tx, snapshot_rx) = mpsc::channel(16);
        let (frame_tx, mut frame_rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();

        SchedulerHandle::spawn(snapshot_rx, frame_tx, None, shutdown.clone()).unwrap();

        snapshot_tx.send(snap(1)).await.unwrap();
        snapshot_tx.send(snap(2)).await.unwrap();
        // Producer stops entirely; the trailing flush must still deliver.
        drop(snapshot_tx);

        let first = tokio::time::timeout(Duration::from_millis(500), frame_rx.recv())
            .await
            .expect("leading frame within deadline")
            .expect("channel open");
        assert_eq!(first.current_line, 1);

        let last = tokio::time::timeout(Duration::from_millis(500), frame_rx.recv())
            .await
            .expect("trailing frame within deadline")
            .expect("channel open");
        assert_eq!(last.current_line, 2);

        shutdown.cancel();
    }
}
