//! Monitoring session: detection worker and status channel

use attention::{AttentionConfig, AttentionLabel, AttentionMonitor, FrameStatus};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::source::DetectionSource;
use crate::{MonitorConfig, MonitorError};

/// Status published for every processed frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    /// Frame sequence number within the session
    pub sequence: u64,
    /// Frame timestamp (last good timestamp for capture errors)
    pub timestamp: Duration,
    pub status: FrameStatus,
    /// Alarm became active on this frame
    pub alarm_raised: bool,
    /// Alarm went inactive on this frame
    pub alarm_cleared: bool,
}

struct RunningSession {
    receiver: mpsc::Receiver<StatusUpdate>,
    stop: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

/// Attention monitoring session.
///
/// The detection worker is the only writer of the attention state and the
/// only sender on the status channel; the owner of this handle is the only
/// reader.
pub struct MonitorSession {
    attention: AttentionConfig,
    config: MonitorConfig,
    running: Option<RunningSession>,
}

impl MonitorSession {
    /// Create a session in the ready state
    pub fn new(attention: AttentionConfig, config: MonitorConfig) -> Result<Self, MonitorError> {
        attention.validate()?;
        Ok(Self {
            attention,
            config,
            running: None,
        })
    }

    /// Whether a worker is attached and still processing frames
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map(|r| !r.worker.is_finished())
            .unwrap_or(false)
    }

    /// Start monitoring frames from `source` with fresh attention state
    pub fn start<S: DetectionSource>(&mut self, source: S) -> Result<(), MonitorError> {
        if let Some(running) = &self.running {
            if !running.worker.is_finished() {
                return Err(MonitorError::AlreadyRunning);
            }
        }
        if let Some(finished) = self.running.take() {
            Self::reap(finished)?;
        }

        let monitor = AttentionMonitor::new(self.attention.clone())?;
        let (tx, rx) = mpsc::channel::<StatusUpdate>(self.config.status_capacity.max(1));
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();
        let interval = Duration::from_millis(self.config.frame_interval_ms);

        let worker = std::thread::Builder::new()
            .name("detection".into())
            .spawn(move || run_detection(source, monitor, tx, stop_clone, interval))
            .map_err(|e| MonitorError::Worker(e.to_string()))?;

        info!("Monitoring session started");
        self.running = Some(RunningSession {
            receiver: rx,
            stop,
            worker,
        });
        Ok(())
    }

    /// Receive the next status, `None` once the worker has finished
    pub async fn next_status(&mut self) -> Option<StatusUpdate> {
        self.running.as_mut()?.receiver.recv().await
    }

    /// Stop monitoring and wait for the worker to exit
    pub async fn stop(&mut self) -> Result<(), MonitorError> {
        let running = self.running.take().ok_or(MonitorError::NotRunning)?;
        running.stop.store(true, Ordering::SeqCst);

        tokio::task::spawn_blocking(move || Self::reap(running))
            .await
            .map_err(|e| MonitorError::Worker(e.to_string()))??;

        info!("Monitoring session stopped");
        Ok(())
    }

    fn reap(running: RunningSession) -> Result<(), MonitorError> {
        let RunningSession { receiver, worker, .. } = running;
        // Unblocks a worker waiting on a full channel
        drop(receiver);
        worker
            .join()
            .map_err(|_| MonitorError::Worker("detection worker panicked".into()))
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        // Same path as stop(), but joined inline; the worker wakes from a full
        // channel once the receiver is dropped and exits within one frame
        if let Some(running) = self.running.take() {
            running.stop.store(true, Ordering::SeqCst);
            if let Err(e) = Self::reap(running) {
                warn!("Detection worker did not shut down cleanly: {}", e);
            }
        }
    }
}

fn run_detection<S: DetectionSource>(
    mut source: S,
    mut monitor: AttentionMonitor,
    tx: mpsc::Sender<StatusUpdate>,
    stop: Arc<AtomicBool>,
    interval: Duration,
) {
    let mut sequence = 0u64;
    let mut last_timestamp = Duration::ZERO;
    let mut last_kind: Option<AttentionLabel> = None;
    let mut alarm_active = false;

    while !stop.load(Ordering::SeqCst) {
        let status = match source.next_detection() {
            None => {
                debug!("Detection source exhausted");
                break;
            }
            Some(Ok(detection)) => {
                last_timestamp = detection.timestamp;
                monitor.classify(&detection.output, detection.timestamp)
            }
            Some(Err(e)) => {
                warn!("Frame capture failed: {}", e);
                FrameStatus::camera_error()
            }
        };

        if status.kind != last_kind {
            info!("Status changed: {}", status.label);
            last_kind = status.kind;
        }

        let alarm_raised = status.alarm_active && !alarm_active;
        let alarm_cleared = !status.alarm_active && alarm_active;
        if alarm_raised {
            warn!("ALARM raised: {}", status.label);
        } else if alarm_cleared {
            info!("Alarm cleared: {}", status.label);
        }
        alarm_active = status.alarm_active;

        let update = StatusUpdate {
            sequence,
            timestamp: last_timestamp,
            status,
            alarm_raised,
            alarm_cleared,
        };
        sequence += 1;

        if tx.blocking_send(update).is_err() {
            debug!("Status receiver dropped");
            break;
        }

        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    monitor.reset_state();
    debug!("Detection worker exiting after {} frames", sequence);
}
