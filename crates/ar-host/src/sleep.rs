//! Sleep/wake detection.
//!
//! The monotonic clock stops while the machine is suspended but the wall
//! clock does not, so a tick whose wall-clock gap far exceeds its monotonic
//! gap means the system slept in between. The coordinator receives a
//! `Sleep` followed by a `Wake`, which cancels any countdown that straddled
//! the suspension.

use std::time::{Duration, Instant, SystemTime};

use ar_core::HostSignal;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct SleepDetector {
    interval: Duration,
    threshold: Duration,
}

impl Default for SleepDetector {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            threshold: Duration::from_secs(10),
        }
    }
}

impl SleepDetector {
    pub fn new(interval: Duration, threshold: Duration) -> Self {
        Self {
            interval,
            threshold,
        }
    }

    pub fn spawn(self, signals: UnboundedSender<HostSignal>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Sleep detection started");
            let mut last_wall = SystemTime::now();
            let mut last_mono = Instant::now();

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.interval) => {}
                }

                let wall = SystemTime::now();
                let mono = Instant::now();
                let wall_elapsed = wall.duration_since(last_wall).unwrap_or_default();
                let mono_elapsed = mono.saturating_duration_since(last_mono);
                last_wall = wall;
                last_mono = mono;

                if let Some(slept) = suspended_for(wall_elapsed, mono_elapsed, self.threshold) {
                    info!("System slept for about {}s", slept.as_secs());
                    if signals.send(HostSignal::Sleep).is_err() || signals.send(HostSignal::Wake).is_err() {
                        debug!("Coordinator gone, stopping sleep detection");
                        break;
                    }
                }
            }
            debug!("Sleep detection stopped");
        })
    }
}

/// Time the system spent suspended, if it exceeds `threshold`.
pub fn suspended_for(wall_elapsed: Duration, mono_elapsed: Duration, threshold: Duration) -> Option<Duration> {
    let gap = wall_elapsed.saturating_sub(mono_elapsed);
    (gap > threshold).then_some(gap)
}
