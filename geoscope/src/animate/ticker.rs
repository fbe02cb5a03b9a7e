//! Cancelable repeating frame task.
//!
//! The animator needs "run this closure once per render frame until it
//! finishes or is canceled" without being married to any UI framework's
//! render loop. `FrameTicker` is that scheduler: a tokio interval plus a
//! cancellation token, nothing more.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default sampling rate for property animations.
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// A repeating frame callback with cooperative cancellation.
#[derive(Debug, Clone, Copy)]
pub struct FrameTicker {
    period: Duration,
}

impl FrameTicker {
    pub fn from_fps(fps: u32) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Invoke `frame` once per period until it breaks or `cancel` fires.
    ///
    /// Missed ticks are skipped, not replayed; animation frames sample
    /// wall-clock progress, so replaying a backlog would only produce
    /// redundant writes.
    pub async fn run(&self, cancel: CancellationToken, mut frame: impl FnMut() -> ControlFlow<()>) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = interval.tick() => {
                    if frame().is_break() {
                        break;
                    }
                }
            }
        }
    }
}

impl Default for FrameTicker {
    fn default() -> Self {
        Self::from_fps(DEFAULT_FRAME_RATE)
    }
}
