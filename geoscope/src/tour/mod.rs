//! Cinematic camera tours.
//!
//! A tour visits an ordered list of camera destinations. Each stop is
//! gated on three awaited phases, in order: the fly-to's motion ending,
//! the renderer reaching idle (every tile for the new view loaded), and a
//! fixed dwell. The move → idle → dwell ordering is what guarantees the
//! audience only dwells on a fully rendered frame.
//!
//! Session aliveness is re-checked before every awaited step. Disposal
//! mid-tour terminates the sequence immediately and silently — a partial
//! [`TourOutcome`] is a normal result, not an error.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::engine::CameraTarget;
use crate::session::MapSession;
use crate::telemetry::SessionMetrics;

/// Duration of each stop's camera flight.
pub const TOUR_FLY_DURATION: Duration = Duration::from_millis(4000);

/// Pause on each fully rendered stop before advancing.
pub const TOUR_DWELL: Duration = Duration::from_millis(2000);

/// One tour destination.
#[derive(Debug, Clone, PartialEq)]
pub struct TourStop {
    pub camera: CameraTarget,
    pub label: String,
}

impl TourStop {
    pub fn new(camera: CameraTarget, label: impl Into<String>) -> Self {
        Self {
            camera,
            label: label.into(),
        }
    }
}

/// Progress notification published as each stop's flight begins.
#[derive(Debug, Clone, PartialEq)]
pub struct TourProgress {
    pub stop_index: usize,
    pub label: String,
}

/// How a tour run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TourOutcome {
    /// True when every stop was visited through its dwell.
    pub completed: bool,
    /// Stops fully visited (flight, idle, and dwell all finished).
    pub stops_visited: usize,
}

/// Drives ordered camera destinations over one session.
pub struct TourSequencer {
    session: Arc<MapSession>,
    fly_duration: Duration,
    dwell: Duration,
    progress: watch::Sender<Option<TourProgress>>,
    metrics: Option<Arc<SessionMetrics>>,
}

impl TourSequencer {
    pub fn new(session: Arc<MapSession>) -> Self {
        let (progress, _) = watch::channel(None);
        Self {
            session,
            fly_duration: TOUR_FLY_DURATION,
            dwell: TOUR_DWELL,
            progress,
            metrics: None,
        }
    }

    /// Record visited stops into the session metrics.
    pub fn with_metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_fly_duration(mut self, duration: Duration) -> Self {
        self.fly_duration = duration;
        self
    }

    pub fn with_dwell(mut self, dwell: Duration) -> Self {
        self.dwell = dwell;
        self
    }

    /// Subscribe to step-changed notifications.
    pub fn subscribe(&self) -> watch::Receiver<Option<TourProgress>> {
        self.progress.subscribe()
    }

    /// Run the tour to completion, cancellation, or disposal.
    pub async fn run(&self, stops: &[TourStop]) -> TourOutcome {
        let cancel = self.session.cancellation_token();
        let engine = self.session.engine();
        let mut visited = 0usize;

        info!(stops = stops.len(), "Tour started");
        for (index, stop) in stops.iter().enumerate() {
            if !self.session.is_alive() {
                break;
            }
            if engine.fly_to(stop.camera, self.fly_duration).is_err() {
                break;
            }
            let _ = self.progress.send(Some(TourProgress {
                stop_index: index,
                label: stop.label.clone(),
            }));
            debug!(stop = index, label = %stop.label, "Tour flight started");

            // Motion ended.
            if !self.session.is_alive() {
                break;
            }
            let ended = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                result = engine.wait_for_move_end() => result.is_ok(),
            };
            if !ended {
                break;
            }

            // Every tile for the new view rendered.
            if !self.session.is_alive() {
                break;
            }
            let idle = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                result = engine.wait_for_idle() => result.is_ok(),
            };
            if !idle {
                break;
            }

            // Dwell on the fully rendered frame.
            if !self.session.is_alive() {
                break;
            }
            let dwelled = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                _ = tokio::time::sleep(self.dwell) => true,
            };
            if !dwelled {
                break;
            }

            visited += 1;
        }

        let outcome = TourOutcome {
            completed: visited == stops.len(),
            stops_visited: visited,
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_tour_stops(visited as u64);
        }
        info!(
            completed = outcome.completed,
            visited = outcome.stops_visited,
            "Tour finished"
        );
        outcome
    }
}

/// The built-in showcase: alpine terrain, urban 3D, then the globe.
pub fn showcase_tour() -> Vec<TourStop> {
    vec![
        TourStop::new(
            CameraTarget::new(7.74, 46.02, 12.0).with_pitch(60.0),
            "Alps",
        ),
        TourStop::new(
            CameraTarget::new(-74.006, 40.7128, 15.5)
                .with_pitch(55.0)
                .with_bearing(-20.0),
            "New York",
        ),
        TourStop::new(CameraTarget::new(0.0, 20.0, 2.5), "Global view"),
    ]
}
