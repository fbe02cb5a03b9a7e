//! Session telemetry for observability and the demo HUD.
//!
//! Lock-free atomic counters recorded by the reconciler, fetch path, and
//! tour sequencer, with a point-in-time [`MetricsSnapshot`] for display.
//!
//! ```text
//! Reconciler / Fetch / Tour ──► SessionMetrics ──► MetricsSnapshot ──► Views
//!                               (atomic counters)  (point-in-time copy)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one map session.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    reconcile_passes: AtomicU64,
    base_crossfades: AtomicU64,
    visibility_flips: AtomicU64,
    temporal_retargets: AtomicU64,
    structural_replaces: AtomicU64,
    camera_framings: AtomicU64,
    datasets_loaded: AtomicU64,
    mock_fallbacks: AtomicU64,
    stale_discards: AtomicU64,
    tour_stops_visited: AtomicU64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_reconcile_pass(&self) {
        self.reconcile_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_base_crossfade(&self) {
        self.base_crossfades.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_visibility_flip(&self) {
        self.visibility_flips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_temporal_retarget(&self) {
        self.temporal_retargets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_structural_replace(&self) {
        self.structural_replaces.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_camera_framing(&self) {
        self.camera_framings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dataset_loaded(&self) {
        self.datasets_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mock_fallback(&self) {
        self.mock_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_discard(&self) {
        self.stale_discards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tour_stops(&self, stops: u64) {
        self.tour_stops_visited.fetch_add(stops, Ordering::Relaxed);
    }

    /// Take a point-in-time copy for display.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reconcile_passes: self.reconcile_passes.load(Ordering::Relaxed),
            base_crossfades: self.base_crossfades.load(Ordering::Relaxed),
            visibility_flips: self.visibility_flips.load(Ordering::Relaxed),
            temporal_retargets: self.temporal_retargets.load(Ordering::Relaxed),
            structural_replaces: self.structural_replaces.load(Ordering::Relaxed),
            camera_framings: self.camera_framings.load(Ordering::Relaxed),
            datasets_loaded: self.datasets_loaded.load(Ordering::Relaxed),
            mock_fallbacks: self.mock_fallbacks.load(Ordering::Relaxed),
            stale_discards: self.stale_discards.load(Ordering::Relaxed),
            tour_stops_visited: self.tour_stops_visited.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SessionMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub reconcile_passes: u64,
    pub base_crossfades: u64,
    pub visibility_flips: u64,
    pub temporal_retargets: u64,
    pub structural_replaces: u64,
    pub camera_framings: u64,
    pub datasets_loaded: u64,
    pub mock_fallbacks: u64,
    pub stale_discards: u64,
    pub tour_stops_visited: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "reconcile passes:    {}", self.reconcile_passes)?;
        writeln!(f, "base cross-fades:    {}", self.base_crossfades)?;
        writeln!(f, "visibility flips:    {}", self.visibility_flips)?;
        writeln!(f, "temporal retargets:  {}", self.temporal_retargets)?;
        writeln!(f, "structural replaces: {}", self.structural_replaces)?;
        writeln!(f, "camera framings:     {}", self.camera_framings)?;
        writeln!(f, "datasets loaded:     {}", self.datasets_loaded)?;
        writeln!(f, "mock fallbacks:      {}", self.mock_fallbacks)?;
        writeln!(f, "stale discards:      {}", self.stale_discards)?;
        write!(f, "tour stops visited:  {}", self.tour_stops_visited)
    }
}
