//! Cross-fade animation between competing raster layers.
//!
//! Base-layer switches never add or remove layers — removal would drop the
//! tile cache and flash on re-add. Instead the animator interpolates each
//! layer's `raster-opacity` once per frame with an ease-in-out curve.
//!
//! Retargeting a layer mid-flight cancels its pending frames and restarts
//! the tween **from the last sampled value**, so a rapid toggle
//! vector → satellite → vector glides back smoothly instead of snapping to
//! an endpoint first. Frame tasks are children of the session's
//! cancellation token and die with it on dispose.

mod ease;
mod ticker;

pub use ease::Ease;
pub use ticker::{FrameTicker, DEFAULT_FRAME_RATE};

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::session::MapSession;

/// Default duration of a base-layer cross-fade.
pub const CROSS_FADE_DURATION: Duration = Duration::from_millis(600);

struct LayerFade {
    /// Last sampled opacity; the starting point for any retarget.
    level: Arc<Mutex<f64>>,
    /// Cancels the in-flight frame task when retargeted or disposed.
    token: CancellationToken,
}

/// Per-layer opacity tween driver.
///
/// Tweens on different layers are independent; their opacities are never
/// normalized against each other (during a cross-fade both rasters are
/// partially opaque on purpose).
pub struct CrossFadeAnimator {
    session: Arc<MapSession>,
    ticker: FrameTicker,
    fades: Mutex<HashMap<String, LayerFade>>,
}

impl CrossFadeAnimator {
    pub fn new(session: Arc<MapSession>) -> Self {
        Self {
            session,
            ticker: FrameTicker::default(),
            fades: Mutex::new(HashMap::new()),
        }
    }

    /// Override the frame sampling rate.
    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.ticker = FrameTicker::from_fps(fps);
        self
    }

    /// The layer's last sampled opacity. Layers never animated report their
    /// bootstrap value of 0.
    pub fn current_opacity(&self, layer: &str) -> f64 {
        self.fades
            .lock()
            .get(layer)
            .map_or(0.0, |fade| *fade.level.lock())
    }

    /// Animate a layer's `raster-opacity` toward `target`.
    ///
    /// Calling again for the same layer before completion cancels the
    /// pending frames and restarts from the last sampled value. A target
    /// equal to the current value is a no-op.
    pub fn transition_to(&self, layer: &str, target: f64, duration: Duration) {
        if !self.session.is_alive() {
            return;
        }

        let (token, level, start) = {
            let mut fades = self.fades.lock();
            let fade = fades.entry(layer.to_string()).or_insert_with(|| LayerFade {
                level: Arc::new(Mutex::new(0.0)),
                token: CancellationToken::new(),
            });
            fade.token.cancel();
            fade.token = self.session.cancellation_token();
            let current = *fade.level.lock();
            (fade.token.clone(), Arc::clone(&fade.level), current)
        };

        if (start - target).abs() < f64::EPSILON {
            return;
        }
        trace!(layer = %layer, start, target, "Cross-fade retargeted");

        let session = Arc::clone(&self.session);
        let engine = session.engine();
        let layer = layer.to_string();
        let ticker = self.ticker;

        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            ticker
                .run(token, move || {
                    if !session.is_alive() {
                        return ControlFlow::Break(());
                    }
                    let t = if duration.is_zero() {
                        1.0
                    } else {
                        (started.elapsed().as_secs_f64() / duration.as_secs_f64()).min(1.0)
                    };
                    let value = start + (target - start) * Ease::InOutQuad.apply(t);
                    *level.lock() = value;
                    if engine
                        .set_paint_property(&layer, "raster-opacity", serde_json::json!(value))
                        .is_err()
                    {
                        return ControlFlow::Break(());
                    }
                    if t >= 1.0 {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                })
                .await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::HeadlessEngine;
    use crate::overlay::SATELLITE_LAYER;
    use crate::session::SessionConfig;
    use chrono::NaiveDate;
    use serde_json::Value;

    async fn ready_session() -> (Arc<HeadlessEngine>, Arc<MapSession>) {
        let engine = Arc::new(HeadlessEngine::new());
        let config = SessionConfig::default()
            .with_initial_date(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        let session = MapSession::create(engine.clone(), config).await.unwrap();
        (engine, session)
    }

    fn opacity(engine: &HeadlessEngine, layer: &str) -> f64 {
        engine
            .paint_value(layer, "raster-opacity")
            .as_ref()
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    #[tokio::test(start_paused = true)]
    async fn fade_reaches_target() {
        let (engine, session) = ready_session().await;
        let animator = CrossFadeAnimator::new(session);

        animator.transition_to(SATELLITE_LAYER, 1.0, CROSS_FADE_DURATION);
        tokio::time::sleep(Duration::from_millis(700)).await;

        assert!((opacity(&engine, SATELLITE_LAYER) - 1.0).abs() < 1e-6);
        assert!((animator.current_opacity(SATELLITE_LAYER) - 1.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_monotonic() {
        let (engine, session) = ready_session().await;
        let animator = CrossFadeAnimator::new(session);

        animator.transition_to(SATELLITE_LAYER, 1.0, CROSS_FADE_DURATION);

        let mut last = 0.0;
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(70)).await;
            let value = opacity(&engine, SATELLITE_LAYER);
            assert!(value >= last - 1e-9, "opacity regressed: {} < {}", value, last);
            last = value;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retarget_continues_from_last_sampled_value() {
        let (engine, session) = ready_session().await;
        let animator = CrossFadeAnimator::new(session);

        animator.transition_to(SATELLITE_LAYER, 1.0, CROSS_FADE_DURATION);
        tokio::time::sleep(Duration::from_millis(300)).await;

        let mid = opacity(&engine, SATELLITE_LAYER);
        assert!(mid > 0.1 && mid < 0.9, "expected mid-flight opacity, got {}", mid);

        animator.transition_to(SATELLITE_LAYER, 0.0, CROSS_FADE_DURATION);
        tokio::time::sleep(Duration::from_millis(40)).await;

        // No snap: within a couple of frames the value is still near the
        // retarget point.
        let after = opacity(&engine, SATELLITE_LAYER);
        assert!(
            (after - mid).abs() < 0.15,
            "retarget jumped from {} to {}",
            mid,
            after
        );

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(opacity(&engine, SATELLITE_LAYER) < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn equal_target_is_a_no_op() {
        let (engine, session) = ready_session().await;
        let animator = CrossFadeAnimator::new(session);

        let ops = engine.op_count();
        animator.transition_to(SATELLITE_LAYER, 0.0, CROSS_FADE_DURATION);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.op_count(), ops);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_cancels_pending_frames() {
        let (engine, session) = ready_session().await;
        let animator = CrossFadeAnimator::new(session.clone());

        animator.transition_to(SATELLITE_LAYER, 1.0, CROSS_FADE_DURATION);
        tokio::time::sleep(Duration::from_millis(100)).await;

        session.dispose();
        let frozen = animator.current_opacity(SATELLITE_LAYER);
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(animator.current_opacity(SATELLITE_LAYER), frozen);
        assert!(frozen < 1.0);
    }
}
