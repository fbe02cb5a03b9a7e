//! Layer reconciliation: converging the engine's live layer graph to the
//! declared [`DesiredState`].
//!
//! Each overlay category converges differently, because the cost of the
//! wrong strategy is visible on screen:
//!
//! - **Base rasters** are never added or removed (that would refetch tiles
//!   and flash); only their opacity is retargeted through the animator.
//! - **Fixed-structure toggles** (terrain, buildings, temporal rasters,
//!   sensor circles) flip a layout `visibility` property.
//! - **Temporal date changes** replace the source's tile URL template in
//!   place; the layer stays put, so there is no reload flash.
//! - **Dynamic payloads** (imported dataset, sensor measurements) are
//!   structurally replaced — remove layer(s), remove source, re-add —
//!   because their schema and cardinality are unbounded.
//!
//! A pass is synchronous and runs to completion; passes never interleave.
//! Reconciling before the session is ready, or after disposal, is a no-op.
//! Removing a nonexistent layer or source is avoided by existence guards,
//! not by catching errors.

mod state;

pub use state::{DesiredState, OverlayEntry};

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, trace};

use crate::animate::{CrossFadeAnimator, CROSS_FADE_DURATION};
use crate::engine::{FitBoundsOptions, LayerSpec, LayerType, MapEngine, SourceSpec};
use crate::geojson::pad_bbox;
use crate::overlay::{
    catalog, BaseLayer, OverlayId, AIR_QUALITY_GLOW_LAYER, AIR_QUALITY_POINTS_LAYER,
    AIR_QUALITY_SOURCE, DATASET_LAYER, DATASET_SOURCE, HIGHRES_LAYER, SATELLITE_LAYER,
    TERRAIN_SOURCE,
};
use crate::session::MapSession;
use crate::telemetry::SessionMetrics;
use crate::temporal::TemporalLayer;

use state::AppliedState;

/// Ratio applied to a dataset's bbox before camera framing.
const FRAMING_PAD_RATIO: f64 = 1.25;

/// PM2.5 step-color expression shared by the sensor glow and point layers.
fn pm25_color_expression() -> serde_json::Value {
    json!([
        "step",
        ["get", "pm25"],
        "#22c55e",
        12,
        "#eab308",
        35,
        "#f97316",
        55,
        "#ef4444"
    ])
}

/// Converges the engine to a [`DesiredState`], tracking what it applied.
pub struct Reconciler {
    session: Arc<MapSession>,
    animator: Arc<CrossFadeAnimator>,
    metrics: Arc<SessionMetrics>,
    applied: Mutex<AppliedState>,
}

impl Reconciler {
    pub fn new(
        session: Arc<MapSession>,
        animator: Arc<CrossFadeAnimator>,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        let applied = AppliedState::matching_bootstrap(session.config().initial_date);
        Self {
            session,
            animator,
            metrics,
            applied: Mutex::new(applied),
        }
    }

    /// Run one reconciliation pass.
    ///
    /// Idempotent: a pass over unchanged state issues no engine calls.
    pub fn reconcile(&self, desired: &DesiredState) {
        if !self.session.is_alive() {
            trace!("Reconcile skipped: session not ready");
            return;
        }
        let engine = self.session.engine();
        let mut applied = self.applied.lock();

        self.converge_base(engine.as_ref(), desired, &mut applied);
        self.converge_temporal(engine.as_ref(), desired, &mut applied);
        self.converge_dataset(engine.as_ref(), desired, &mut applied);
        self.converge_sensors(engine.as_ref(), desired, &mut applied);
        self.converge_toggles(engine.as_ref(), desired, &mut applied);

        self.metrics.record_reconcile_pass();
    }

    fn converge_base(
        &self,
        engine: &dyn MapEngine,
        desired: &DesiredState,
        applied: &mut AppliedState,
    ) {
        if applied.base_layer == desired.base_layer() {
            return;
        }
        let satellite_target = if desired.base_layer() == BaseLayer::Satellite {
            1.0
        } else {
            0.0
        };
        let highres_target = if desired.base_layer() == BaseLayer::HighRes {
            1.0
        } else {
            0.0
        };

        if engine.has_layer(SATELLITE_LAYER) {
            self.animator
                .transition_to(SATELLITE_LAYER, satellite_target, CROSS_FADE_DURATION);
        }
        if engine.has_layer(HIGHRES_LAYER) {
            self.animator
                .transition_to(HIGHRES_LAYER, highres_target, CROSS_FADE_DURATION);
        }

        debug!(from = %applied.base_layer, to = %desired.base_layer(), "Base layer cross-fade");
        applied.base_layer = desired.base_layer();
        self.metrics.record_base_crossfade();
    }

    fn converge_temporal(
        &self,
        engine: &dyn MapEngine,
        desired: &DesiredState,
        applied: &mut AppliedState,
    ) {
        for temporal in TemporalLayer::ALL {
            let id = temporal.overlay_id();
            let desired_params = &desired.overlay(id).params;
            let Some(entry) = applied.overlays.get_mut(&id) else {
                continue;
            };
            if &entry.params == desired_params {
                continue;
            }

            let source_id = id.spec().source_id;
            if engine.has_source(source_id) {
                let url = temporal.tile_url(desired.selected_date());
                if let Err(e) = engine.set_source_tiles(source_id, vec![url]) {
                    debug!(source = source_id, error = %e, "Temporal retarget failed");
                } else {
                    self.metrics.record_temporal_retarget();
                }
            }
            entry.params = desired_params.clone();
        }
    }

    fn converge_dataset(
        &self,
        engine: &dyn MapEngine,
        desired: &DesiredState,
        applied: &mut AppliedState,
    ) {
        if applied.dataset_revision != desired.dataset_revision() {
            self.replace_dataset_layers(engine, desired);
            applied.dataset_revision = desired.dataset_revision();
            if let Some(entry) = applied.overlays.get_mut(&OverlayId::Dataset) {
                entry.visible = desired.overlay(OverlayId::Dataset).visible;
            }
            self.metrics.record_structural_replace();
        }

        // A new bounding box triggers cinematic camera framing.
        let framed = desired.dataset_bbox().map(|b| pad_bbox(b, FRAMING_PAD_RATIO));
        if let Some(bbox) = framed {
            if applied.framed_bbox != Some(bbox) {
                if let Err(e) = engine.fit_bounds(bbox, FitBoundsOptions::default()) {
                    debug!(error = %e, "Camera framing failed");
                } else {
                    self.metrics.record_camera_framing();
                }
                applied.framed_bbox = Some(bbox);
            }
        }
    }

    /// Remove-then-add, in that order, so a rapid sequence of dataset
    /// changes can never race into a duplicate-id state. Idempotent when
    /// the graph is already empty.
    fn replace_dataset_layers(&self, engine: &dyn MapEngine, desired: &DesiredState) {
        if engine.has_layer(DATASET_LAYER) {
            let _ = engine.remove_layer(DATASET_LAYER);
        }
        if engine.has_source(DATASET_SOURCE) {
            let _ = engine.remove_source(DATASET_SOURCE);
        }

        let Some(dataset) = desired.dataset() else {
            return;
        };
        if dataset.collection.is_empty() {
            return;
        }

        let visibility = if desired.overlay(OverlayId::Dataset).visible {
            "visible"
        } else {
            "none"
        };
        let added = engine
            .add_source(
                DATASET_SOURCE,
                SourceSpec::GeoJson {
                    data: dataset.collection.clone(),
                },
            )
            .and_then(|_| {
                engine.add_layer(
                    LayerSpec::new(DATASET_LAYER, LayerType::Circle, DATASET_SOURCE)
                        .with_layout("visibility", json!(visibility))
                        .with_paint(
                            "circle-radius",
                            json!(["interpolate", ["linear"], ["zoom"], 5, 4, 12, 10]),
                        )
                        .with_paint("circle-color", json!("#6b9ef5"))
                        .with_paint("circle-stroke-width", json!(2))
                        .with_paint("circle-stroke-color", json!("#ffffff")),
                    None,
                )
            });
        if let Err(e) = added {
            debug!(error = %e, "Dataset layer replace failed");
        } else {
            debug!(
                features = dataset.collection.len(),
                mocked = dataset.is_mocked(),
                "Dataset layers replaced"
            );
        }
    }

    fn converge_sensors(
        &self,
        engine: &dyn MapEngine,
        desired: &DesiredState,
        applied: &mut AppliedState,
    ) {
        if applied.sensor_revision == desired.sensor_revision() {
            return;
        }
        self.replace_sensor_layers(engine, desired);
        applied.sensor_revision = desired.sensor_revision();
        if let Some(entry) = applied.overlays.get_mut(&OverlayId::AirQuality) {
            entry.visible = desired.overlay(OverlayId::AirQuality).visible;
        }
        self.metrics.record_structural_replace();
    }

    fn replace_sensor_layers(&self, engine: &dyn MapEngine, desired: &DesiredState) {
        for layer in [AIR_QUALITY_POINTS_LAYER, AIR_QUALITY_GLOW_LAYER] {
            if engine.has_layer(layer) {
                let _ = engine.remove_layer(layer);
            }
        }
        if engine.has_source(AIR_QUALITY_SOURCE) {
            let _ = engine.remove_source(AIR_QUALITY_SOURCE);
        }

        let Some(data) = desired.sensor_data() else {
            return;
        };
        if data.is_empty() {
            return;
        }

        let visibility = if desired.overlay(OverlayId::AirQuality).visible {
            json!("visible")
        } else {
            json!("none")
        };
        let anchors = self.session.anchors();
        let buildings_anchor = anchors.below_buildings.as_deref();

        let added = engine
            .add_source(
                AIR_QUALITY_SOURCE,
                SourceSpec::GeoJson {
                    data: data.as_ref().clone(),
                },
            )
            .and_then(|_| {
                engine.add_layer(
                    LayerSpec::new(AIR_QUALITY_GLOW_LAYER, LayerType::Circle, AIR_QUALITY_SOURCE)
                        .with_layout("visibility", visibility.clone())
                        .with_paint("circle-radius", json!(24))
                        .with_paint("circle-blur", json!(1))
                        .with_paint("circle-color", pm25_color_expression())
                        .with_paint("circle-opacity", json!(0.4)),
                    buildings_anchor,
                )
            })
            .and_then(|_| {
                engine.add_layer(
                    LayerSpec::new(
                        AIR_QUALITY_POINTS_LAYER,
                        LayerType::Circle,
                        AIR_QUALITY_SOURCE,
                    )
                    .with_layout("visibility", visibility)
                    .with_paint("circle-radius", json!(6))
                    .with_paint("circle-color", pm25_color_expression())
                    .with_paint("circle-stroke-width", json!(1))
                    .with_paint("circle-stroke-color", json!("#ffffff")),
                    Some(AIR_QUALITY_GLOW_LAYER),
                )
            });
        if let Err(e) = added {
            debug!(error = %e, "Sensor layer replace failed");
        } else {
            debug!(stations = data.len(), "Sensor layers replaced");
        }
    }

    fn converge_toggles(
        &self,
        engine: &dyn MapEngine,
        desired: &DesiredState,
        applied: &mut AppliedState,
    ) {
        for spec in catalog() {
            let wanted = desired.overlay(spec.id).visible;
            let Some(entry) = applied.overlays.get_mut(&spec.id) else {
                continue;
            };
            if entry.visible == wanted {
                continue;
            }

            if spec.id == OverlayId::Terrain {
                let result = if wanted {
                    if engine.has_source(TERRAIN_SOURCE) {
                        engine
                            .set_terrain(TERRAIN_SOURCE, self.session.config().terrain_exaggeration)
                    } else {
                        Ok(())
                    }
                } else {
                    engine.clear_terrain()
                };
                if let Err(e) = result {
                    debug!(error = %e, "Terrain toggle failed");
                }
            } else {
                let visibility = if wanted { json!("visible") } else { json!("none") };
                for layer in spec.layer_ids {
                    if engine.has_layer(layer) {
                        if let Err(e) =
                            engine.set_layout_property(layer, "visibility", visibility.clone())
                        {
                            debug!(layer = %layer, error = %e, "Visibility flip failed");
                        }
                    }
                }
            }

            trace!(overlay = %spec.id, visible = wanted, "Overlay visibility converged");
            entry.visible = wanted;
            self.metrics.record_visibility_flip();
        }
    }
}
