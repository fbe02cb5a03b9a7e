//! In-memory rendering engine.
//!
//! `HeadlessEngine` implements the full [`MapEngine`] surface against an
//! ordered in-memory layer graph. It exists for three consumers: unit
//! tests of the reconciliation/animation/tour logic, the integration
//! suite, and the CLI demo command, which drives a complete session
//! without a GPU or a display.
//!
//! Lifecycle events are simulated with short timed delays so that code
//! awaiting move-end or render-idle exercises its real suspension points
//! (and its aliveness re-checks) under `tokio`'s paused test clock.

use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use super::types::{
    CameraTarget, EngineError, FitBoundsOptions, LayerInfo, LayerSpec, LayerType, SourceSpec,
};
use super::{BoxFuture, MapEngine};
use crate::geojson::{BBox, Feature, Geometry};

/// Degrees of slack when hit-testing point features.
const HIT_RADIUS_DEG: f64 = 0.5;

/// Every mutation the engine has accepted, in order.
///
/// The reconciler's idempotence property is asserted against this log:
/// an unchanged desired state must append nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOp {
    AddSource(String),
    RemoveSource(String),
    SetSourceTiles(String, Vec<String>),
    AddLayer { id: String, before: Option<String> },
    RemoveLayer(String),
    SetPaint { layer: String, name: String },
    SetLayout { layer: String, name: String, value: Value },
    SetTerrain(String),
    ClearTerrain,
    FlyTo(CameraTarget),
    FitBounds(BBox),
}

struct LayerRecord {
    spec: LayerSpec,
    /// Seeded style layers are not part of any overlay; they only serve as
    /// anchor candidates and survive resets.
    builtin_style: bool,
}

struct Graph {
    sources: Vec<(String, SourceSpec)>,
    layers: Vec<LayerRecord>,
    terrain: Option<(String, f64)>,
    camera: Option<CameraTarget>,
    alive: bool,
    ops: Vec<EngineOp>,
}

/// In-memory [`MapEngine`] implementation.
pub struct HeadlessEngine {
    graph: Mutex<Graph>,
    load_failure: Option<String>,
    motion_delay: Duration,
    idle_delay: Duration,
}

impl HeadlessEngine {
    /// Create an engine pre-seeded with a minimal vector style: background
    /// and road layers plus one text-bearing symbol layer, so anchor
    /// resolution finds a label layer the way it would on a real style.
    pub fn new() -> Self {
        let style_layers = [
            ("background", LayerType::Fill, false),
            ("water", LayerType::Fill, false),
            ("road-primary", LayerType::Line, false),
            ("place-labels", LayerType::Symbol, true),
        ];

        let layers = style_layers
            .into_iter()
            .map(|(id, layer_type, has_text)| {
                let mut spec = LayerSpec::new(id, layer_type, "style");
                if has_text {
                    spec = spec.with_layout("text-field", Value::String("{name}".into()));
                }
                LayerRecord {
                    spec,
                    builtin_style: true,
                }
            })
            .collect();

        Self {
            graph: Mutex::new(Graph {
                sources: Vec::new(),
                layers,
                terrain: None,
                camera: None,
                alive: true,
                ops: Vec::new(),
            }),
            load_failure: None,
            motion_delay: Duration::from_millis(50),
            idle_delay: Duration::from_millis(25),
        }
    }

    /// Create an engine whose load event fails, for exercising the fatal
    /// initialization path.
    pub fn failing(reason: impl Into<String>) -> Self {
        let mut engine = Self::new();
        engine.load_failure = Some(reason.into());
        engine
    }

    /// Override the simulated camera-motion duration.
    pub fn with_motion_delay(mut self, delay: Duration) -> Self {
        self.motion_delay = delay;
        self
    }

    /// Override the simulated render-idle settling time.
    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    /// Ordered ids of all layers, style layers included.
    pub fn layer_order(&self) -> Vec<String> {
        self.graph
            .lock()
            .layers
            .iter()
            .map(|record| record.spec.id.clone())
            .collect()
    }

    /// Current layout `visibility` of a layer, defaulting to "visible".
    pub fn layout_visibility(&self, layer: &str) -> Option<String> {
        let graph = self.graph.lock();
        let record = graph.layers.iter().find(|r| r.spec.id == layer)?;
        Some(
            record
                .spec
                .layout
                .get("visibility")
                .and_then(Value::as_str)
                .unwrap_or("visible")
                .to_string(),
        )
    }

    /// Current value of a paint property, if set.
    pub fn paint_value(&self, layer: &str, name: &str) -> Option<Value> {
        let graph = self.graph.lock();
        graph
            .layers
            .iter()
            .find(|r| r.spec.id == layer)
            .and_then(|r| r.spec.paint.get(name).cloned())
    }

    /// Tile templates of a raster source, if any.
    pub fn source_tiles(&self, id: &str) -> Option<Vec<String>> {
        let graph = self.graph.lock();
        graph.sources.iter().find(|(sid, _)| sid == id).and_then(
            |(_, spec)| match spec {
                SourceSpec::RasterTiles { tiles, .. } => Some(tiles.clone()),
                _ => None,
            },
        )
    }

    /// Last camera target set by a fly-to or fit-bounds.
    pub fn camera(&self) -> Option<CameraTarget> {
        self.graph.lock().camera
    }

    pub fn terrain(&self) -> Option<(String, f64)> {
        self.graph.lock().terrain.clone()
    }

    /// Full mutation log since creation.
    pub fn ops(&self) -> Vec<EngineOp> {
        self.graph.lock().ops.clone()
    }

    pub fn op_count(&self) -> usize {
        self.graph.lock().ops.len()
    }

    /// Count of camera fly-to operations, for tour assertions.
    pub fn fly_to_count(&self) -> usize {
        self.graph
            .lock()
            .ops
            .iter()
            .filter(|op| matches!(op, EngineOp::FlyTo(_)))
            .count()
    }

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Graph) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut graph = self.graph.lock();
        if !graph.alive {
            return Err(EngineError::Disposed);
        }
        f(&mut graph)
    }
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MapEngine for HeadlessEngine {
    fn add_source(&self, id: &str, spec: SourceSpec) -> Result<(), EngineError> {
        self.mutate(|graph| {
            if graph.sources.iter().any(|(sid, _)| sid == id) {
                return Err(EngineError::DuplicateSource(id.to_string()));
            }
            graph.sources.push((id.to_string(), spec));
            graph.ops.push(EngineOp::AddSource(id.to_string()));
            Ok(())
        })
    }

    fn remove_source(&self, id: &str) -> Result<(), EngineError> {
        self.mutate(|graph| {
            let before = graph.sources.len();
            graph.sources.retain(|(sid, _)| sid != id);
            if graph.sources.len() == before {
                return Err(EngineError::UnknownSource(id.to_string()));
            }
            graph.ops.push(EngineOp::RemoveSource(id.to_string()));
            Ok(())
        })
    }

    fn has_source(&self, id: &str) -> bool {
        let graph = self.graph.lock();
        graph.alive && graph.sources.iter().any(|(sid, _)| sid == id)
    }

    fn set_source_tiles(&self, id: &str, tiles: Vec<String>) -> Result<(), EngineError> {
        self.mutate(|graph| {
            let (_, spec) = graph
                .sources
                .iter_mut()
                .find(|(sid, _)| sid == id)
                .ok_or_else(|| EngineError::UnknownSource(id.to_string()))?;
            match spec {
                SourceSpec::RasterTiles {
                    tiles: existing, ..
                } => {
                    *existing = tiles.clone();
                    graph.ops.push(EngineOp::SetSourceTiles(id.to_string(), tiles));
                    Ok(())
                }
                _ => Err(EngineError::UnsupportedSourceOperation {
                    id: id.to_string(),
                    operation: "set_source_tiles",
                }),
            }
        })
    }

    fn add_layer(&self, spec: LayerSpec, before: Option<&str>) -> Result<(), EngineError> {
        self.mutate(|graph| {
            if graph.layers.iter().any(|r| r.spec.id == spec.id) {
                return Err(EngineError::DuplicateLayer(spec.id.clone()));
            }
            let position = match before {
                Some(anchor) => graph
                    .layers
                    .iter()
                    .position(|r| r.spec.id == anchor)
                    .ok_or_else(|| EngineError::UnknownLayer(anchor.to_string()))?,
                None => graph.layers.len(),
            };
            let op = EngineOp::AddLayer {
                id: spec.id.clone(),
                before: before.map(str::to_string),
            };
            graph.layers.insert(
                position,
                LayerRecord {
                    spec,
                    builtin_style: false,
                },
            );
            graph.ops.push(op);
            Ok(())
        })
    }

    fn remove_layer(&self, id: &str) -> Result<(), EngineError> {
        self.mutate(|graph| {
            let position = graph
                .layers
                .iter()
                .position(|r| r.spec.id == id)
                .ok_or_else(|| EngineError::UnknownLayer(id.to_string()))?;
            graph.layers.remove(position);
            graph.ops.push(EngineOp::RemoveLayer(id.to_string()));
            Ok(())
        })
    }

    fn has_layer(&self, id: &str) -> bool {
        let graph = self.graph.lock();
        graph.alive && graph.layers.iter().any(|r| r.spec.id == id)
    }

    fn layers(&self) -> Vec<LayerInfo> {
        self.graph
            .lock()
            .layers
            .iter()
            .map(|record| LayerInfo {
                id: record.spec.id.clone(),
                layer_type: record.spec.layer_type,
                has_text_field: record.spec.layout.contains_key("text-field"),
            })
            .collect()
    }

    fn set_paint_property(
        &self,
        layer: &str,
        name: &str,
        value: Value,
    ) -> Result<(), EngineError> {
        self.mutate(|graph| {
            let record = graph
                .layers
                .iter_mut()
                .find(|r| r.spec.id == layer)
                .ok_or_else(|| EngineError::UnknownLayer(layer.to_string()))?;
            record.spec.paint.insert(name.to_string(), value);
            graph.ops.push(EngineOp::SetPaint {
                layer: layer.to_string(),
                name: name.to_string(),
            });
            Ok(())
        })
    }

    fn set_layout_property(
        &self,
        layer: &str,
        name: &str,
        value: Value,
    ) -> Result<(), EngineError> {
        self.mutate(|graph| {
            let record = graph
                .layers
                .iter_mut()
                .find(|r| r.spec.id == layer)
                .ok_or_else(|| EngineError::UnknownLayer(layer.to_string()))?;
            record.spec.layout.insert(name.to_string(), value.clone());
            graph.ops.push(EngineOp::SetLayout {
                layer: layer.to_string(),
                name: name.to_string(),
                value,
            });
            Ok(())
        })
    }

    fn set_terrain(&self, source: &str, exaggeration: f64) -> Result<(), EngineError> {
        self.mutate(|graph| {
            if !graph.sources.iter().any(|(sid, _)| sid == source) {
                return Err(EngineError::UnknownSource(source.to_string()));
            }
            graph.terrain = Some((source.to_string(), exaggeration));
            graph.ops.push(EngineOp::SetTerrain(source.to_string()));
            Ok(())
        })
    }

    fn clear_terrain(&self) -> Result<(), EngineError> {
        self.mutate(|graph| {
            graph.terrain = None;
            graph.ops.push(EngineOp::ClearTerrain);
            Ok(())
        })
    }

    fn fly_to(&self, camera: CameraTarget, _duration: Duration) -> Result<(), EngineError> {
        self.mutate(|graph| {
            graph.camera = Some(camera);
            graph.ops.push(EngineOp::FlyTo(camera));
            Ok(())
        })
    }

    fn fit_bounds(&self, bounds: BBox, options: FitBoundsOptions) -> Result<(), EngineError> {
        self.mutate(|graph| {
            let center = (
                (bounds[0] + bounds[2]) / 2.0,
                (bounds[1] + bounds[3]) / 2.0,
            );
            graph.camera = Some(CameraTarget {
                center,
                zoom: options.max_zoom,
                pitch: options.pitch,
                bearing: options.bearing,
            });
            graph.ops.push(EngineOp::FitBounds(bounds));
            Ok(())
        })
    }

    fn wait_for_load(&self) -> BoxFuture<'_, Result<(), EngineError>> {
        Box::pin(async move {
            if let Some(reason) = &self.load_failure {
                return Err(EngineError::Initialization(reason.clone()));
            }
            // Headless styles load instantly; yield once so callers still
            // cross a suspension point.
            tokio::task::yield_now().await;
            if self.graph.lock().alive {
                Ok(())
            } else {
                Err(EngineError::Disposed)
            }
        })
    }

    fn wait_for_move_end(&self) -> BoxFuture<'_, Result<(), EngineError>> {
        Box::pin(async move {
            tokio::time::sleep(self.motion_delay).await;
            if self.graph.lock().alive {
                Ok(())
            } else {
                Err(EngineError::Disposed)
            }
        })
    }

    fn wait_for_idle(&self) -> BoxFuture<'_, Result<(), EngineError>> {
        Box::pin(async move {
            tokio::time::sleep(self.idle_delay).await;
            if self.graph.lock().alive {
                Ok(())
            } else {
                Err(EngineError::Disposed)
            }
        })
    }

    fn query_features_at(&self, lon: f64, lat: f64, layer: &str) -> Vec<Feature> {
        let graph = self.graph.lock();
        if !graph.alive {
            return Vec::new();
        }
        let Some(record) = graph.layers.iter().find(|r| r.spec.id == layer) else {
            return Vec::new();
        };
        let Some((_, SourceSpec::GeoJson { data })) = graph
            .sources
            .iter()
            .find(|(sid, _)| *sid == record.spec.source)
        else {
            return Vec::new();
        };

        data.features
            .iter()
            .filter(|feature| match &feature.geometry {
                Some(Geometry::Point { coordinates }) => {
                    match (coordinates.first(), coordinates.get(1)) {
                        (Some(&flon), Some(&flat)) => {
                            (flon - lon).abs() <= HIT_RADIUS_DEG
                                && (flat - lat).abs() <= HIT_RADIUS_DEG
                        }
                        _ => false,
                    }
                }
                _ => false,
            })
            .cloned()
            .collect()
    }

    fn is_alive(&self) -> bool {
        self.graph.lock().alive
    }

    fn destroy(&self) {
        let mut graph = self.graph.lock();
        graph.alive = false;
        graph.sources.clear();
        graph.layers.retain(|record| record.builtin_style);
        graph.terrain = None;
    }
}
