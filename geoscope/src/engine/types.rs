//! Engine-facing value types: sources, layers, camera targets, errors.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::geojson::FeatureCollection;

/// Errors surfaced by the engine capability interface.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine failed to initialize its backend or container. Fatal.
    #[error("engine initialization failed: {0}")]
    Initialization(String),

    /// The engine was destroyed; the operation was ignored.
    #[error("engine is disposed")]
    Disposed,

    /// A source with this id already exists.
    #[error("duplicate source id: {0}")]
    DuplicateSource(String),

    /// A layer with this id already exists.
    #[error("duplicate layer id: {0}")]
    DuplicateLayer(String),

    /// The named source does not exist.
    #[error("unknown source id: {0}")]
    UnknownSource(String),

    /// The named layer does not exist.
    #[error("unknown layer id: {0}")]
    UnknownLayer(String),

    /// The operation does not apply to the source's kind, e.g. replacing
    /// tiles on a GeoJSON source.
    #[error("source {id} does not support {operation}")]
    UnsupportedSourceOperation { id: String, operation: &'static str },
}

/// Declarative description of a source handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    /// Tiled raster imagery addressed by a URL template.
    RasterTiles {
        tiles: Vec<String>,
        tile_size: u32,
        max_zoom: Option<u8>,
        attribution: Option<String>,
    },
    /// Raster-encoded elevation tiles for terrain.
    RasterDem { url: String, tile_size: u32 },
    /// A tiled vector source (buildings).
    Vector { url: String },
    /// An inline GeoJSON payload.
    GeoJson { data: FeatureCollection },
}

/// The layer families the dashboard renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    Raster,
    Circle,
    FillExtrusion,
    Symbol,
    Line,
    Fill,
}

/// Declarative description of a layer handed to the engine.
///
/// Paint and layout properties carry raw JSON values because the engine's
/// property language (interpolation/step expressions) is opaque to the
/// session engine; it only stores and forwards them.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: String,
    pub layer_type: LayerType,
    pub source: String,
    pub source_layer: Option<String>,
    pub min_zoom: Option<u8>,
    pub max_zoom: Option<u8>,
    pub filter: Option<Value>,
    pub paint: BTreeMap<String, Value>,
    pub layout: BTreeMap<String, Value>,
}

impl LayerSpec {
    /// Start a layer spec with empty paint/layout tables.
    pub fn new(id: impl Into<String>, layer_type: LayerType, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            layer_type,
            source: source.into(),
            source_layer: None,
            min_zoom: None,
            max_zoom: None,
            filter: None,
            paint: BTreeMap::new(),
            layout: BTreeMap::new(),
        }
    }

    pub fn with_source_layer(mut self, source_layer: impl Into<String>) -> Self {
        self.source_layer = Some(source_layer.into());
        self
    }

    pub fn with_zoom_range(mut self, min: Option<u8>, max: Option<u8>) -> Self {
        self.min_zoom = min;
        self.max_zoom = max;
        self
    }

    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_paint(mut self, name: impl Into<String>, value: Value) -> Self {
        self.paint.insert(name.into(), value);
        self
    }

    pub fn with_layout(mut self, name: impl Into<String>, value: Value) -> Self {
        self.layout.insert(name.into(), value);
        self
    }
}

/// Style-stack entry returned by [`crate::engine::MapEngine::layers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub id: String,
    pub layer_type: LayerType,
    /// True for symbol layers that render text — the label layers overlays
    /// must stay below.
    pub has_text_field: bool,
}

/// A camera destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTarget {
    /// Longitude/latitude of the view center, degrees.
    pub center: (f64, f64),
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

impl CameraTarget {
    pub fn new(lon: f64, lat: f64, zoom: f64) -> Self {
        Self {
            center: (lon, lat),
            zoom,
            pitch: 0.0,
            bearing: 0.0,
        }
    }

    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = bearing;
        self
    }
}

/// Options for a bounds-framing camera move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitBoundsOptions {
    /// Uniform screen padding around the bounds, pixels.
    pub padding: u32,
    /// Never zoom in closer than this, regardless of bounds size.
    pub max_zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub duration: Duration,
}

impl Default for FitBoundsOptions {
    fn default() -> Self {
        Self {
            padding: 80,
            max_zoom: 14.0,
            pitch: 45.0,
            bearing: 0.0,
            duration: Duration::from_millis(3200),
        }
    }
}
