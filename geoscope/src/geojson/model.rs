//! Core GeoJSON types.
//!
//! The model is deliberately tolerant on input: features may omit geometry
//! or properties, and positions may carry altitude or other trailing
//! ordinates. It is strict on shape: the `type` tag must name a known
//! GeoJSON object, which is how schema failures surface as parse errors
//! instead of silently empty maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A GeoJSON position: `[longitude, latitude, ...]`.
///
/// Trailing ordinates (altitude) are preserved but ignored; positions with
/// fewer than two ordinates are treated as malformed and skipped by the
/// bounding-box routines.
pub type Position = Vec<f64>;

/// Errors produced when interpreting a JSON payload as GeoJSON.
#[derive(Debug, Clone, Error)]
pub enum GeoJsonError {
    /// The payload parsed as JSON but is not a Feature or FeatureCollection.
    #[error("not a GeoJSON Feature or FeatureCollection: {0}")]
    UnsupportedRoot(String),

    /// The payload did not match the GeoJSON schema.
    #[error("invalid GeoJSON: {0}")]
    Schema(String),
}

/// The six basic GeoJSON geometry types.
///
/// `GeometryCollection` is intentionally unsupported; the engine renders
/// homogeneous overlays and the upstream feeds never produce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

impl Geometry {
    /// Build a Point geometry from longitude/latitude.
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point {
            coordinates: vec![lon, lat],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureTag {
    Feature,
}

/// A single GeoJSON feature: optional geometry plus free-form properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    tag: FeatureTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Create a feature from a geometry and a property map.
    pub fn new(geometry: Option<Geometry>, properties: Map<String, Value>) -> Self {
        Self {
            tag: FeatureTag::Feature,
            geometry,
            properties,
        }
    }

    /// Convenience constructor for a Point feature.
    pub fn point(lon: f64, lat: f64, properties: Map<String, Value>) -> Self {
        Self::new(Some(Geometry::point(lon, lat)), properties)
    }

    /// Read a numeric property, if present.
    pub fn number_property(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum CollectionTag {
    FeatureCollection,
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    tag: CollectionTag,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Create a collection from a list of features.
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            tag: CollectionTag::FeatureCollection,
            features,
        }
    }

    /// Create an empty collection.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Interpret a parsed JSON value as a FeatureCollection.
    ///
    /// A bare `Feature` is accepted and wrapped into a single-element
    /// collection, matching what ad-hoc endpoints commonly return. Any
    /// other root object is an [`GeoJsonError::UnsupportedRoot`].
    pub fn from_json(value: Value) -> Result<Self, GeoJsonError> {
        let root = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("missing type tag")
            .to_string();

        match root.as_str() {
            "FeatureCollection" => serde_json::from_value(value)
                .map_err(|e| GeoJsonError::Schema(e.to_string())),
            "Feature" => {
                let feature: Feature = serde_json::from_value(value)
                    .map_err(|e| GeoJsonError::Schema(e.to_string()))?;
                Ok(Self::new(vec![feature]))
            }
            _ => Err(GeoJsonError::UnsupportedRoot(root)),
        }
    }
}
