//! GeoJSON data model and bounding-box utilities.
//!
//! This module defines the subset of GeoJSON (RFC 7946) the dashboard
//! consumes: the six basic geometry types, features with free-form JSON
//! properties, and feature collections. Anything else (GeometryCollection,
//! bare geometries, arbitrary JSON) is rejected at parse time so the rest
//! of the engine never sees a payload it cannot render.
//!
//! Bounding boxes are the only spatial analysis performed here; they drive
//! camera framing after a dataset loads.

mod bbox;
mod model;

pub use bbox::{bbox_from_geometry, compute_bbox, pad_bbox, BBox};
pub use model::{Feature, FeatureCollection, GeoJsonError, Geometry, Position};
