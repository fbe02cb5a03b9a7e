//! Bounding-box computation over GeoJSON geometry.

use super::model::{Feature, FeatureCollection, Geometry, Position};

/// `[min_lon, min_lat, max_lon, max_lat]` in degrees.
pub type BBox = [f64; 4];

struct Extent {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl Extent {
    fn new() -> Self {
        Self {
            min_lon: f64::INFINITY,
            min_lat: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            max_lat: f64::NEG_INFINITY,
        }
    }

    fn expand(&mut self, position: &Position) {
        // Positions with fewer than two ordinates are malformed; skip them
        // rather than poisoning the whole extent.
        let (Some(&lon), Some(&lat)) = (position.first(), position.get(1)) else {
            return;
        };
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }

    fn expand_geometry(&mut self, geometry: &Geometry) {
        match geometry {
            Geometry::Point { coordinates } => self.expand(coordinates),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                coordinates.iter().for_each(|p| self.expand(p));
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                for ring in coordinates {
                    ring.iter().for_each(|p| self.expand(p));
                }
            }
            Geometry::MultiPolygon { coordinates } => {
                for polygon in coordinates {
                    for ring in polygon {
                        ring.iter().for_each(|p| self.expand(p));
                    }
                }
            }
        }
    }

    fn finish(self) -> Option<BBox> {
        if self.min_lon.is_finite() && self.min_lat.is_finite() {
            Some([self.min_lon, self.min_lat, self.max_lon, self.max_lat])
        } else {
            None
        }
    }
}

/// Bounding box of a single geometry, or `None` when it holds no valid
/// positions.
pub fn bbox_from_geometry(geometry: &Geometry) -> Option<BBox> {
    let mut extent = Extent::new();
    extent.expand_geometry(geometry);
    extent.finish()
}

/// Bounding box of every geometry in the collection.
///
/// Features without geometry contribute nothing; an empty or geometry-free
/// collection yields `None`.
pub fn compute_bbox(collection: &FeatureCollection) -> Option<BBox> {
    let mut extent = Extent::new();
    for feature in &collection.features {
        if let Some(geometry) = &feature.geometry {
            extent.expand_geometry(geometry);
        }
    }
    extent.finish()
}

/// Expand a bounding box about its center by a ratio (1.2 = 20% padding).
///
/// A degenerate (zero-size) box keeps its center and stays degenerate.
pub fn pad_bbox(bbox: BBox, ratio: f64) -> BBox {
    let [min_lon, min_lat, max_lon, max_lat] = bbox;
    let center_lon = (min_lon + max_lon) / 2.0;
    let center_lat = (min_lat + max_lat) / 2.0;
    let half_width = (max_lon - min_lon) / 2.0 * ratio;
    let half_height = (max_lat - min_lat) / 2.0 * ratio;
    [
        center_lon - half_width,
        center_lat - half_height,
        center_lon + half_width,
        center_lat + half_height,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::Feature;
    use proptest::prelude::*;
    use serde_json::Map;

    fn point_collection(points: &[(f64, f64)]) -> FeatureCollection {
        FeatureCollection::new(
            points
                .iter()
                .map(|&(lon, lat)| Feature::point(lon, lat, Map::new()))
                .collect(),
        )
    }

    #[test]
    fn single_point_yields_degenerate_bbox() {
        let fc = point_collection(&[(10.0, 20.0)]);
        assert_eq!(compute_bbox(&fc), Some([10.0, 20.0, 10.0, 20.0]));
    }

    #[test]
    fn multiple_points_span_extent() {
        let fc = point_collection(&[(-5.0, 2.0), (3.0, -1.0), (1.0, 7.0)]);
        assert_eq!(compute_bbox(&fc), Some([-5.0, -1.0, 3.0, 7.0]));
    }

    #[test]
    fn empty_collection_has_no_bbox() {
        assert_eq!(compute_bbox(&FeatureCollection::empty()), None);
    }

    #[test]
    fn geometry_free_features_have_no_bbox() {
        let fc = FeatureCollection::new(vec![Feature::new(None, Map::new())]);
        assert_eq!(compute_bbox(&fc), None);
    }

    #[test]
    fn polygon_bbox_covers_all_rings() {
        let geometry = Geometry::Polygon {
            coordinates: vec![
                vec![
                    vec![0.0, 0.0],
                    vec![4.0, 0.0],
                    vec![4.0, 4.0],
                    vec![0.0, 4.0],
                    vec![0.0, 0.0],
                ],
                vec![vec![1.0, 1.0], vec![2.0, 1.0], vec![1.0, 2.0], vec![1.0, 1.0]],
            ],
        };
        assert_eq!(bbox_from_geometry(&geometry), Some([0.0, 0.0, 4.0, 4.0]));
    }

    #[test]
    fn short_positions_are_skipped() {
        let geometry = Geometry::MultiPoint {
            coordinates: vec![vec![7.0], vec![1.0, 2.0]],
        };
        assert_eq!(bbox_from_geometry(&geometry), Some([1.0, 2.0, 1.0, 2.0]));
    }

    #[test]
    fn pad_keeps_degenerate_box_centered() {
        assert_eq!(pad_bbox([10.0, 20.0, 10.0, 20.0], 1.2), [10.0, 20.0, 10.0, 20.0]);
    }

    #[test]
    fn pad_expands_about_center() {
        let padded = pad_bbox([0.0, 0.0, 10.0, 4.0], 1.5);
        assert_eq!(padded, [-2.5, -1.0, 12.5, 5.0]);
    }

    proptest! {
        #[test]
        fn pad_preserves_center(
            min_lon in -180.0f64..180.0,
            min_lat in -85.0f64..85.0,
            width in 0.0f64..10.0,
            height in 0.0f64..10.0,
            ratio in 0.1f64..3.0,
        ) {
            let bbox = [min_lon, min_lat, min_lon + width, min_lat + height];
            let padded = pad_bbox(bbox, ratio);
            let center = ((bbox[0] + bbox[2]) / 2.0, (bbox[1] + bbox[3]) / 2.0);
            let padded_center = ((padded[0] + padded[2]) / 2.0, (padded[1] + padded[3]) / 2.0);
            prop_assert!((center.0 - padded_center.0).abs() < 1e-9);
            prop_assert!((center.1 - padded_center.1).abs() < 1e-9);
        }

        #[test]
        fn pad_scales_width(
            width in 0.0f64..10.0,
            ratio in 0.1f64..3.0,
        ) {
            let padded = pad_bbox([0.0, 0.0, width, width], ratio);
            prop_assert!(((padded[2] - padded[0]) - width * ratio).abs() < 1e-9);
        }
    }
}
