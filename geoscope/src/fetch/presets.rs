//! Known dataset presets and their mock fallbacks.
//!
//! Each preset names a public GeoJSON endpoint plus a synthesizer that
//! produces a stand-in collection of comparable shape: same order of
//! magnitude of features, plausible property names and value ranges. The
//! mock keeps the dashboard demonstrable when an endpoint is down or
//! CORS-blocked; provenance flagging makes the substitution loud.

use std::str::FromStr;

use rand::Rng;
use serde_json::{json, Map, Value};

use crate::geojson::{Feature, FeatureCollection};

/// The built-in dataset presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresetId {
    /// Worldwide earthquakes from the last 24 hours.
    Earthquakes,
    /// Municipal street-tree inventory.
    CityTrees,
    /// Satellite-detected surface anomalies.
    SatelliteAnomalies,
}

impl PresetId {
    pub const ALL: [PresetId; 3] = [
        PresetId::Earthquakes,
        PresetId::CityTrees,
        PresetId::SatelliteAnomalies,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PresetId::Earthquakes => "earthquakes",
            PresetId::CityTrees => "city-trees",
            PresetId::SatelliteAnomalies => "satellite-anomalies",
        }
    }

    /// The upstream endpoint for this preset.
    pub fn url(&self) -> &'static str {
        match self {
            PresetId::Earthquakes => {
                "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_day.geojson"
            }
            PresetId::CityTrees => {
                "https://opendata.paris.fr/api/explore/v2.1/catalog/datasets/les-arbres/exports/geojson"
            }
            PresetId::SatelliteAnomalies => {
                "https://raw.githubusercontent.com/datasets/geo-boundaries-world-110m/master/countries.geojson"
            }
        }
    }

    /// Synthesize a mock collection of comparable shape to the real feed.
    pub(crate) fn mock_collection(&self) -> FeatureCollection {
        let mut rng = rand::rng();
        let center_lon = rng.random_range(-98.0..-78.0);
        let center_lat = rng.random_range(38.0..48.0);

        let features = match self {
            PresetId::Earthquakes => (0..24)
                .map(|i| {
                    let magnitude = round1(rng.random_range(2.0..6.0));
                    point_feature(
                        center_lon + rng.random_range(-4.0..4.0),
                        center_lat + rng.random_range(-3.0..3.0),
                        json_props(&[
                            ("mag", json!(magnitude)),
                            ("place", json!(format!("Mock earthquake {}", i + 1))),
                            ("title", json!(format!("M {:.1} - Mock", magnitude))),
                        ]),
                    )
                })
                .collect(),
            PresetId::CityTrees => {
                const SPECIES: [&str; 5] = ["Oak", "Maple", "Pine", "Birch", "Willow"];
                (0..40)
                    .map(|i| {
                        point_feature(
                            center_lon + rng.random_range(-0.025..0.025),
                            center_lat + rng.random_range(-0.025..0.025),
                            json_props(&[
                                ("common_name", json!(SPECIES[i % SPECIES.len()])),
                                ("height_m", json!(round1(rng.random_range(3.0..18.0)))),
                                ("id", json!(format!("tree-{}", i + 1))),
                            ]),
                        )
                    })
                    .collect()
            }
            PresetId::SatelliteAnomalies => {
                const KINDS: [&str; 3] = ["thermal", "ndvi_drop", "flood"];
                (0..15)
                    .map(|i| {
                        point_feature(
                            center_lon + rng.random_range(-3.0..3.0),
                            center_lat + rng.random_range(-2.0..2.0),
                            json_props(&[
                                ("anomaly_type", json!(KINDS[i % KINDS.len()])),
                                (
                                    "confidence",
                                    json!((rng.random_range(0.6f64..1.0) * 100.0).round() / 100.0),
                                ),
                                (
                                    "date",
                                    json!(chrono::Utc::now().date_naive().to_string()),
                                ),
                            ]),
                        )
                    })
                    .collect()
            }
        };

        FeatureCollection::new(features)
    }
}

impl FromStr for PresetId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetId::ALL
            .into_iter()
            .find(|preset| preset.label() == s)
            .ok_or_else(|| format!("unknown preset: {}", s))
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn point_feature(lon: f64, lat: f64, properties: Map<String, Value>) -> Feature {
    Feature::point(lon, lat, properties)
}

fn json_props(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::compute_bbox;

    #[test]
    fn mock_earthquakes_have_comparable_shape() {
        let fc = PresetId::Earthquakes.mock_collection();
        assert_eq!(fc.len(), 24);
        for feature in &fc.features {
            let magnitude = feature.number_property("mag").unwrap();
            assert!((2.0..=6.0).contains(&magnitude));
            assert!(feature.properties.contains_key("place"));
        }
    }

    #[test]
    fn mock_trees_cluster_tightly() {
        let fc = PresetId::CityTrees.mock_collection();
        assert_eq!(fc.len(), 40);
        let bbox = compute_bbox(&fc).unwrap();
        assert!(bbox[2] - bbox[0] <= 0.05 + 1e-9);
        assert!(bbox[3] - bbox[1] <= 0.05 + 1e-9);
    }

    #[test]
    fn mock_anomalies_carry_confidence() {
        let fc = PresetId::SatelliteAnomalies.mock_collection();
        assert_eq!(fc.len(), 15);
        for feature in &fc.features {
            let confidence = feature.number_property("confidence").unwrap();
            assert!((0.6..=1.0).contains(&confidence));
        }
    }

    #[test]
    fn preset_ids_round_trip_through_labels() {
        for preset in PresetId::ALL {
            assert_eq!(preset.label().parse::<PresetId>().unwrap(), preset);
        }
        assert!("volcanoes".parse::<PresetId>().is_err());
    }
}
