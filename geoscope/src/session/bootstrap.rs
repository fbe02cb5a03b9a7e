//! Built-in resource installation at session ready.
//!
//! Runs once the engine's style has loaded. Every add is existence-guarded
//! so a re-entrant load event (style reload, hot remount) installs nothing
//! twice and never trips a duplicate-id error.

use serde_json::json;

use crate::engine::{EngineError, LayerSpec, LayerType, MapEngine, SourceSpec};
use crate::overlay::{
    BUILDINGS_LAYER, BUILDINGS_SOURCE, CO2_LAYER, CO2_SOURCE, HIGHRES_LAYER, HIGHRES_SOURCE,
    OZONE_LAYER, OZONE_SOURCE, SATELLITE_LAYER, SATELLITE_SOURCE, TERRAIN_SOURCE,
};
use crate::temporal::TemporalLayer;

use super::SessionConfig;

/// Elevation tiles for 3D terrain.
const TERRAIN_TILES_URL: &str = "https://demotiles.maplibre.org/terrain-tiles/tiles.json";

/// Cloudless satellite composite, capped at its native max zoom.
const SATELLITE_TILES: &str =
    "https://tiles.maps.eox.at/wmts/1.0.0/s2cloudless-2024_3857/default/GoogleMapsCompatible/{z}/{y}/{x}.jpg";
const SATELLITE_MAX_ZOOM: u8 = 13;

/// High-resolution world aerial imagery.
const HIGHRES_TILES: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";

/// Vector tiles carrying the building extrusion geometry.
const BUILDINGS_TILES_URL: &str = "https://tiles.openfreemap.org/v1/openfreemap.json";

/// Opacity of the temporal atmospheric rasters when visible.
const TEMPORAL_OVERLAY_OPACITY: f64 = 0.7;

/// Anchor layer ids resolved once at session ready.
///
/// `below_labels` is the first text-bearing symbol layer of the style;
/// overlays inserted before it can never cover place names.
/// `below_buildings` is the building-extrusion layer, the ceiling for the
/// atmospheric rasters and sensor circles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackAnchors {
    pub below_labels: Option<String>,
    pub below_buildings: Option<String>,
}

/// Find the first symbol layer that renders text.
fn first_label_layer(engine: &dyn MapEngine) -> Option<String> {
    engine
        .layers()
        .into_iter()
        .find(|info| info.layer_type == LayerType::Symbol && info.has_text_field)
        .map(|info| info.id)
}

/// Install terrain, base rasters, buildings, and temporal placeholders.
///
/// Safe to call more than once; every add is guarded by existence checks.
/// Returns the stacking anchors for the reconciler.
pub fn install_builtins(
    engine: &dyn MapEngine,
    config: &SessionConfig,
) -> Result<StackAnchors, EngineError> {
    let below_labels = first_label_layer(engine);
    let label_anchor = below_labels.as_deref();

    // True 3D terrain from elevation tiles.
    if !engine.has_source(TERRAIN_SOURCE) {
        engine.add_source(
            TERRAIN_SOURCE,
            SourceSpec::RasterDem {
                url: TERRAIN_TILES_URL.to_string(),
                tile_size: 256,
            },
        )?;
        engine.set_terrain(TERRAIN_SOURCE, config.terrain_exaggeration)?;
    }

    // Mutually exclusive base rasters, inserted below labels at opacity 0.
    // They are never removed; the cross-fade animator drives their opacity.
    if !engine.has_source(SATELLITE_SOURCE) {
        engine.add_source(
            SATELLITE_SOURCE,
            SourceSpec::RasterTiles {
                tiles: vec![SATELLITE_TILES.to_string()],
                tile_size: 256,
                max_zoom: Some(SATELLITE_MAX_ZOOM),
                attribution: Some("Sentinel-2 cloudless © EOX / s2maps.eu".to_string()),
            },
        )?;
    }
    if !engine.has_layer(SATELLITE_LAYER) {
        engine.add_layer(
            LayerSpec::new(SATELLITE_LAYER, LayerType::Raster, SATELLITE_SOURCE)
                .with_zoom_range(Some(0), Some(SATELLITE_MAX_ZOOM))
                .with_paint("raster-opacity", json!(0.0)),
            label_anchor,
        )?;
    }

    if !engine.has_source(HIGHRES_SOURCE) {
        engine.add_source(
            HIGHRES_SOURCE,
            SourceSpec::RasterTiles {
                tiles: vec![HIGHRES_TILES.to_string()],
                tile_size: 256,
                max_zoom: None,
                attribution: Some("Esri, Maxar, Earthstar Geographics".to_string()),
            },
        )?;
    }
    if !engine.has_layer(HIGHRES_LAYER) {
        engine.add_layer(
            LayerSpec::new(HIGHRES_LAYER, LayerType::Raster, HIGHRES_SOURCE)
                .with_paint("raster-opacity", json!(0.0)),
            label_anchor,
        )?;
    }

    // Temporal raster sources; their layers are added below the buildings
    // layer once it exists.
    for temporal in TemporalLayer::ALL {
        let spec = temporal.overlay_id().spec();
        if !engine.has_source(spec.source_id) {
            engine.add_source(
                spec.source_id,
                SourceSpec::RasterTiles {
                    tiles: vec![temporal.tile_url(config.initial_date)],
                    tile_size: 256,
                    max_zoom: None,
                    attribution: Some("NASA GIBS".to_string()),
                },
            )?;
        }
    }

    // 3D building extrusions, hidden until toggled.
    if !engine.has_source(BUILDINGS_SOURCE) {
        engine.add_source(
            BUILDINGS_SOURCE,
            SourceSpec::Vector {
                url: BUILDINGS_TILES_URL.to_string(),
            },
        )?;
    }
    if !engine.has_layer(BUILDINGS_LAYER) {
        engine.add_layer(
            LayerSpec::new(BUILDINGS_LAYER, LayerType::FillExtrusion, BUILDINGS_SOURCE)
                .with_source_layer("building")
                .with_zoom_range(Some(14), None)
                .with_filter(json!(["!=", ["get", "hide_3d"], true]))
                .with_layout("visibility", json!("none"))
                .with_paint(
                    "fill-extrusion-color",
                    json!([
                        "interpolate",
                        ["linear"],
                        ["get", "render_height"],
                        0,
                        "rgb(180,180,200)",
                        200,
                        "rgb(120,140,180)",
                        400,
                        "rgb(100,120,160)"
                    ]),
                )
                .with_paint(
                    "fill-extrusion-height",
                    json!([
                        "interpolate",
                        ["linear"],
                        ["zoom"],
                        14,
                        0,
                        16,
                        ["get", "render_height"]
                    ]),
                )
                .with_paint(
                    "fill-extrusion-base",
                    json!(["step", ["zoom"], 0, 16, ["get", "render_min_height"]]),
                ),
            label_anchor,
        )?;
    }

    // Temporal layers above base rasters, below buildings, hidden until
    // their overlay is enabled.
    let buildings_anchor = engine.has_layer(BUILDINGS_LAYER).then_some(BUILDINGS_LAYER);
    for (temporal, layer_id) in [
        (TemporalLayer::CarbonDioxide, CO2_LAYER),
        (TemporalLayer::Ozone, OZONE_LAYER),
    ] {
        let spec = temporal.overlay_id().spec();
        if !engine.has_layer(layer_id) {
            engine.add_layer(
                LayerSpec::new(layer_id, LayerType::Raster, spec.source_id)
                    .with_layout("visibility", json!("none"))
                    .with_paint("raster-opacity", json!(TEMPORAL_OVERLAY_OPACITY)),
                buildings_anchor,
            )?;
        }
    }

    Ok(StackAnchors {
        below_labels,
        below_buildings: buildings_anchor.map(str::to_string),
    })
}
