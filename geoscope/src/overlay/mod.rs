//! Overlay catalog: the immutable declaration of everything the dashboard
//! can toggle, and where each piece sits in the layer stack.
//!
//! Stacking is declared once, here, as an anchor relative to named style
//! layers (below the first label layer, below the 3D buildings). The
//! reconciler inserts at the anchor or structurally replaces, but never
//! reorders layers that already exist.

use std::fmt;

/// The mutually exclusive background imagery choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseLayer {
    /// The style's own vector cartography (no raster on top).
    Vector,
    /// Cloudless satellite composite, capped at its native max zoom.
    Satellite,
    /// High-resolution world aerial imagery.
    HighRes,
}

impl fmt::Display for BaseLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseLayer::Vector => write!(f, "vector"),
            BaseLayer::Satellite => write!(f, "satellite"),
            BaseLayer::HighRes => write!(f, "high-res"),
        }
    }
}

/// Identifier of a toggleable overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OverlayId {
    /// 3D terrain relief from elevation tiles.
    Terrain,
    /// Extruded building volumes.
    Buildings3d,
    /// Daily CO₂ surface-concentration raster.
    CarbonDioxide,
    /// Daily total-column ozone raster.
    Ozone,
    /// Live PM2.5 sensor circles.
    AirQuality,
    /// The currently imported GeoJSON dataset.
    Dataset,
}

impl OverlayId {
    pub fn label(&self) -> &'static str {
        match self {
            OverlayId::Terrain => "terrain",
            OverlayId::Buildings3d => "3d-buildings",
            OverlayId::CarbonDioxide => "co2",
            OverlayId::Ozone => "ozone",
            OverlayId::AirQuality => "air-quality",
            OverlayId::Dataset => "dataset",
        }
    }

    /// Catalog entry for this overlay.
    pub fn spec(&self) -> &'static OverlaySpec {
        match self {
            OverlayId::Terrain => &CATALOG[0],
            OverlayId::Buildings3d => &CATALOG[1],
            OverlayId::CarbonDioxide => &CATALOG[2],
            OverlayId::Ozone => &CATALOG[3],
            OverlayId::AirQuality => &CATALOG[4],
            OverlayId::Dataset => &CATALOG[5],
        }
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How an overlay's data reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// Tiled raster imagery; toggled by layout visibility, retargeted by
    /// in-place tile-URL replacement.
    Raster,
    /// Tiled vector geometry (building extrusions); toggled by visibility.
    Vector,
    /// Point data rendered as circles; structurally replaced when the
    /// underlying dataset changes.
    CirclePoint,
}

/// Where an overlay's layers are inserted relative to the style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackAnchor {
    /// Below the first text-bearing symbol layer, so imagery never covers
    /// place names.
    BelowLabels,
    /// Below the building extrusions (and therefore above base rasters).
    BelowBuildings,
    /// On top of everything; used by the imported dataset.
    Top,
}

/// Immutable catalog entry for one overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySpec {
    pub id: OverlayId,
    pub kind: OverlayKind,
    pub anchor: StackAnchor,
    pub default_visible: bool,
    /// Engine layer ids belonging to this overlay, in paint order.
    pub layer_ids: &'static [&'static str],
    pub source_id: &'static str,
}

// Engine resource ids. Declared once; bootstrap, reconciler, and animator
// all refer to these.
pub const TERRAIN_SOURCE: &str = "terrain-dem";
pub const SATELLITE_SOURCE: &str = "satellite-composite";
pub const SATELLITE_LAYER: &str = "satellite-base";
pub const HIGHRES_SOURCE: &str = "world-imagery";
pub const HIGHRES_LAYER: &str = "world-imagery-base";
pub const BUILDINGS_SOURCE: &str = "openmap-vector";
pub const BUILDINGS_LAYER: &str = "buildings-3d";
pub const CO2_SOURCE: &str = "atmosphere-co2";
pub const CO2_LAYER: &str = "co2-overlay";
pub const OZONE_SOURCE: &str = "atmosphere-ozone";
pub const OZONE_LAYER: &str = "ozone-overlay";
pub const AIR_QUALITY_SOURCE: &str = "air-quality";
pub const AIR_QUALITY_GLOW_LAYER: &str = "air-quality-glow";
pub const AIR_QUALITY_POINTS_LAYER: &str = "air-quality-points";
pub const DATASET_SOURCE: &str = "dataset";
pub const DATASET_LAYER: &str = "dataset-points";

const CATALOG: &[OverlaySpec] = &[
    OverlaySpec {
        id: OverlayId::Terrain,
        kind: OverlayKind::Raster,
        anchor: StackAnchor::BelowLabels,
        default_visible: true,
        layer_ids: &[],
        source_id: TERRAIN_SOURCE,
    },
    OverlaySpec {
        id: OverlayId::Buildings3d,
        kind: OverlayKind::Vector,
        anchor: StackAnchor::BelowLabels,
        default_visible: false,
        layer_ids: &[BUILDINGS_LAYER],
        source_id: BUILDINGS_SOURCE,
    },
    OverlaySpec {
        id: OverlayId::CarbonDioxide,
        kind: OverlayKind::Raster,
        anchor: StackAnchor::BelowBuildings,
        default_visible: false,
        layer_ids: &[CO2_LAYER],
        source_id: CO2_SOURCE,
    },
    OverlaySpec {
        id: OverlayId::Ozone,
        kind: OverlayKind::Raster,
        anchor: StackAnchor::BelowBuildings,
        default_visible: false,
        layer_ids: &[OZONE_LAYER],
        source_id: OZONE_SOURCE,
    },
    OverlaySpec {
        id: OverlayId::AirQuality,
        kind: OverlayKind::CirclePoint,
        anchor: StackAnchor::BelowBuildings,
        default_visible: false,
        layer_ids: &[AIR_QUALITY_GLOW_LAYER, AIR_QUALITY_POINTS_LAYER],
        source_id: AIR_QUALITY_SOURCE,
    },
    OverlaySpec {
        id: OverlayId::Dataset,
        kind: OverlayKind::CirclePoint,
        anchor: StackAnchor::Top,
        default_visible: true,
        layer_ids: &[DATASET_LAYER],
        source_id: DATASET_SOURCE,
    },
];

/// The full overlay catalog, in stacking-irrelevant declaration order.
pub fn catalog() -> &'static [OverlaySpec] {
    CATALOG
}
