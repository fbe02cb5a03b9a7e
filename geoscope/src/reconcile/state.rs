//! Declarative dashboard state.
//!
//! `DesiredState` is what the presentation layer mutates; nothing in it
//! touches the engine. The reconciler converges the engine's live layer
//! graph to this description and records what it applied in
//! `AppliedState`, which is how repeated passes over unchanged state issue
//! zero engine calls.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::fetch::Dataset;
use crate::geojson::{BBox, FeatureCollection};
use crate::overlay::{catalog, BaseLayer, OverlayId};
use crate::temporal::TemporalLayer;

/// Desired visibility and parameters for one overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayEntry {
    pub visible: bool,
    /// Overlay-specific parameter hash; for temporal rasters this is the
    /// selected ISO date.
    pub params: Option<String>,
}

/// The complete declared state of the dashboard.
#[derive(Debug, Clone)]
pub struct DesiredState {
    base_layer: BaseLayer,
    overlays: BTreeMap<OverlayId, OverlayEntry>,
    selected_date: NaiveDate,
    dataset: Option<Arc<Dataset>>,
    dataset_revision: u64,
    sensor_data: Option<Arc<FeatureCollection>>,
    sensor_revision: u64,
}

impl DesiredState {
    /// Initial state: catalog defaults, vector base, the given temporal
    /// date, no payloads.
    pub fn new(initial_date: NaiveDate) -> Self {
        let date_params = Some(initial_date.format("%Y-%m-%d").to_string());
        let overlays = catalog()
            .iter()
            .map(|spec| {
                let params = TemporalLayer::ALL
                    .iter()
                    .any(|t| t.overlay_id() == spec.id)
                    .then(|| date_params.clone())
                    .flatten();
                (
                    spec.id,
                    OverlayEntry {
                        visible: spec.default_visible,
                        params,
                    },
                )
            })
            .collect();

        Self {
            base_layer: BaseLayer::Vector,
            overlays,
            selected_date: initial_date,
            dataset: None,
            dataset_revision: 0,
            sensor_data: None,
            sensor_revision: 0,
        }
    }

    pub fn base_layer(&self) -> BaseLayer {
        self.base_layer
    }

    pub fn set_base_layer(&mut self, base: BaseLayer) {
        self.base_layer = base;
    }

    pub fn overlay(&self, id: OverlayId) -> &OverlayEntry {
        // The constructor seeds every catalog id, so the lookup is total.
        &self.overlays[&id]
    }

    pub fn set_overlay_visible(&mut self, id: OverlayId, visible: bool) {
        if let Some(entry) = self.overlays.get_mut(&id) {
            entry.visible = visible;
        }
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    /// Select a new temporal date; mirrors it into the params of every
    /// temporal overlay entry.
    pub fn set_selected_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
        let params = Some(date.format("%Y-%m-%d").to_string());
        for temporal in TemporalLayer::ALL {
            if let Some(entry) = self.overlays.get_mut(&temporal.overlay_id()) {
                entry.params = params.clone();
            }
        }
    }

    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    pub fn dataset_revision(&self) -> u64 {
        self.dataset_revision
    }

    /// Replace (or clear) the imported dataset. Bumps the revision so the
    /// reconciler knows a structural replace is due even when the new
    /// collection compares equal.
    pub fn set_dataset(&mut self, dataset: Option<Arc<Dataset>>) {
        self.dataset = dataset;
        self.dataset_revision += 1;
    }

    /// Bounding box of the current dataset, for camera framing.
    pub fn dataset_bbox(&self) -> Option<BBox> {
        self.dataset.as_ref().and_then(|dataset| dataset.bbox)
    }

    pub fn sensor_data(&self) -> Option<&Arc<FeatureCollection>> {
        self.sensor_data.as_ref()
    }

    pub fn sensor_revision(&self) -> u64 {
        self.sensor_revision
    }

    pub fn set_sensor_data(&mut self, data: Option<Arc<FeatureCollection>>) {
        self.sensor_data = data;
        self.sensor_revision += 1;
    }
}

/// What the reconciler last pushed to the engine.
///
/// Initialized to match the session bootstrap: vector base, catalog
/// default visibilities, placeholder date, no payloads.
#[derive(Debug, Clone)]
pub(crate) struct AppliedState {
    pub base_layer: BaseLayer,
    pub overlays: BTreeMap<OverlayId, OverlayEntry>,
    pub dataset_revision: u64,
    pub framed_bbox: Option<BBox>,
    pub sensor_revision: u64,
}

impl AppliedState {
    pub fn matching_bootstrap(initial_date: NaiveDate) -> Self {
        let desired = DesiredState::new(initial_date);
        Self {
            base_layer: desired.base_layer,
            overlays: desired.overlays,
            dataset_revision: 0,
            framed_bbox: None,
            sensor_revision: 0,
        }
    }
}
