//! The declarative facade exposed to the presentation layer.
//!
//! Widgets never touch the engine. They call the setters here; every
//! setter mutates the [`DesiredState`] and then synchronously runs one
//! reconciliation pass, so by the time a setter returns, the engine
//! matches the declaration. Async entry points (dataset loads, sensor
//! refresh, tours) re-check session aliveness after every suspension
//! point through the components they delegate to.

use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::debug;

use crate::animate::CrossFadeAnimator;
use crate::engine::MapEngine;
use crate::fetch::{
    sensors, DataSource, FetchCoordinator, FetchError, FetchSnapshot, HttpFetch, LoadOutcome,
};
use crate::geojson::Feature;
use crate::overlay::{BaseLayer, OverlayId, DATASET_LAYER};
use crate::reconcile::{DesiredState, Reconciler};
use crate::session::{MapSession, SessionConfig, SessionError};
use crate::telemetry::{MetricsSnapshot, SessionMetrics};
use crate::tour::{TourOutcome, TourSequencer, TourStop};

/// Owns the session and its collaborators and exposes the declarative
/// dashboard surface.
pub struct MapController {
    session: Arc<MapSession>,
    http: Arc<dyn HttpFetch>,
    fetch: FetchCoordinator,
    reconciler: Reconciler,
    metrics: Arc<SessionMetrics>,
    desired: Mutex<DesiredState>,
}

impl MapController {
    /// Create the session over the given engine and drive it to ready.
    ///
    /// Fatal initialization failures propagate; there is no retry, the
    /// caller remounts with a fresh engine.
    pub async fn connect(
        engine: Arc<dyn MapEngine>,
        config: SessionConfig,
        http: Arc<dyn HttpFetch>,
    ) -> Result<Self, SessionError> {
        let initial_date = config.initial_date;
        let session = MapSession::create(engine, config).await?;
        let animator = Arc::new(CrossFadeAnimator::new(Arc::clone(&session)));
        let metrics = Arc::new(SessionMetrics::new());
        let reconciler = Reconciler::new(
            Arc::clone(&session),
            animator,
            Arc::clone(&metrics),
        );

        let controller = Self {
            session,
            http: Arc::clone(&http),
            fetch: FetchCoordinator::new(http),
            reconciler,
            metrics,
            desired: Mutex::new(DesiredState::new(initial_date)),
        };
        // Initial pass converges nothing (bootstrap already matches) but
        // establishes the invariant that state and engine agree after
        // every public mutation.
        controller.run_reconcile_pass();
        Ok(controller)
    }

    fn run_reconcile_pass(&self) {
        let desired = self.desired.lock().clone();
        self.reconciler.reconcile(&desired);
    }

    pub fn session(&self) -> &Arc<MapSession> {
        &self.session
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_alive()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Loading/error/mocked flags for the data panel.
    pub fn fetch_state(&self) -> FetchSnapshot {
        self.fetch.snapshot()
    }

    // ── Declarative setters ──────────────────────────────────────────────

    pub fn set_base_layer(&self, base: BaseLayer) {
        self.desired.lock().set_base_layer(base);
        self.run_reconcile_pass();
    }

    pub fn set_overlay_visible(&self, id: OverlayId, visible: bool) {
        self.desired.lock().set_overlay_visible(id, visible);
        self.run_reconcile_pass();
    }

    pub fn set_buildings_visible(&self, visible: bool) {
        self.set_overlay_visible(OverlayId::Buildings3d, visible);
    }

    pub fn set_selected_date(&self, date: NaiveDate) {
        self.desired.lock().set_selected_date(date);
        self.run_reconcile_pass();
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.desired.lock().selected_date()
    }

    // ── Dataset loading ──────────────────────────────────────────────────

    /// Load a preset or custom-URL dataset and converge the map to it.
    ///
    /// The returned outcome mirrors the coordinator's commit decision;
    /// stale responses leave the map untouched.
    pub async fn load_dataset(&self, source: DataSource) -> LoadOutcome {
        let outcome = self.fetch.load(source).await;
        match &outcome {
            LoadOutcome::Committed(dataset) => {
                self.metrics.record_dataset_loaded();
                if dataset.is_mocked() {
                    self.metrics.record_mock_fallback();
                }
                self.desired.lock().set_dataset(Some(Arc::clone(dataset)));
                self.run_reconcile_pass();
            }
            LoadOutcome::Stale => {
                self.metrics.record_stale_discard();
            }
            LoadOutcome::Failed(error) => {
                debug!(error = %error, "Dataset load failed; clearing overlay");
                self.desired.lock().set_dataset(None);
                self.run_reconcile_pass();
            }
        }
        outcome
    }

    /// Drop the loaded dataset and its overlay.
    pub fn clear_dataset(&self) {
        self.fetch.clear();
        self.desired.lock().set_dataset(None);
        self.run_reconcile_pass();
    }

    /// Refresh the live air-quality overlay.
    ///
    /// Returns the number of stations plotted. Failures surface; there is
    /// no mock shape for live measurements.
    pub async fn refresh_air_quality(&self) -> Result<usize, FetchError> {
        let collection = sensors::fetch_latest(self.http.as_ref()).await?;
        let stations = collection.len();
        self.desired.lock().set_sensor_data(Some(Arc::new(collection)));
        self.run_reconcile_pass();
        Ok(stations)
    }

    // ── Interaction ──────────────────────────────────────────────────────

    /// Hit-test a click against the dataset layer only.
    pub fn feature_at(&self, lon: f64, lat: f64) -> Option<Feature> {
        if !self.session.is_alive() {
            return None;
        }
        self.session
            .engine()
            .query_features_at(lon, lat, DATASET_LAYER)
            .into_iter()
            .next()
    }

    /// Build a tour sequencer bound to this session and its metrics.
    /// Subscribe to it for step-changed notifications before running.
    pub fn tour(&self) -> TourSequencer {
        TourSequencer::new(Arc::clone(&self.session)).with_metrics(Arc::clone(&self.metrics))
    }

    /// Run a tour with the default pacing.
    pub async fn run_tour(&self, stops: &[TourStop]) -> TourOutcome {
        self.tour().run(stops).await
    }

    /// Tear down the session. All in-flight work no-ops from here on.
    pub fn dispose(&self) {
        self.session.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::HeadlessEngine;
    use crate::fetch::{MockHttp, MockResponse, PresetId};
    use crate::overlay::{BUILDINGS_LAYER, CO2_LAYER, CO2_SOURCE};
    use serde_json::json;

    fn config() -> SessionConfig {
        SessionConfig::default()
            .with_initial_date(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap())
    }

    async fn controller_with(
        mock: MockHttp,
    ) -> (Arc<HeadlessEngine>, MapController) {
        let engine = Arc::new(HeadlessEngine::new());
        let controller = MapController::connect(engine.clone(), config(), Arc::new(mock))
            .await
            .unwrap();
        (engine, controller)
    }

    #[tokio::test]
    async fn setters_converge_synchronously() {
        let (engine, controller) = controller_with(MockHttp::new()).await;

        controller.set_buildings_visible(true);
        assert_eq!(engine.layout_visibility(BUILDINGS_LAYER).unwrap(), "visible");

        controller.set_overlay_visible(OverlayId::CarbonDioxide, true);
        assert_eq!(engine.layout_visibility(CO2_LAYER).unwrap(), "visible");

        controller.set_selected_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(engine.source_tiles(CO2_SOURCE).unwrap()[0].contains("2024-03-01"));
    }

    #[tokio::test]
    async fn preset_failure_lands_as_loud_mock() {
        let mock = MockHttp::new().route("earthquake.usgs.gov", MockResponse::status(500));
        let (engine, controller) = controller_with(mock).await;

        let outcome = controller
            .load_dataset(DataSource::Preset(PresetId::Earthquakes))
            .await;
        assert!(matches!(outcome, LoadOutcome::Committed(_)));
        assert!(controller.fetch_state().mocked);
        assert!(engine.has_layer(DATASET_LAYER));
        assert_eq!(controller.metrics().mock_fallbacks, 1);
    }

    #[tokio::test]
    async fn custom_url_failure_clears_the_overlay() {
        let mock = MockHttp::new().route("bad.example", MockResponse::status(500));
        let (engine, controller) = controller_with(mock).await;

        let outcome = controller
            .load_dataset(DataSource::Url("https://bad.example/data.json".into()))
            .await;
        assert!(matches!(outcome, LoadOutcome::Failed(_)));
        assert!(!engine.has_layer(DATASET_LAYER));
        assert!(controller.fetch_state().error.is_some());
    }

    #[tokio::test]
    async fn feature_click_hits_dataset_layer_only() {
        let body = serde_json::to_vec(&json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [10.0, 20.0] },
                    "properties": { "name": "station" }
                }
            ]
        }))
        .unwrap();
        let mock = MockHttp::new().route("good.example", MockResponse::ok(body));
        let (_engine, controller) = controller_with(mock).await;

        controller
            .load_dataset(DataSource::Url("https://good.example/data.json".into()))
            .await;

        let hit = controller.feature_at(10.0, 20.0).unwrap();
        assert_eq!(
            hit.properties.get("name"),
            Some(&serde_json::Value::String("station".into()))
        );
        assert!(controller.feature_at(-100.0, -80.0).is_none());
    }

    #[tokio::test]
    async fn air_quality_refresh_plots_stations() {
        let body = serde_json::to_vec(&json!({
            "results": [
                {
                    "coordinates": { "latitude": 48.85, "longitude": 2.35 },
                    "value": 17.0
                }
            ]
        }))
        .unwrap();
        let mock = MockHttp::new().route("api.openaq.org", MockResponse::ok(body));
        let (engine, controller) = controller_with(mock).await;

        let stations = controller.refresh_air_quality().await.unwrap();
        assert_eq!(stations, 1);
        assert!(engine.has_source(crate::overlay::AIR_QUALITY_SOURCE));
    }

    #[tokio::test]
    async fn dispose_makes_every_surface_inert() {
        let (engine, controller) = controller_with(MockHttp::new()).await;

        controller.dispose();
        assert!(!controller.is_ready());

        let ops = engine.op_count();
        controller.set_buildings_visible(true);
        controller.clear_dataset();
        assert_eq!(engine.op_count(), ops);
        assert!(controller.feature_at(0.0, 0.0).is_none());
    }
}
