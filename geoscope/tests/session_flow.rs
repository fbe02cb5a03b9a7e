//! Integration tests for the full dashboard session flow.
//!
//! These tests drive the complete stack the way the presentation layer
//! would — controller → reconciler → engine — over the headless engine
//! and a scripted HTTP client:
//! - declarative toggles converging the live layer graph
//! - preset fetch failure degrading to loudly mocked data
//! - stale responses losing to the most recent request
//! - tours and cross-fades dying cleanly on dispose
//!
//! Run with: `cargo test --test session_flow`

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::json;

use geoscope::engine::BoxFuture;
use geoscope::fetch::{FetchError, HttpFetch};
use geoscope::overlay::{
    BUILDINGS_LAYER, CO2_LAYER, CO2_SOURCE, DATASET_LAYER, SATELLITE_LAYER,
};
use geoscope::{
    showcase_tour, BaseLayer, DataSource, HeadlessEngine, MapController, MapEngine, OverlayId,
    PresetId, SessionConfig,
};

// ============================================================================
// Scripted HTTP client
// ============================================================================

type Route = (String, Result<Vec<u8>, FetchError>, Duration);

/// Substring-routed HTTP stub for integration flows.
#[derive(Default)]
struct ScriptedHttp {
    routes: Mutex<Vec<Route>>,
}

impl ScriptedHttp {
    fn new() -> Self {
        Self::default()
    }

    fn route(self, fragment: &str, response: Result<Vec<u8>, FetchError>) -> Self {
        self.routes
            .lock()
            .push((fragment.to_string(), response, Duration::ZERO));
        self
    }

    fn slow_route(
        self,
        fragment: &str,
        response: Result<Vec<u8>, FetchError>,
        delay: Duration,
    ) -> Self {
        self.routes
            .lock()
            .push((fragment.to_string(), response, delay));
        self
    }
}

impl HttpFetch for ScriptedHttp {
    fn get(&self, url: &str) -> BoxFuture<'_, Result<Vec<u8>, FetchError>> {
        let hit = self
            .routes
            .lock()
            .iter()
            .find(|(fragment, _, _)| url.contains(fragment.as_str()))
            .map(|(_, response, delay)| (response.clone(), *delay));
        let url = url.to_string();
        Box::pin(async move {
            match hit {
                Some((response, delay)) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    response
                }
                None => Err(FetchError::Http(format!("no scripted route for {}", url))),
            }
        })
    }

    fn exists(&self, _url: &str) -> BoxFuture<'_, Result<bool, FetchError>> {
        Box::pin(async { Ok(false) })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn initial_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

fn config() -> SessionConfig {
    SessionConfig::default().with_initial_date(initial_date())
}

async fn connect(
    http: ScriptedHttp,
) -> (Arc<HeadlessEngine>, MapController) {
    let engine = Arc::new(HeadlessEngine::new());
    let controller = MapController::connect(engine.clone(), config(), Arc::new(http))
        .await
        .expect("headless session should initialize");
    (engine, controller)
}

fn feature_collection_body(points: &[(f64, f64)]) -> Vec<u8> {
    let features: Vec<_> = points
        .iter()
        .map(|(lon, lat)| {
            json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [lon, lat] },
                "properties": { "station": format!("{},{}", lon, lat) }
            })
        })
        .collect();
    serde_json::to_vec(&json!({ "type": "FeatureCollection", "features": features })).unwrap()
}

fn server_error() -> Result<Vec<u8>, FetchError> {
    Err(FetchError::Status {
        status: 500,
        url: String::new(),
    })
}

// ============================================================================
// Integration Tests
// ============================================================================

/// Declarative changes flow through the controller and land on the engine
/// within the same call.
#[tokio::test(start_paused = true)]
async fn declarative_state_converges_onto_the_engine() {
    let (engine, controller) = connect(ScriptedHttp::new()).await;

    // Toggles.
    controller.set_overlay_visible(OverlayId::CarbonDioxide, true);
    controller.set_buildings_visible(true);
    assert_eq!(engine.layout_visibility(CO2_LAYER).unwrap(), "visible");
    assert_eq!(engine.layout_visibility(BUILDINGS_LAYER).unwrap(), "visible");

    // Temporal date: in-place tile retarget, no layer churn.
    controller.set_selected_date(NaiveDate::from_ymd_opt(2024, 2, 20).unwrap());
    assert!(engine.source_tiles(CO2_SOURCE).unwrap()[0].contains("2024-02-20"));
    assert!(engine.has_layer(CO2_LAYER));

    // Base cross-fade settles at full opacity.
    controller.set_base_layer(BaseLayer::Satellite);
    tokio::time::sleep(Duration::from_millis(700)).await;
    let opacity = engine
        .paint_value(SATELLITE_LAYER, "raster-opacity")
        .and_then(|v| v.as_f64())
        .unwrap();
    assert!((opacity - 1.0).abs() < 1e-6);

    let metrics = controller.metrics();
    assert!(metrics.reconcile_passes >= 4);
    assert_eq!(metrics.base_crossfades, 1);
    assert_eq!(metrics.temporal_retargets, 2);
}

/// A failing preset endpoint degrades to mocked data, flagged loudly, and
/// the overlay still renders.
#[tokio::test]
async fn preset_outage_degrades_to_flagged_mock_data() {
    let http = ScriptedHttp::new().route("earthquake.usgs.gov", server_error());
    let (engine, controller) = connect(http).await;

    controller
        .load_dataset(DataSource::Preset(PresetId::Earthquakes))
        .await;

    let state = controller.fetch_state();
    assert!(state.mocked);
    assert!(state.error.is_none());
    assert!(engine.has_layer(DATASET_LAYER));
    assert_eq!(controller.metrics().mock_fallbacks, 1);

    // The camera framed the mock dataset.
    assert_eq!(controller.metrics().camera_framings, 1);
}

/// A failing custom URL surfaces an error and renders nothing.
#[tokio::test]
async fn custom_url_outage_surfaces_error_without_mock() {
    let http = ScriptedHttp::new().route("example.org", server_error());
    let (engine, controller) = connect(http).await;

    controller
        .load_dataset(DataSource::Url("https://example.org/data.json".into()))
        .await;

    let state = controller.fetch_state();
    assert!(state.error.is_some());
    assert!(!state.mocked);
    assert!(!engine.has_layer(DATASET_LAYER));
}

/// The slower of two competing loads is discarded even though it finishes
/// last; the map shows the most recently requested source.
#[tokio::test(start_paused = true)]
async fn last_requested_source_wins_the_race() {
    let http = ScriptedHttp::new()
        .slow_route(
            "slow.example",
            Ok(feature_collection_body(&[(50.0, 60.0)])),
            Duration::from_millis(400),
        )
        .route("fast.example", Ok(feature_collection_body(&[(10.0, 20.0)])));
    let (_engine, controller) = connect(http).await;
    let controller = Arc::new(controller);

    let slow = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            controller
                .load_dataset(DataSource::Url("https://slow.example/a.json".into()))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    controller
        .load_dataset(DataSource::Url("https://fast.example/b.json".into()))
        .await;

    slow.await.unwrap();

    // The committed feature set is the fast response's single station.
    let hit = controller.feature_at(10.0, 20.0);
    assert!(hit.is_some());
    assert!(controller.feature_at(50.0, 60.0).is_none());
    assert_eq!(controller.metrics().stale_discards, 1);
}

/// Disposing mid-tour stops the sequence before the next camera move, and
/// every later surface call is inert.
#[tokio::test(start_paused = true)]
async fn dispose_mid_tour_halts_cleanly() {
    let engine = Arc::new(
        HeadlessEngine::new()
            .with_motion_delay(Duration::from_millis(100))
            .with_idle_delay(Duration::from_millis(100)),
    );
    let controller = MapController::connect(
        engine.clone(),
        config(),
        Arc::new(ScriptedHttp::new()),
    )
    .await
    .unwrap();
    let controller = Arc::new(controller);
    let baseline_fly_tos = engine.fly_to_count();

    let runner = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.run_tour(&showcase_tour()).await })
    };

    // Stop 1's move completes at t=100ms; dispose during the idle wait.
    tokio::time::sleep(Duration::from_millis(150)).await;
    controller.dispose();

    let outcome = runner.await.unwrap();
    assert!(!outcome.completed);
    assert_eq!(engine.fly_to_count() - baseline_fly_tos, 1);

    // Post-dispose, the controller is inert.
    let ops = engine.op_count();
    controller.set_buildings_visible(true);
    assert_eq!(engine.op_count(), ops);
}

/// Rapid conflicting toggles settle on the final declaration with no
/// residue, and a settled state reconciles to zero engine calls.
#[tokio::test]
async fn rapid_toggle_storm_settles_to_last_declaration() {
    let (engine, controller) = connect(ScriptedHttp::new()).await;

    for _ in 0..5 {
        controller.set_overlay_visible(OverlayId::Ozone, true);
        controller.set_overlay_visible(OverlayId::Ozone, false);
    }
    controller.set_overlay_visible(OverlayId::Ozone, true);

    assert_eq!(
        engine.layout_visibility(geoscope::overlay::OZONE_LAYER).unwrap(),
        "visible"
    );

    let ops = engine.op_count();
    controller.set_overlay_visible(OverlayId::Ozone, true);
    assert_eq!(engine.op_count(), ops);
}
