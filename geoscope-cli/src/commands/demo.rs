//! Scripted headless session demo.
//!
//! Exercises the full reconciliation and tour path against the in-memory
//! engine, with real HTTP for the dataset (degrading to mocked data when
//! offline), and prints the session telemetry at the end.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use geoscope::fetch::LoadOutcome;
use geoscope::temporal::fallback_date;
use geoscope::{
    showcase_tour, BaseLayer, DataSource, HeadlessEngine, MapController, OverlayId, PresetId,
    ReqwestHttp, SessionConfig,
};

use crate::error::CliError;

pub async fn run() -> Result<(), CliError> {
    let engine = Arc::new(HeadlessEngine::new());
    let http = Arc::new(ReqwestHttp::new().map_err(|e| CliError::HttpSetup(e.to_string()))?);
    let config = SessionConfig::default();

    println!("Creating headless map session...");
    let controller = MapController::connect(engine.clone(), config, http)
        .await
        .map_err(|e| CliError::Session(e.to_string()))?;
    println!("Session ready. Layer stack:");
    for layer in engine.layer_order() {
        println!("  {}", layer);
    }

    println!("\nToggling overlays and switching base imagery...");
    controller.set_overlay_visible(OverlayId::CarbonDioxide, true);
    controller.set_buildings_visible(true);
    controller.set_base_layer(BaseLayer::Satellite);
    controller.set_selected_date(fallback_date(Utc::now().date_naive()));
    // Let the cross-fade finish before the tour starts.
    tokio::time::sleep(Duration::from_millis(700)).await;

    println!("Loading the earthquakes preset...");
    match controller
        .load_dataset(DataSource::Preset(PresetId::Earthquakes))
        .await
    {
        LoadOutcome::Committed(dataset) => {
            if dataset.is_mocked() {
                println!("*** preset unavailable; showing MOCKED data ***");
            }
            println!("Plotted {} features.", dataset.collection.len());
        }
        LoadOutcome::Stale => {}
        LoadOutcome::Failed(error) => println!("Dataset load failed: {}", error),
    }

    println!("\nRunning the showcase tour...");
    let tour = controller.tour();
    let mut progress = tour.subscribe();
    let watcher = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            if let Some(step) = progress.borrow_and_update().clone() {
                println!("  -> stop {}: {}", step.stop_index + 1, step.label);
            }
        }
    });
    let outcome = tour.run(&showcase_tour()).await;
    drop(tour);
    let _ = watcher.await;
    println!(
        "Tour {} ({} stops visited).",
        if outcome.completed { "completed" } else { "interrupted" },
        outcome.stops_visited
    );

    println!("\nSession metrics:");
    println!("{}", controller.metrics());

    controller.dispose();
    println!("\nSession disposed.");
    Ok(())
}
