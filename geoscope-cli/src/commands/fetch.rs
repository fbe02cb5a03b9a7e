//! Dataset fetch command.

use std::sync::Arc;

use geoscope::fetch::LoadOutcome;
use geoscope::{DataSource, FetchCoordinator, PresetId, ReqwestHttp};

use crate::error::CliError;

fn parse_source(source: &str) -> DataSource {
    match source.parse::<PresetId>() {
        Ok(preset) => DataSource::Preset(preset),
        Err(_) => DataSource::Url(source.to_string()),
    }
}

pub async fn run(source: &str) -> Result<(), CliError> {
    let http = ReqwestHttp::new().map_err(|e| CliError::HttpSetup(e.to_string()))?;
    let coordinator = FetchCoordinator::new(Arc::new(http));

    let outcome = coordinator.load(parse_source(source)).await;
    match outcome {
        LoadOutcome::Committed(dataset) => {
            if dataset.is_mocked() {
                println!("*** THIS DATA IS MOCKED (real source unavailable) ***");
            }
            println!("Features: {}", dataset.collection.len());
            match dataset.bbox {
                Some([min_lon, min_lat, max_lon, max_lat]) => println!(
                    "BBox:     [{:.4}, {:.4}, {:.4}, {:.4}]",
                    min_lon, min_lat, max_lon, max_lat
                ),
                None => println!("BBox:     (no geometry)"),
            }
            Ok(())
        }
        LoadOutcome::Stale => {
            // Single-shot CLI loads cannot be superseded.
            Ok(())
        }
        LoadOutcome::Failed(error) => Err(CliError::Fetch(error.to_string())),
    }
}
