//! Temporal availability probe command.

use chrono::Utc;
use geoscope::temporal::{fallback_date, timeline_window};
use geoscope::{ReqwestHttp, TemporalLayer, TemporalResolver};

use crate::error::CliError;

fn parse_layer(name: &str) -> Result<TemporalLayer, CliError> {
    match name {
        "co2" => Ok(TemporalLayer::CarbonDioxide),
        "ozone" => Ok(TemporalLayer::Ozone),
        other => Err(CliError::UnknownLayer(other.to_string())),
    }
}

pub async fn run(layer: &str) -> Result<(), CliError> {
    let layer = parse_layer(layer)?;
    let http = ReqwestHttp::new().map_err(|e| CliError::HttpSetup(e.to_string()))?;
    let resolver = TemporalResolver::new(http);
    let today = Utc::now().date_naive();

    println!("Probing {:?} imagery availability...", layer);
    match resolver.probe_latest_available(layer, today).await {
        Some(latest) => {
            let window = timeline_window(latest);
            println!("Latest available date: {}", latest);
            println!(
                "Timeline window:       {} .. {} ({} days)",
                window[0],
                latest,
                window.len()
            );
            println!("Tile URL:              {}", layer.tile_url(latest));
        }
        None => {
            let fallback = fallback_date(today);
            println!("No published imagery found while probing.");
            println!("Conservative fallback date: {}", fallback);
            println!("Tile URL:                   {}", layer.tile_url(fallback));
        }
    }
    Ok(())
}
