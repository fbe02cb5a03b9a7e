//! Live air-quality sensor feed.
//!
//! Pulls the latest PM2.5 measurements and reshapes the provider's row
//! format into a GeoJSON FeatureCollection the sensor overlay can render.
//! The provider payload is irregular — measurements sometimes nest under a
//! `measurements` array, sometimes sit inline on the row — so the
//! transform is deliberately tolerant and simply skips rows it cannot
//! place on the map.

use serde_json::{Map, Value};
use tracing::debug;

use super::{FetchError, HttpFetch};
use crate::geojson::{Feature, FeatureCollection};

/// Latest-measurements endpoint, PM2.5 only.
pub const AIR_QUALITY_LATEST_URL: &str =
    "https://api.openaq.org/v2/latest?limit=250&parameter=pm25";

/// Fetch and transform the latest sensor measurements.
///
/// Failures surface as errors; live measurements have no mock shape to
/// fall back to.
pub async fn fetch_latest(http: &dyn HttpFetch) -> Result<FeatureCollection, FetchError> {
    let bytes = http.get(AIR_QUALITY_LATEST_URL).await?;
    let payload: Value = serde_json::from_slice(&bytes)
        .map_err(|e| FetchError::Format(format!("not JSON: {}", e)))?;
    let collection = rows_to_features(&payload);
    debug!(stations = collection.len(), "Air-quality feed transformed");
    Ok(collection)
}

/// Transform a provider response into point features with `pm25`
/// properties. Rows without usable coordinates or a PM2.5 value are
/// skipped.
pub fn rows_to_features(payload: &Value) -> FeatureCollection {
    let rows = payload
        .get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let features = rows.iter().filter_map(row_to_feature).collect();
    FeatureCollection::new(features)
}

fn row_to_feature(row: &Value) -> Option<Feature> {
    let coordinates = row.get("coordinates")?;
    let lat = coordinates.get("latitude").and_then(Value::as_f64)?;
    let lon = coordinates.get("longitude").and_then(Value::as_f64)?;

    let pm25 = pm25_value(row)?;

    let mut properties = Map::new();
    properties.insert("pm25".to_string(), Value::from(pm25));
    if let Some(location_id) = row.get("locationId") {
        if !location_id.is_null() {
            properties.insert(
                "locationId".to_string(),
                Value::String(stringify(location_id)),
            );
        }
    }
    if let Some(datetime) = row.get("datetime") {
        if !datetime.is_null() {
            properties.insert("datetime".to_string(), Value::String(stringify(datetime)));
        }
    }

    Some(Feature::point(lon, lat, properties))
}

/// PM2.5 can appear inside a `measurements` array (matched by parameter
/// name or numeric id) or inline as the row's `value`.
fn pm25_value(row: &Value) -> Option<f64> {
    if let Some(measurements) = row.get("measurements").and_then(Value::as_array) {
        let matched = measurements.iter().find(|m| {
            m.get("parameter").and_then(Value::as_str) == Some("pm25")
                || m.get("parameterId").and_then(Value::as_i64) == Some(2)
        });
        if let Some(value) = matched.and_then(|m| m.get("value")).and_then(Value::as_f64) {
            return Some(value);
        }
    }
    row.get("value").and_then(Value::as_f64)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
