//! Temporal raster resolution.
//!
//! The atmospheric overlays are daily global rasters published with a
//! provider-side processing lag. This module maps a selected calendar date
//! to concrete tile URLs, and discovers the newest date that actually has
//! imagery by walking backward from yesterday with lightweight existence
//! checks.
//!
//! # URL Pattern
//!
//! `…/{layer}/default/{date}/GoogleMapsCompatible_Level6/{z}/{y}/{x}.png`
//!
//! - `{date}` is substituted here, as `YYYY-MM-DD`
//! - `{z}/{y}/{x}` stay literal; the rendering engine expands them per tile
//! - No authentication required

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::fetch::{FetchError, HttpFetch};
use crate::overlay::OverlayId;

/// Upper bound on backward probe steps. Two weeks of missing publications
/// means the provider is down, not lagging; give up and fall back.
pub const MAX_PROBE_ATTEMPTS: u64 = 14;

/// Conservative publication lag assumed when probing is exhausted or
/// unavailable.
pub const FALLBACK_LATENCY_DAYS: u64 = 3;

/// Length of the timeline window surfaced to the date control, inclusive
/// of the latest resolved date.
pub const TIMELINE_WINDOW_DAYS: u64 = 31;

const CO2_TEMPLATE: &str = "https://gibs.earthdata.nasa.gov/wmts/epsg3857/best/AIRS_L3_Carbon_Dioxide_IR_Daily_Surface_Concentration/default/{date}/GoogleMapsCompatible_Level6/{z}/{y}/{x}.png";
const OZONE_TEMPLATE: &str = "https://gibs.earthdata.nasa.gov/wmts/epsg3857/best/OMI_Column_Amount_O3/default/{date}/GoogleMapsCompatible_Level6/{z}/{y}/{x}.png";

/// The date-indexed atmospheric raster layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalLayer {
    CarbonDioxide,
    Ozone,
}

impl TemporalLayer {
    pub const ALL: [TemporalLayer; 2] = [TemporalLayer::CarbonDioxide, TemporalLayer::Ozone];

    /// The overlay this layer feeds.
    pub fn overlay_id(&self) -> OverlayId {
        match self {
            TemporalLayer::CarbonDioxide => OverlayId::CarbonDioxide,
            TemporalLayer::Ozone => OverlayId::Ozone,
        }
    }

    fn template(&self) -> &'static str {
        match self {
            TemporalLayer::CarbonDioxide => CO2_TEMPLATE,
            TemporalLayer::Ozone => OZONE_TEMPLATE,
        }
    }

    /// Tile URL template for the given date.
    ///
    /// Pure substitution: the result still contains the `{z}/{y}/{x}`
    /// placeholders for the engine.
    pub fn tile_url(&self, date: NaiveDate) -> String {
        self.template()
            .replace("{date}", &date.format("%Y-%m-%d").to_string())
    }

    /// URL of the single zoom-zero tile for the given date, used as the
    /// cheapest possible existence check.
    fn probe_url(&self, date: NaiveDate) -> String {
        self.tile_url(date)
            .replace("{z}", "0")
            .replace("{y}", "0")
            .replace("{x}", "0")
    }
}

/// Discovers data availability for temporal layers.
pub struct TemporalResolver<C: HttpFetch> {
    http: C,
}

impl<C: HttpFetch> TemporalResolver<C> {
    pub fn new(http: C) -> Self {
        Self { http }
    }

    /// Walks backward from yesterday looking for the newest date with a
    /// published tile.
    ///
    /// Transport errors on a probe count as "absent" and the walk
    /// continues; exhaustion returns `None`, in which case callers should
    /// use [`fallback_date`].
    pub async fn probe_latest_available(
        &self,
        layer: TemporalLayer,
        today: NaiveDate,
    ) -> Option<NaiveDate> {
        for offset in 1..=MAX_PROBE_ATTEMPTS {
            let date = today.checked_sub_days(Days::new(offset))?;
            match self.http.exists(&layer.probe_url(date)).await {
                Ok(true) => {
                    debug!(layer = ?layer, date = %date, "Temporal probe found imagery");
                    return Some(date);
                }
                Ok(false) => {}
                Err(FetchError::Http(reason)) => {
                    debug!(layer = ?layer, date = %date, reason = %reason, "Temporal probe errored; treating as absent");
                }
                Err(_) => {}
            }
        }
        debug!(layer = ?layer, attempts = MAX_PROBE_ATTEMPTS, "Temporal probe exhausted");
        None
    }
}

/// The fixed conservative date used when probing finds nothing.
pub fn fallback_date(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(FALLBACK_LATENCY_DAYS))
        .unwrap_or(today)
}

/// The trailing window of selectable dates, oldest first, ending at
/// `latest`.
pub fn timeline_window(latest: NaiveDate) -> Vec<NaiveDate> {
    (0..TIMELINE_WINDOW_DAYS)
        .rev()
        .filter_map(|offset| latest.checked_sub_days(Days::new(offset)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{MockHttp, MockResponse};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn tile_url_substitutes_literal_date() {
        let url = TemporalLayer::Ozone.tile_url(day(2024, 3, 1));
        assert!(url.contains("2024-03-01"));
        assert!(url.contains("{z}"));
        assert!(url.contains("OMI_Column_Amount_O3"));
    }

    #[test]
    fn co2_and_ozone_use_distinct_products() {
        let co2 = TemporalLayer::CarbonDioxide.tile_url(day(2024, 3, 1));
        let ozone = TemporalLayer::Ozone.tile_url(day(2024, 3, 1));
        assert_ne!(co2, ozone);
    }

    #[tokio::test]
    async fn probe_finds_yesterday_when_published() {
        let http = MockHttp::new().route("2024-03-04", MockResponse::ok(b"tile".to_vec()));
        let resolver = TemporalResolver::new(http);

        let latest = resolver
            .probe_latest_available(TemporalLayer::CarbonDioxide, day(2024, 3, 5))
            .await;
        assert_eq!(latest, Some(day(2024, 3, 4)));
    }

    #[tokio::test]
    async fn probe_walks_past_missing_days() {
        let http = MockHttp::new().route("2024-03-01", MockResponse::ok(b"tile".to_vec()));
        let resolver = TemporalResolver::new(http);

        let latest = resolver
            .probe_latest_available(TemporalLayer::CarbonDioxide, day(2024, 3, 5))
            .await;
        assert_eq!(latest, Some(day(2024, 3, 1)));
    }

    #[tokio::test]
    async fn probe_returns_none_on_exhaustion() {
        let resolver = TemporalResolver::new(MockHttp::new());
        let latest = resolver
            .probe_latest_available(TemporalLayer::Ozone, day(2024, 3, 5))
            .await;
        assert_eq!(latest, None);
    }

    #[tokio::test]
    async fn probe_treats_transport_errors_as_absent() {
        let http = MockHttp::new()
            .route("2024-03-04", MockResponse::error("connection reset"))
            .route("2024-03-03", MockResponse::ok(b"tile".to_vec()));
        let resolver = TemporalResolver::new(http);

        let latest = resolver
            .probe_latest_available(TemporalLayer::CarbonDioxide, day(2024, 3, 5))
            .await;
        assert_eq!(latest, Some(day(2024, 3, 3)));
    }

    #[tokio::test]
    async fn probe_result_is_before_today() {
        let http = MockHttp::new().route("2024-03", MockResponse::ok(b"tile".to_vec()));
        let resolver = TemporalResolver::new(http);
        let today = day(2024, 3, 5);

        let latest = resolver
            .probe_latest_available(TemporalLayer::Ozone, today)
            .await
            .unwrap();
        assert!(latest < today);
    }

    #[test]
    fn fallback_is_a_fixed_offset() {
        assert_eq!(fallback_date(day(2024, 3, 5)), day(2024, 3, 2));
    }

    #[test]
    fn timeline_window_spans_31_days_ending_at_latest() {
        let window = timeline_window(day(2024, 3, 5));
        assert_eq!(window.len(), 31);
        assert_eq!(*window.last().unwrap(), day(2024, 3, 5));
        assert_eq!(window[0], day(2024, 2, 4));
        assert!(window.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
