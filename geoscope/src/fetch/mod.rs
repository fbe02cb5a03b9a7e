//! Async data acquisition: HTTP capability, dataset coordinator, presets,
//! and the live sensor feed.
//!
//! Everything network-facing in the dashboard funnels through this module.
//! The [`HttpFetch`] trait is the single seam to the outside world, so the
//! coordinator, the temporal resolver, and the sensor feed are all testable
//! with an injected mock client.
//!
//! # Failure policy
//!
//! Known presets never surface a broken state: any failure (network,
//! non-2xx, schema) falls back to a synthesized mock dataset that is
//! loudly flagged as [`Provenance::Mocked`]. Ad-hoc custom URLs have no
//! known shape to synthesize, so their failures surface as errors instead.
//! A response that arrives after a newer request was issued is discarded
//! silently; staleness is an expected outcome, not an error.

mod coordinator;
mod http;
mod presets;
pub mod sensors;

pub use coordinator::{DataSource, Dataset, FetchCoordinator, FetchSnapshot, LoadOutcome, Provenance};
pub use http::{HttpFetch, ReqwestHttp};
pub use presets::PresetId;

#[cfg(test)]
pub(crate) use http::tests::{MockHttp, MockResponse};

use thiserror::Error;

/// Errors produced while acquiring remote data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The request could not be performed (DNS, connect, timeout).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The payload was not the expected shape.
    #[error("invalid payload: {0}")]
    Format(String),
}

impl From<crate::geojson::GeoJsonError> for FetchError {
    fn from(e: crate::geojson::GeoJsonError) -> Self {
        FetchError::Format(e.to_string())
    }
}
