//! GeoScope — a map session engine for interactive geospatial dashboards.
//!
//! The dashboard's presentation layer is declarative: booleans and enums
//! describing what should currently be visible, plus asynchronously
//! fetched datasets. The rendering engine underneath is the opposite:
//! imperative, order-sensitive, stateful, and asynchronously loading.
//! This crate is the reconciliation layer between the two.
//!
//! # Architecture
//!
//! ```text
//! MapController ──► DesiredState ──► Reconciler ──► MapEngine (trait)
//!       │                               │    │
//!       │                               │    └─► CrossFadeAnimator
//!       ├─► FetchCoordinator ──► Dataset┘
//!       ├─► TemporalResolver (date → tile URLs)
//!       └─► TourSequencer (fly → idle → dwell)
//! ```
//!
//! One [`session::MapSession`] exclusively owns one engine instance.
//! Everything long-running — cross-fades, tour steps, in-flight fetches —
//! re-checks session aliveness before mutating shared state, because the
//! session may be disposed while the operation is suspended.

pub mod animate;
pub mod controller;
pub mod engine;
pub mod fetch;
pub mod geojson;
pub mod overlay;
pub mod reconcile;
pub mod session;
pub mod telemetry;
pub mod temporal;
pub mod tour;

pub use controller::MapController;
pub use engine::{HeadlessEngine, MapEngine};
pub use fetch::{DataSource, Dataset, FetchCoordinator, PresetId, Provenance, ReqwestHttp};
pub use overlay::{BaseLayer, OverlayId};
pub use session::{MapSession, SessionConfig, SessionError, SessionState};
pub use temporal::{TemporalLayer, TemporalResolver};
pub use tour::{showcase_tour, TourSequencer, TourStop};
