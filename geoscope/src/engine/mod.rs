//! Rendering-engine capability surface.
//!
//! The dashboard never talks to a concrete rendering engine directly. All
//! imperative, order-sensitive engine calls go through the [`MapEngine`]
//! trait: source/layer CRUD with explicit insert-before anchors,
//! paint/layout property setters, in-place tile-URL replacement, terrain
//! attachment, camera moves, and the three lifecycle waits (load, move-end,
//! render-idle) the session and tour gate on.
//!
//! This abstraction allows for dependency injection and easier testing:
//! the reconciliation, animation, and tour logic run unchanged against
//! [`HeadlessEngine`], a complete in-memory implementation that maintains a
//! real ordered layer graph and records every call it receives.
//!
//! # Disposal
//!
//! A disposed engine rejects every mutation with [`EngineError::Disposed`]
//! and reports `is_alive() == false`. Callers are expected to probe
//! aliveness before mutating; trait methods still fail safe because
//! disposal races are expected, not exceptional.

mod headless;
mod types;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub use headless::{EngineOp, HeadlessEngine};
pub use types::{
    CameraTarget, EngineError, FitBoundsOptions, LayerInfo, LayerSpec, LayerType, SourceSpec,
};

use crate::geojson::{BBox, Feature};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Narrow capability interface over one live rendering-engine instance.
///
/// Implementations must be `Send + Sync`; the session exposes the engine as
/// `Arc<dyn MapEngine>` to the reconciler, animator, and tour sequencer.
/// Mutations are synchronous (the real engine queues them internally); only
/// the lifecycle waits suspend.
pub trait MapEngine: Send + Sync {
    /// Register a source. Fails if a source with this id already exists.
    fn add_source(&self, id: &str, spec: SourceSpec) -> Result<(), EngineError>;

    /// Remove a source. Fails if the source does not exist; callers guard
    /// with [`MapEngine::has_source`] instead of catching the error.
    fn remove_source(&self, id: &str) -> Result<(), EngineError>;

    fn has_source(&self, id: &str) -> bool;

    /// Replace a raster source's tile URL template in place, without
    /// removing the layers that draw it. This is what makes temporal date
    /// changes flicker-free.
    fn set_source_tiles(&self, id: &str, tiles: Vec<String>) -> Result<(), EngineError>;

    /// Insert a layer, optionally before an existing anchor layer.
    /// Fails on duplicate layer ids or a missing anchor.
    fn add_layer(&self, spec: LayerSpec, before: Option<&str>) -> Result<(), EngineError>;

    /// Remove a layer. Fails if the layer does not exist; callers guard
    /// with [`MapEngine::has_layer`].
    fn remove_layer(&self, id: &str) -> Result<(), EngineError>;

    fn has_layer(&self, id: &str) -> bool;

    /// Snapshot of the current layer stack, in paint order. Used once at
    /// session-ready to resolve stacking anchors.
    fn layers(&self) -> Vec<LayerInfo>;

    fn set_paint_property(
        &self,
        layer: &str,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), EngineError>;

    fn set_layout_property(
        &self,
        layer: &str,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), EngineError>;

    /// Attach terrain from a raster-DEM source.
    fn set_terrain(&self, source: &str, exaggeration: f64) -> Result<(), EngineError>;

    /// Detach terrain, if attached.
    fn clear_terrain(&self) -> Result<(), EngineError>;

    /// Begin an animated camera move toward the target.
    fn fly_to(&self, camera: CameraTarget, duration: Duration) -> Result<(), EngineError>;

    /// Begin an animated camera move framing the given bounds.
    fn fit_bounds(&self, bounds: BBox, options: FitBoundsOptions) -> Result<(), EngineError>;

    /// Resolves when the engine has loaded its style and is ready for
    /// resource installation. Errors are fatal initialization failures.
    fn wait_for_load(&self) -> BoxFuture<'_, Result<(), EngineError>>;

    /// Resolves when the current camera motion has ended.
    fn wait_for_move_end(&self) -> BoxFuture<'_, Result<(), EngineError>>;

    /// Resolves when every tile in the current view has finished loading
    /// and the frame is fully rendered.
    fn wait_for_idle(&self) -> BoxFuture<'_, Result<(), EngineError>>;

    /// Hit-test rendered features of one layer at a screen-projected
    /// lon/lat point. Returns an empty list for unknown layers.
    fn query_features_at(&self, lon: f64, lat: f64, layer: &str) -> Vec<Feature>;

    /// Benign liveness probe: true until the engine is destroyed.
    fn is_alive(&self) -> bool;

    /// Tear the engine down. Idempotent; every later call fails with
    /// [`EngineError::Disposed`] and pending waits resolve with it.
    fn destroy(&self);
}
