//! Map session lifecycle.
//!
//! A [`MapSession`] wraps exactly one live rendering-engine instance and
//! owns its lifecycle: created once per mount, resolved to `Ready` on the
//! engine's load event (at which point the built-in resources are
//! installed idempotently), and disposed exactly once on unmount. Every
//! other component — reconciler, animator, tour — holds the session by
//! shared reference and re-checks [`MapSession::is_alive`] at each
//! suspension point, because disposal while an operation is suspended is
//! the expected failure mode here, not an exceptional one.

mod bootstrap;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::{CameraTarget, MapEngine};

pub use bootstrap::StackAnchors;

/// Lifecycle states of a map session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, engine load not yet awaited.
    Uninitialized,
    /// Waiting on the engine's load event.
    Initializing,
    /// Engine loaded and built-ins installed; dependents may operate.
    Ready,
    /// Torn down. Every subsequent operation is a no-op.
    Disposed,
}

/// Errors that can occur during session lifecycle.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The engine failed to come up. Fatal: there is no retry, the caller
    /// must remount.
    #[error("map session initialization failed: {0}")]
    Initialization(String),
}

/// Session construction parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Camera applied once the session is ready.
    pub initial_camera: CameraTarget,
    /// Vertical exaggeration for 3D terrain.
    pub terrain_exaggeration: f64,
    /// Date used for the temporal overlay placeholders until a resolved
    /// date arrives.
    pub initial_date: NaiveDate,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let today = Utc::now().date_naive();
        Self {
            initial_camera: CameraTarget::new(-98.0, 38.5, 3.0).with_pitch(45.0),
            terrain_exaggeration: 1.5,
            initial_date: today.checked_sub_days(Days::new(1)).unwrap_or(today),
        }
    }
}

impl SessionConfig {
    pub fn with_initial_camera(mut self, camera: CameraTarget) -> Self {
        self.initial_camera = camera;
        self
    }

    pub fn with_terrain_exaggeration(mut self, exaggeration: f64) -> Self {
        self.terrain_exaggeration = exaggeration;
        self
    }

    pub fn with_initial_date(mut self, date: NaiveDate) -> Self {
        self.initial_date = date;
        self
    }
}

/// Exclusive owner of one rendering-engine instance.
pub struct MapSession {
    engine: Arc<dyn MapEngine>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    anchors: Mutex<StackAnchors>,
    cancel: CancellationToken,
}

impl MapSession {
    /// Create a session over a freshly constructed engine and drive it to
    /// `Ready`.
    ///
    /// Awaits the engine's load event, installs the built-in resources
    /// (terrain, base rasters, building extrusions, temporal overlay
    /// placeholders) with existence guards so a re-entrant load event is
    /// harmless, resolves the stacking anchors once, and applies the
    /// initial camera.
    pub async fn create(
        engine: Arc<dyn MapEngine>,
        config: SessionConfig,
    ) -> Result<Arc<Self>, SessionError> {
        let session = Arc::new(Self {
            engine: Arc::clone(&engine),
            config,
            state: Mutex::new(SessionState::Initializing),
            anchors: Mutex::new(StackAnchors::default()),
            cancel: CancellationToken::new(),
        });

        engine
            .wait_for_load()
            .await
            .map_err(|e| SessionError::Initialization(e.to_string()))?;

        let anchors = bootstrap::install_builtins(engine.as_ref(), &session.config)
            .map_err(|e| SessionError::Initialization(e.to_string()))?;
        debug!(
            below_labels = ?anchors.below_labels,
            below_buildings = ?anchors.below_buildings,
            "Stacking anchors resolved"
        );
        *session.anchors.lock() = anchors;

        engine
            .fly_to(session.config.initial_camera, Duration::ZERO)
            .map_err(|e| SessionError::Initialization(e.to_string()))?;

        *session.state.lock() = SessionState::Ready;
        info!("Map session ready");
        Ok(session)
    }

    /// Shared handle to the engine. Collaborators never own the engine;
    /// they borrow it through the session.
    pub fn engine(&self) -> Arc<dyn MapEngine> {
        Arc::clone(&self.engine)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Anchor layer ids resolved at ready time.
    pub fn anchors(&self) -> StackAnchors {
        self.anchors.lock().clone()
    }

    /// True while the session is `Ready` and the engine answers its
    /// liveness probe. In-flight async work checks this before every
    /// engine mutation.
    pub fn is_alive(&self) -> bool {
        *self.state.lock() == SessionState::Ready && self.engine.is_alive()
    }

    /// Child token canceled when the session is disposed. Long-running
    /// operations (cross-fades, tours) tie their lifetime to this.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Tear down the session and the engine it owns. Idempotent; pending
    /// async work observes cancellation or a dead aliveness probe and
    /// no-ops rather than erroring.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        if *state == SessionState::Disposed {
            return;
        }
        *state = SessionState::Disposed;
        drop(state);

        self.cancel.cancel();
        self.engine.destroy();
        info!("Map session disposed");
    }
}

impl Drop for MapSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::HeadlessEngine;
    use crate::overlay::{
        BUILDINGS_LAYER, CO2_LAYER, CO2_SOURCE, HIGHRES_LAYER, OZONE_LAYER, SATELLITE_LAYER,
        TERRAIN_SOURCE,
    };
    use chrono::NaiveDate;

    fn test_config() -> SessionConfig {
        SessionConfig::default()
            .with_initial_date(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap())
    }

    #[tokio::test]
    async fn create_reaches_ready_and_installs_builtins() {
        let engine = Arc::new(HeadlessEngine::new());
        let session = MapSession::create(engine.clone(), test_config())
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.is_alive());

        for layer in [SATELLITE_LAYER, HIGHRES_LAYER, BUILDINGS_LAYER, CO2_LAYER, OZONE_LAYER] {
            assert!(engine.has_layer(layer), "missing built-in layer {}", layer);
        }
        assert!(engine.has_source(TERRAIN_SOURCE));
        assert_eq!(engine.terrain().unwrap().1, 1.5);
    }

    #[tokio::test]
    async fn base_rasters_sit_below_labels_and_temporal_below_buildings() {
        let engine = Arc::new(HeadlessEngine::new());
        let _session = MapSession::create(engine.clone(), test_config())
            .await
            .unwrap();

        let order = engine.layer_order();
        let position = |id: &str| order.iter().position(|l| l == id).unwrap();

        assert!(position(SATELLITE_LAYER) < position("place-labels"));
        assert!(position(HIGHRES_LAYER) < position("place-labels"));
        assert!(position(BUILDINGS_LAYER) < position("place-labels"));
        assert!(position(CO2_LAYER) < position(BUILDINGS_LAYER));
        assert!(position(OZONE_LAYER) < position(BUILDINGS_LAYER));
    }

    #[tokio::test]
    async fn builtins_start_hidden_or_transparent() {
        let engine = Arc::new(HeadlessEngine::new());
        let _session = MapSession::create(engine.clone(), test_config())
            .await
            .unwrap();

        assert_eq!(
            engine.paint_value(SATELLITE_LAYER, "raster-opacity"),
            Some(serde_json::json!(0.0))
        );
        assert_eq!(engine.layout_visibility(BUILDINGS_LAYER).unwrap(), "none");
        assert_eq!(engine.layout_visibility(CO2_LAYER).unwrap(), "none");
    }

    #[tokio::test]
    async fn temporal_placeholder_uses_initial_date() {
        let engine = Arc::new(HeadlessEngine::new());
        let _session = MapSession::create(engine.clone(), test_config())
            .await
            .unwrap();

        let tiles = engine.source_tiles(CO2_SOURCE).unwrap();
        assert!(tiles[0].contains("2024-03-04"));
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent_under_reentry() {
        let engine = Arc::new(HeadlessEngine::new());
        let config = test_config();
        let session = MapSession::create(engine.clone(), config.clone())
            .await
            .unwrap();

        // A second load event re-running installation must change nothing.
        let ops_before = engine.op_count();
        bootstrap::install_builtins(engine.as_ref(), &config).unwrap();
        assert_eq!(engine.op_count(), ops_before);

        assert!(session.is_alive());
    }

    #[tokio::test]
    async fn initialization_failure_is_fatal() {
        let engine = Arc::new(HeadlessEngine::failing("no webgl context"));
        let result = MapSession::create(engine, test_config()).await;
        let err = result.err().unwrap();
        assert!(matches!(err, SessionError::Initialization(_)));
        assert!(err.to_string().contains("no webgl context"));
    }

    #[tokio::test]
    async fn dispose_flips_aliveness_and_is_idempotent() {
        let engine = Arc::new(HeadlessEngine::new());
        let session = MapSession::create(engine.clone(), test_config())
            .await
            .unwrap();

        let token = session.cancellation_token();
        assert!(!token.is_cancelled());

        session.dispose();
        session.dispose();

        assert_eq!(session.state(), SessionState::Disposed);
        assert!(!session.is_alive());
        assert!(token.is_cancelled());
        assert!(!engine.is_alive());
    }

    #[tokio::test]
    async fn anchors_point_at_label_and_building_layers() {
        let engine = Arc::new(HeadlessEngine::new());
        let session = MapSession::create(engine, test_config()).await.unwrap();

        let anchors = session.anchors();
        assert_eq!(anchors.below_labels.as_deref(), Some("place-labels"));
        assert_eq!(anchors.below_buildings.as_deref(), Some(BUILDINGS_LAYER));
    }
}
