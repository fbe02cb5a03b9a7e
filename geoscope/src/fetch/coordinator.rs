//! Race-free dataset loading with preset mock fallback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::presets::PresetId;
use super::{FetchError, HttpFetch};
use crate::geojson::{compute_bbox, BBox, FeatureCollection};

/// Whether displayed data came from the real feed or was synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Real,
    Mocked,
}

/// A loaded (or synthesized) dataset, ready for the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub collection: FeatureCollection,
    pub bbox: Option<BBox>,
    pub provenance: Provenance,
}

impl Dataset {
    fn new(collection: FeatureCollection, provenance: Provenance) -> Self {
        let bbox = compute_bbox(&collection);
        Self {
            collection,
            bbox,
            provenance,
        }
    }

    pub fn is_mocked(&self) -> bool {
        self.provenance == Provenance::Mocked
    }
}

/// What to load: a known preset, or an ad-hoc URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Preset(PresetId),
    Url(String),
}

impl DataSource {
    fn url(&self) -> &str {
        match self {
            DataSource::Preset(preset) => preset.url(),
            DataSource::Url(url) => url,
        }
    }
}

/// Result of one load request.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The response was committed as the current dataset.
    Committed(Arc<Dataset>),
    /// A newer request was issued while this one was in flight; the
    /// response was discarded. Not an error.
    Stale,
    /// A custom-URL load failed; there is no mock shape to fall back to.
    Failed(FetchError),
}

/// Point-in-time view of the coordinator's flags, for the presentation
/// layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSnapshot {
    pub loading: bool,
    pub error: Option<String>,
    pub mocked: bool,
}

#[derive(Default)]
struct State {
    dataset: Option<Arc<Dataset>>,
    loading: bool,
    error: Option<String>,
}

/// Fetches datasets and commits only the most recently requested one.
///
/// Every call to [`FetchCoordinator::load`] bumps a generation counter;
/// a response is committed only if its generation is still the newest when
/// it arrives. That makes rapid source switches settle on the last request
/// no matter how the responses are ordered.
pub struct FetchCoordinator {
    http: Arc<dyn HttpFetch>,
    generation: AtomicU64,
    state: Mutex<State>,
}

impl FetchCoordinator {
    pub fn new(http: Arc<dyn HttpFetch>) -> Self {
        Self {
            http,
            generation: AtomicU64::new(0),
            state: Mutex::new(State::default()),
        }
    }

    /// Load a dataset, committing it if no newer request supersedes it.
    ///
    /// Preset failures synthesize a mock dataset flagged
    /// [`Provenance::Mocked`]; custom-URL failures surface as
    /// [`LoadOutcome::Failed`] with no data committed.
    pub async fn load(&self, source: DataSource) -> LoadOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.lock();
            state.loading = true;
            state.error = None;
        }

        let result = self.fetch_collection(source.url()).await;

        // Commit gate: a newer load owns the flags now; drop this response
        // on the floor.
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(url = source.url(), "Discarding stale response");
            return LoadOutcome::Stale;
        }

        match (result, &source) {
            (Ok(collection), DataSource::Preset(preset)) if collection.is_empty() => {
                // An empty feed is as useless as a failed one for a demo
                // dashboard; treat it the same way.
                self.commit_mock(*preset, "empty collection")
            }
            (Ok(collection), _) => {
                let dataset = Arc::new(Dataset::new(collection, Provenance::Real));
                let mut state = self.state.lock();
                state.dataset = Some(Arc::clone(&dataset));
                state.loading = false;
                state.error = None;
                LoadOutcome::Committed(dataset)
            }
            (Err(error), DataSource::Preset(preset)) => {
                self.commit_mock(*preset, &error.to_string())
            }
            (Err(error), DataSource::Url(url)) => {
                let mut state = self.state.lock();
                state.dataset = None;
                state.loading = false;
                state.error = Some(error.to_string());
                warn!(url = %url, error = %error, "Custom URL load failed");
                LoadOutcome::Failed(error)
            }
        }
    }

    /// Drop the current dataset and flags. In-flight loads become stale.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.dataset = None;
        state.loading = false;
        state.error = None;
    }

    /// The currently committed dataset, if any.
    pub fn current(&self) -> Option<Arc<Dataset>> {
        self.state.lock().dataset.clone()
    }

    /// Current loading/error/mocked flags.
    pub fn snapshot(&self) -> FetchSnapshot {
        let state = self.state.lock();
        FetchSnapshot {
            loading: state.loading,
            error: state.error.clone(),
            mocked: state
                .dataset
                .as_ref()
                .is_some_and(|dataset| dataset.is_mocked()),
        }
    }

    async fn fetch_collection(&self, url: &str) -> Result<FeatureCollection, FetchError> {
        let bytes = self.http.get(url).await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::Format(format!("not JSON: {}", e)))?;
        Ok(FeatureCollection::from_json(value)?)
    }

    fn commit_mock(&self, preset: PresetId, cause: &str) -> LoadOutcome {
        warn!(
            preset = preset.label(),
            cause = %cause,
            "Preset load failed; substituting mock data"
        );
        let dataset = Arc::new(Dataset::new(preset.mock_collection(), Provenance::Mocked));
        let mut state = self.state.lock();
        state.dataset = Some(Arc::clone(&dataset));
        state.loading = false;
        state.error = None;
        LoadOutcome::Committed(dataset)
    }
}
