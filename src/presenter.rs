//! Request-time analysis over the loaded artifacts
//!
//! A [`Presenter`] is built from an explicitly loaded [`PresenterContext`].
//! The context is immutable and shared; every request re-standardizes the
//! fixed dataset, re-fits the clustering and derives the metrics from scratch.

use crate::artifacts::{ArtifactStore, AssetError, LoadedArtifacts, Slot};
use crate::data::{fixed_dataset, fixed_samples, QueryPoint, Sample, StandardScaler, N_FEATURES};
use crate::model::{ClusterModel, Dendrogram};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;
use std::sync::Arc;

/// Cosmetic status shown next to the metrics
pub const STATUS_VERIFIED: &str = "Verified";

/// Which label is reported as the Cluster ID metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterIdSource {
    /// Nearest cluster of the query point itself
    #[default]
    Subject,
    /// Label of the first fixed sample, independent of the query
    Reference,
}

/// Read-only assets loaded once per process
#[derive(Debug, Clone)]
pub struct PresenterContext {
    scaler: StandardScaler,
    n_clusters: usize,
    trained_at: DateTime<Utc>,
}

impl PresenterContext {
    pub fn from_artifacts(artifacts: LoadedArtifacts) -> Result<Self, AssetError> {
        if let Err(e) = artifacts.scaler.validate() {
            return Err(AssetError::Corrupt {
                slot: Slot::Scaler,
                path: Default::default(),
                reason: e.to_string(),
            });
        }
        if artifacts.scaler.n_features() != N_FEATURES {
            return Err(AssetError::Corrupt {
                slot: Slot::Scaler,
                path: Default::default(),
                reason: format!(
                    "expected {} features, found {}",
                    N_FEATURES,
                    artifacts.scaler.n_features()
                ),
            });
        }
        let n_samples = fixed_dataset().nrows();
        if artifacts.model.n_clusters == 0 || artifacts.model.n_clusters > n_samples {
            return Err(AssetError::Corrupt {
                slot: Slot::Model,
                path: Default::default(),
                reason: format!("invalid cluster count {}", artifacts.model.n_clusters),
            });
        }

        Ok(Self {
            scaler: artifacts.scaler,
            n_clusters: artifacts.model.n_clusters,
            trained_at: artifacts.trained_at,
        })
    }

    pub fn load(store: &ArtifactStore) -> Result<Self, AssetError> {
        Self::from_artifacts(store.load()?).map_err(|err| match err {
            AssetError::Corrupt { slot, reason, .. } => AssetError::Corrupt {
                slot,
                path: store.path(slot),
                reason,
            },
            other => other,
        })
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }
}

/// Everything a single analyze request produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub query: QueryPoint,
    pub samples: Vec<Sample>,
    pub labels: Vec<usize>,
    pub n_clusters: usize,
    pub dendrogram: Dendrogram,
    pub bmi: f64,
    /// Label of fixed sample 0
    pub reference_cluster: usize,
    /// Nearest cluster of the standardized query point
    pub subject_cluster: usize,
    /// The label shown as the Cluster ID metric
    pub cluster_id: usize,
    pub cluster_id_source: ClusterIdSource,
    pub status: String,
}

/// Run one analysis against `context`
pub fn analyze(
    context: &PresenterContext,
    query: QueryPoint,
    source: ClusterIdSource,
) -> crate::Result<AnalysisReport> {
    let data = fixed_dataset();
    let scaled = context.scaler.transform(&data)?;

    // Fresh fit on every request; persisted labels are not reused
    let model = ClusterModel::fit(&scaled, context.n_clusters)?;
    log::debug!("Re-fitted clustering, sizes {:?}", model.cluster_sizes());

    let reference_cluster = model.labels[0];
    let subject_scaled = context.scaler.transform_sample(&query.sample())?;
    let subject_cluster = model.predict(&subject_scaled)?;

    let cluster_id = match source {
        ClusterIdSource::Subject => subject_cluster,
        ClusterIdSource::Reference => reference_cluster,
    };

    Ok(AnalysisReport {
        query,
        samples: fixed_samples(),
        labels: model.labels.to_vec(),
        n_clusters: model.n_clusters,
        dendrogram: model.dendrogram,
        bmi: query.bmi(),
        reference_cluster,
        subject_cluster,
        cluster_id,
        cluster_id_source: source,
        status: STATUS_VERIFIED.to_string(),
    })
}

/// Observable presenter state
#[derive(Debug)]
pub enum PresenterState {
    /// Assets could not be loaded; terminal
    Unavailable(AssetError),
    /// Waiting for the first request
    Idle,
    /// Showing the result of the latest request
    Analyzed(AnalysisReport),
}

impl PresenterState {
    pub fn name(&self) -> &'static str {
        match self {
            PresenterState::Unavailable(_) => "unavailable",
            PresenterState::Idle => "idle",
            PresenterState::Analyzed(_) => "analyzed",
        }
    }
}

/// Request handler with the Idle / Analyzed / Unavailable lifecycle
#[derive(Debug)]
pub struct Presenter {
    context: Option<Arc<PresenterContext>>,
    source: ClusterIdSource,
    state: PresenterState,
    analyses: usize,
}

impl Presenter {
    pub fn new(context: Arc<PresenterContext>, source: ClusterIdSource) -> Self {
        Self {
            context: Some(context),
            source,
            state: PresenterState::Idle,
            analyses: 0,
        }
    }

    /// Load the artifacts from `store`; a load failure yields a presenter
    /// stuck in [`PresenterState::Unavailable`].
    pub fn open(store: &ArtifactStore, source: ClusterIdSource) -> Self {
        match PresenterContext::load(store) {
            Ok(context) => {
                log::debug!("Loaded artifacts trained at {}", context.trained_at());
                Self::new(Arc::new(context), source)
            }
            Err(err) => {
                log::warn!("Artifact load failed: {}", err);
                Self {
                    context: None,
                    source,
                    state: PresenterState::Unavailable(err),
                    analyses: 0,
                }
            }
        }
    }

    pub fn state(&self) -> &PresenterState {
        &self.state
    }

    pub fn context(&self) -> Option<&Arc<PresenterContext>> {
        self.context.as_ref()
    }

    /// Number of analyses actually computed
    pub fn analyses(&self) -> usize {
        self.analyses
    }

    /// Handle one request. When unavailable nothing is computed and the
    /// state is returned unchanged.
    pub fn analyze(&mut self, query: QueryPoint) -> crate::Result<&PresenterState> {
        let Some(context) = self.context.as_ref() else {
            log::warn!("Ignoring request, presenter is unavailable");
            return Ok(&self.state);
        };

        let report = analyze(context, query, self.source)?;
        self.analyses += 1;
        self.state = PresenterState::Analyzed(report);
        Ok(&self.state)
    }
}
