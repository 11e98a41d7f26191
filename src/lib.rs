//! BodyMetrics: Ward clustering of body measurements
//!
//! A fixed set of (weight, height) samples is standardized and clustered
//! once by the fitter, which persists the scaler and the model. The
//! presenter loads both artifacts, re-derives the clustering per request and
//! reports BMI and cluster membership for a subject.

pub mod artifacts;
pub mod cli;
pub mod data;
pub mod fitter;
pub mod model;
pub mod presenter;
pub mod viz;

// Re-export public items for easier access
pub use artifacts::{ArtifactStore, AssetError, LoadedArtifacts, Slot};
pub use cli::Args;
pub use data::{bmi, fixed_dataset, QueryPoint, Sample, StandardScaler};
pub use fitter::{train, train_and_save};
pub use model::{ward_linkage, ClusterModel, Dendrogram, MergeStep};
pub use presenter::{
    analyze, AnalysisReport, ClusterIdSource, Presenter, PresenterContext, PresenterState,
};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
