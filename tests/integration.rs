//! Integration tests for BodyMetrics

use bodymetrics::{
    fixed_dataset, train_and_save, ArtifactStore, AssetError, ClusterIdSource, Presenter,
    PresenterState, QueryPoint, Slot, StandardScaler,
};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_train_then_analyze() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    train_and_save(&store).unwrap();

    let mut presenter = Presenter::open(&store, ClusterIdSource::Subject);
    assert!(matches!(presenter.state(), PresenterState::Idle));

    let state = presenter.analyze(QueryPoint::default()).unwrap();
    let report = match state {
        PresenterState::Analyzed(report) => report,
        other => panic!("unexpected state {}", other.name()),
    };

    assert_eq!(report.bmi, 24.2);
    assert_eq!(report.labels.len(), 10);
    assert_eq!(report.n_clusters, 3);
    assert_eq!(report.status, "Verified");

    // Every label in 0..3 is used
    for cluster in 0..3 {
        assert!(report.labels.contains(&cluster));
    }
}

#[test]
fn test_clustering_is_repeatable_across_requests() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    train_and_save(&store).unwrap();

    let mut presenter = Presenter::open(&store, ClusterIdSource::Reference);
    let first = match presenter.analyze(QueryPoint::new(45.0, 150.0).unwrap()).unwrap() {
        PresenterState::Analyzed(report) => report.clone(),
        other => panic!("unexpected state {}", other.name()),
    };
    let second = match presenter.analyze(QueryPoint::new(120.0, 210.0).unwrap()).unwrap() {
        PresenterState::Analyzed(report) => report.clone(),
        other => panic!("unexpected state {}", other.name()),
    };

    assert_eq!(first.labels, second.labels);
    assert_eq!(first.dendrogram, second.dendrogram);
    assert_eq!(first.samples, second.samples);
    // Reference mode always reports fixed sample 0
    assert_eq!(first.cluster_id, second.cluster_id);
    assert_eq!(first.cluster_id, first.labels[0]);
    assert_ne!(first.bmi, second.bmi);
}

#[test]
fn test_persisted_scaler_matches_fresh_fit() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    train_and_save(&store).unwrap();

    let fresh = StandardScaler::fit(&fixed_dataset()).unwrap();
    let loaded = store.load_scaler().unwrap();
    assert_eq!(loaded, fresh);
}

#[test]
fn test_missing_artifacts_fail_closed() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path().join("never-trained"));

    let mut presenter = Presenter::open(&store, ClusterIdSource::Subject);
    let state = presenter.analyze(QueryPoint::default()).unwrap();

    assert!(matches!(
        state,
        PresenterState::Unavailable(AssetError::Missing {
            slot: Slot::Scaler,
            ..
        })
    ));
    assert_eq!(presenter.analyses(), 0);
}

#[test]
fn test_corrupt_model_fails_closed() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    train_and_save(&store).unwrap();
    fs::write(store.path(Slot::Model), b"\x80\x04garbage").unwrap();

    let mut presenter = Presenter::open(&store, ClusterIdSource::Subject);
    presenter.analyze(QueryPoint::default()).unwrap();

    match presenter.state() {
        PresenterState::Unavailable(err) => {
            assert_eq!(err.slot(), Slot::Model);
            assert!(matches!(err, AssetError::Corrupt { .. }));
        }
        other => panic!("unexpected state {}", other.name()),
    }
    assert_eq!(presenter.analyses(), 0);
}

#[test]
fn test_retraining_overwrites_artifacts() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());

    train_and_save(&store).unwrap();
    let first = store.load_model().unwrap();
    train_and_save(&store).unwrap();
    let second = store.load_model().unwrap();

    assert_eq!(first, second);
}
