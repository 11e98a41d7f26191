//! Offline training: standardize the fixed dataset, cluster it, persist both

use crate::artifacts::ArtifactStore;
use crate::data::{fixed_dataset, StandardScaler};
use crate::model::{ClusterModel, DEFAULT_CLUSTERS};
use chrono::Utc;

/// Fit the scaler and the Ward clustering on the fixed dataset
pub fn train() -> crate::Result<(StandardScaler, ClusterModel)> {
    let data = fixed_dataset();
    log::debug!("Fitting scaler on {} samples", data.nrows());
    let scaler = StandardScaler::fit(&data)?;

    let scaled = scaler.transform(&data)?;
    log::debug!("Fitting Ward clustering with {} clusters", DEFAULT_CLUSTERS);
    let model = ClusterModel::fit(&scaled, DEFAULT_CLUSTERS)?;

    Ok((scaler, model))
}

/// Train and overwrite both artifact slots in `store`
pub fn train_and_save(store: &ArtifactStore) -> crate::Result<(StandardScaler, ClusterModel)> {
    let (scaler, model) = train()?;
    store.save(&scaler, &model, Utc::now())?;
    log::info!("Artifacts written to {}", store.dir().display());
    Ok((scaler, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::Slot;
    use tempfile::tempdir;

    #[test]
    fn test_train_is_deterministic() {
        let (scaler_a, model_a) = train().unwrap();
        let (scaler_b, model_b) = train().unwrap();
        assert_eq!(scaler_a, scaler_b);
        assert_eq!(model_a.labels, model_b.labels);
        assert_eq!(model_a.dendrogram, model_b.dendrogram);
    }

    #[test]
    fn test_train_and_save_writes_both_slots() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let (scaler, model) = train_and_save(&store).unwrap();

        assert!(store.path(Slot::Scaler).exists());
        assert!(store.path(Slot::Model).exists());
        let loaded = store.load().unwrap();
        assert_eq!(loaded.scaler, scaler);
        assert_eq!(loaded.model, model);
    }

    #[test]
    fn test_train_fails_when_store_is_unwritable() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let store = ArtifactStore::new(blocker.join("artifacts"));
        assert!(train_and_save(&store).is_err());
    }
}
