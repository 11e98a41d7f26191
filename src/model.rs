//! Agglomerative hierarchical clustering with Ward linkage

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Cluster count used by the trained model
pub const DEFAULT_CLUSTERS: usize = 3;

/// Merge criterion. Only Ward's minimum-variance criterion is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Ward,
}

/// Point-to-point distance. Ward linkage is only defined for Euclidean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Euclidean,
}

/// One agglomeration step.
///
/// Leaves are numbered `0..n`; the cluster created by step `s` gets id `n + s`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeStep {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

/// Full merge history of a hierarchical clustering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dendrogram {
    n_samples: usize,
    steps: Vec<MergeStep>,
}

impl Dendrogram {
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn steps(&self) -> &[MergeStep] {
        &self.steps
    }

    /// Cut the tree so that `k` clusters remain.
    ///
    /// Labels are numbered by first appearance in sample order, so sample 0
    /// always carries label 0.
    pub fn cut(&self, k: usize) -> crate::Result<Array1<usize>> {
        let n = self.n_samples;
        if k == 0 || k > n {
            anyhow::bail!("Cannot cut {} samples into {} clusters", n, k);
        }
        if self.steps.len() + 1 < n {
            anyhow::bail!("Dendrogram is incomplete: {} steps for {} samples", self.steps.len(), n);
        }

        // Cluster id each sample currently belongs to
        let mut owner: Vec<usize> = (0..n).collect();
        for (s, step) in self.steps.iter().take(n - k).enumerate() {
            let merged = n + s;
            for id in owner.iter_mut() {
                if *id == step.left || *id == step.right {
                    *id = merged;
                }
            }
        }

        let mut seen: Vec<usize> = Vec::with_capacity(k);
        let labels = owner
            .iter()
            .map(|id| match seen.iter().position(|s| s == id) {
                Some(label) => label,
                None => {
                    seen.push(*id);
                    seen.len() - 1
                }
            })
            .collect();

        Ok(labels)
    }

    /// Distance halfway between the last merge kept and the first merge cut
    /// when leaving `k` clusters. Used to draw the cut line.
    pub fn cut_height(&self, k: usize) -> Option<f64> {
        let n = self.n_samples;
        if k < 2 || k > n || self.steps.len() < n - 1 {
            return None;
        }
        let first_cut = self.steps[n - k].distance;
        let last_kept = if n - k == 0 {
            0.0
        } else {
            self.steps[n - k - 1].distance
        };
        Some((first_cut + last_kept) / 2.0)
    }

    /// Leaves in left-to-right drawing order
    pub fn leaf_order(&self) -> Vec<usize> {
        let n = self.n_samples;
        if n == 0 {
            return Vec::new();
        }
        let root = n + self.steps.len() - 1;
        let mut order = Vec::with_capacity(n);
        let mut stack = vec![if self.steps.is_empty() { 0 } else { root }];
        while let Some(node) = stack.pop() {
            if node < n {
                order.push(node);
            } else {
                let step = &self.steps[node - n];
                stack.push(step.right);
                stack.push(step.left);
            }
        }
        order
    }
}

/// Build the Ward linkage over the rows of `features` using Euclidean
/// distances and the Lance-Williams update.
pub fn ward_linkage(features: &Array2<f64>) -> crate::Result<Dendrogram> {
    let n = features.nrows();
    if n == 0 {
        anyhow::bail!("Cannot cluster an empty dataset");
    }

    let mut dist = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean_distance(&features.row(i), &features.row(j));
            dist[[i, j]] = d;
            dist[[j, i]] = d;
        }
    }

    // Slot i holds cluster `ids[i]` while `active[i]`
    let mut active = vec![true; n];
    let mut sizes = vec![1usize; n];
    let mut ids: Vec<usize> = (0..n).collect();
    let mut steps = Vec::with_capacity(n.saturating_sub(1));

    for s in 0..n.saturating_sub(1) {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if !active[i] {
                continue;
            }
            for j in (i + 1)..n {
                if !active[j] {
                    continue;
                }
                let d = dist[[i, j]];
                if best.map_or(true, |(_, _, b)| d < b) {
                    best = Some((i, j, d));
                }
            }
        }

        let (i, j, d_ij) = best.ok_or_else(|| anyhow::anyhow!("No clusters left to merge"))?;
        let (n_i, n_j) = (sizes[i] as f64, sizes[j] as f64);

        let (left, right) = if ids[i] < ids[j] {
            (ids[i], ids[j])
        } else {
            (ids[j], ids[i])
        };
        steps.push(MergeStep {
            left,
            right,
            distance: d_ij,
            size: sizes[i] + sizes[j],
        });

        for k in 0..n {
            if !active[k] || k == i || k == j {
                continue;
            }
            let n_k = sizes[k] as f64;
            let d_ik = dist[[i, k]];
            let d_jk = dist[[j, k]];
            let squared = ((n_i + n_k) * d_ik * d_ik + (n_j + n_k) * d_jk * d_jk
                - n_k * d_ij * d_ij)
                / (n_i + n_j + n_k);
            let d = squared.max(0.0).sqrt();
            dist[[i, k]] = d;
            dist[[k, i]] = d;
        }

        active[j] = false;
        sizes[i] += sizes[j];
        ids[i] = n + s;
    }

    Ok(Dendrogram { n_samples: n, steps })
}

/// Fitted agglomerative clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterModel {
    pub n_clusters: usize,
    pub linkage: Linkage,
    pub metric: Metric,
    /// Cluster assignment of each training row
    pub labels: Array1<usize>,
    /// Cluster centroids in standardized space, one row per label
    pub centroids: Array2<f64>,
    pub dendrogram: Dendrogram,
}

impl ClusterModel {
    /// Fit on standardized features and assign every row a label
    pub fn fit(features: &Array2<f64>, n_clusters: usize) -> crate::Result<Self> {
        if n_clusters == 0 {
            anyhow::bail!("Number of clusters must be at least 1");
        }
        if features.nrows() < n_clusters {
            anyhow::bail!(
                "Number of data points ({}) must be at least equal to number of clusters ({})",
                features.nrows(),
                n_clusters
            );
        }

        let dendrogram = ward_linkage(features)?;
        let labels = dendrogram.cut(n_clusters)?;
        let centroids = compute_centroids(features, &labels, n_clusters);

        Ok(Self {
            n_clusters,
            linkage: Linkage::Ward,
            metric: Metric::Euclidean,
            labels,
            centroids,
            dendrogram,
        })
    }

    /// Assign a standardized point to the nearest centroid
    pub fn predict(&self, features: &Array1<f64>) -> crate::Result<usize> {
        if features.len() != self.centroids.ncols() {
            anyhow::bail!(
                "Feature vector must have exactly {} dimensions",
                self.centroids.ncols()
            );
        }

        let mut min_distance = f64::INFINITY;
        let mut closest_cluster = 0;

        for (cluster_idx, centroid) in self.centroids.outer_iter().enumerate() {
            let distance = euclidean_distance(&features.view(), &centroid);
            if distance < min_distance {
                min_distance = distance;
                closest_cluster = cluster_idx;
            }
        }

        Ok(closest_cluster)
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in self.labels.iter() {
            if label < self.n_clusters {
                sizes[label] += 1;
            }
        }
        sizes
    }

    /// Sum of squared distances from each row to its centroid
    pub fn inertia(&self, features: &Array2<f64>) -> f64 {
        features
            .outer_iter()
            .zip(self.labels.iter())
            .map(|(row, &label)| euclidean_distance(&row, &self.centroids.row(label)).powi(2))
            .sum()
    }
}

fn compute_centroids(features: &Array2<f64>, labels: &Array1<usize>, k: usize) -> Array2<f64> {
    let mut centroids = Array2::<f64>::zeros((k, features.ncols()));
    let mut counts = vec![0usize; k];

    for (row, &label) in features.outer_iter().zip(labels.iter()) {
        let mut target = centroids.row_mut(label);
        target += &row;
        counts[label] += 1;
    }
    for (mut centroid, &count) in centroids.outer_iter_mut().zip(counts.iter()) {
        if count > 0 {
            centroid /= count as f64;
        }
    }
    centroids
}

/// Calculate Euclidean distance between two points
pub fn euclidean_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{fixed_dataset, StandardScaler};

    fn scaled_fixture() -> Array2<f64> {
        let data = fixed_dataset();
        StandardScaler::fit(&data).unwrap().transform(&data).unwrap()
    }

    #[test]
    fn test_ward_linkage_structure() {
        let dendrogram = ward_linkage(&scaled_fixture()).unwrap();
        let steps = dendrogram.steps();

        assert_eq!(steps.len(), 9);
        assert_eq!(steps.last().unwrap().size, 10);
        assert_eq!(steps.last().unwrap().left, 16);
        assert_eq!(steps.last().unwrap().right, 17);
        for pair in steps.windows(2) {
            assert!(pair[0].distance <= pair[1].distance + 1e-12);
        }
        assert!((steps[8].distance - 5.522027814008511).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_partition() {
        let model = ClusterModel::fit(&scaled_fixture(), DEFAULT_CLUSTERS).unwrap();
        assert_eq!(model.labels.to_vec(), vec![0, 0, 1, 1, 1, 2, 2, 2, 2, 2]);
        assert_eq!(model.cluster_sizes(), vec![2, 3, 5]);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let features = scaled_fixture();
        let first = ClusterModel::fit(&features, 3).unwrap();
        let second = ClusterModel::fit(&features, 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cut_levels() {
        let dendrogram = ward_linkage(&scaled_fixture()).unwrap();

        assert_eq!(dendrogram.cut(1).unwrap().to_vec(), vec![0; 10]);
        assert_eq!(
            dendrogram.cut(10).unwrap().to_vec(),
            (0..10).collect::<Vec<_>>()
        );
        assert_eq!(
            dendrogram.cut(2).unwrap().to_vec(),
            vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1]
        );
        assert!(dendrogram.cut(0).is_err());
        assert!(dendrogram.cut(11).is_err());
    }

    #[test]
    fn test_cut_height_separates_levels() {
        let dendrogram = ward_linkage(&scaled_fixture()).unwrap();
        let height = dendrogram.cut_height(3).unwrap();
        assert!(height > dendrogram.steps()[6].distance);
        assert!(height < dendrogram.steps()[7].distance);
        assert!(dendrogram.cut_height(1).is_none());
    }

    #[test]
    fn test_leaf_order_covers_all_samples() {
        let dendrogram = ward_linkage(&scaled_fixture()).unwrap();
        let mut order = dendrogram.leaf_order();
        assert_eq!(order.len(), 10);
        order.sort_unstable();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_predict_nearest_centroid() {
        let data = fixed_dataset();
        let scaler = StandardScaler::fit(&data).unwrap();
        let model = ClusterModel::fit(&scaler.transform(&data).unwrap(), 3).unwrap();

        for (i, &label) in model.labels.iter().enumerate() {
            let row = scaler.transform_row(data.row(i)).unwrap();
            assert_eq!(model.predict(&row).unwrap(), label);
        }
        assert!(model.predict(&Array1::zeros(3)).is_err());
    }

    #[test]
    fn test_invalid_cluster_count() {
        let features = scaled_fixture();
        assert!(ClusterModel::fit(&features, 0).is_err());
        assert!(ClusterModel::fit(&features, 11).is_err());
    }

    #[test]
    fn test_single_sample() {
        let features = Array2::from_shape_vec((1, 2), vec![0.0, 0.0]).unwrap();
        let model = ClusterModel::fit(&features, 1).unwrap();
        assert!(model.dendrogram.steps().is_empty());
        assert_eq!(model.labels.to_vec(), vec![0]);
        assert_eq!(model.dendrogram.leaf_order(), vec![0]);
    }

    #[test]
    fn test_inertia_is_finite() {
        let features = scaled_fixture();
        let model = ClusterModel::fit(&features, 3).unwrap();
        let inertia = model.inertia(&features);
        assert!(inertia >= 0.0 && inertia.is_finite());
    }
}
