//! k-means (Lloyd iteration with k-means++ seeding)

use crate::assignment::ClusterAssignment;
use crate::config::KMeansConfig;
use crate::error::ClusterError;
use feature_table::{squared_euclidean, StandardizedMatrix};
use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Result of a k-means fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansFit {
    /// Label per sample in `[0, k)`
    pub assignment: ClusterAssignment,
    /// Final centroids (k x n_features), standardized units
    pub centroids: Array2<f64>,
    /// Sum of squared distances from samples to their centroid
    pub inertia: f64,
    /// Lloyd iterations run by the kept restart
    pub iterations: usize,
    /// Whether assignments stabilized before the iteration cap
    pub converged: bool,
    /// Inertia after every assignment step of the kept restart
    pub inertia_history: Vec<f64>,
    /// Empty-cluster reseeds performed by the kept restart
    pub reseeds: usize,
}

impl KMeansFit {
    /// Number of clusters
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Assign new standardized samples to the nearest fitted centroid
    pub fn predict(&self, data: &StandardizedMatrix) -> Result<ClusterAssignment, ClusterError> {
        if data.n_features() != self.centroids.ncols() {
            return Err(ClusterError::DimensionMismatch {
                expected: self.centroids.ncols(),
                actual: data.n_features(),
            });
        }
        let (labels, _) = assign(data.view(), &self.centroids);
        ClusterAssignment::new(labels, self.k())
    }
}

/// Partition clusterer.
///
/// Empty clusters: after each centroid update, a centroid with no members
/// is moved onto the sample farthest from its own centroid (each sample is
/// used at most once per iteration). When every sample already sits on its
/// centroid there is nothing to move to, the centroid is left in place and
/// its label can stay unused. That only happens when the data has fewer
/// distinct points than k.
#[derive(Debug, Clone)]
pub struct KMeans {
    config: KMeansConfig,
}

impl KMeans {
    /// Create a clusterer, rejecting parameters that would never iterate
    pub fn new(config: KMeansConfig) -> Result<Self, ClusterError> {
        if config.max_iterations == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        if config.n_init == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "n_init",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Fit using a generator seeded from the configured seed
    pub fn fit(&self, data: &StandardizedMatrix) -> Result<KMeansFit, ClusterError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.fit_with_rng(data, &mut rng)
    }

    /// Fit with a caller-supplied generator; all randomness comes from `rng`
    pub fn fit_with_rng<R: Rng + ?Sized>(
        &self,
        data: &StandardizedMatrix,
        rng: &mut R,
    ) -> Result<KMeansFit, ClusterError> {
        let k = self.config.n_clusters;
        crate::check_cluster_count(k, data.n_samples())?;

        let mut best: Option<KMeansFit> = None;
        for init in 0..self.config.n_init {
            let centroids = init_plus_plus(data.view(), k, rng);
            let fit = self.lloyd(data.view(), centroids)?;
            debug!(
                "Restart {}: inertia={:.4}, iterations={}",
                init, fit.inertia, fit.iterations
            );
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        // n_init >= 1 is enforced in new()
        let best = best.ok_or_else(|| ClusterError::InvalidParameter {
            name: "n_init",
            reason: "must be at least 1".to_string(),
        })?;

        info!(
            "k-means fitted: k={}, inertia={:.2}, iterations={}, converged={}",
            k, best.inertia, best.iterations, best.converged
        );
        Ok(best)
    }

    /// Lloyd iteration from the given starting centroids
    pub(crate) fn lloyd(
        &self,
        data: ArrayView2<f64>,
        mut centroids: Array2<f64>,
    ) -> Result<KMeansFit, ClusterError> {
        let k = centroids.nrows();
        let (mut labels, inertia) = assign(data, &centroids);
        let mut inertia_history = vec![inertia];
        let mut iterations = 0;
        let mut converged = false;
        let mut reseeds = 0;

        while iterations < self.config.max_iterations {
            iterations += 1;

            let empty = update_centroids(data, &labels, &mut centroids);
            if !empty.is_empty() {
                reseeds += reseed_empty(data, &labels, &mut centroids, &empty);
            }

            let (new_labels, inertia) = assign(data, &centroids);
            inertia_history.push(inertia);

            let changed = new_labels != labels;
            labels = new_labels;
            if !changed {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                "k-means hit iteration cap ({}) before assignments stabilized",
                self.config.max_iterations
            );
        }

        let inertia = inertia_history.last().copied().unwrap_or(0.0);
        Ok(KMeansFit {
            assignment: ClusterAssignment::new(labels, k)?,
            centroids,
            inertia,
            iterations,
            converged,
            inertia_history,
            reseeds,
        })
    }
}

/// Nearest centroid per sample (ties go to the lower index) and total cost
fn assign(data: ArrayView2<f64>, centroids: &Array2<f64>) -> (Vec<usize>, f64) {
    let mut inertia = 0.0;
    let labels: Vec<usize> = data
        .axis_iter(Axis(0))
        .map(|row| {
            let mut best = (0usize, f64::INFINITY);
            for (c, center) in centroids.axis_iter(Axis(0)).enumerate() {
                let d = squared_euclidean(row, center);
                if d < best.1 {
                    best = (c, d);
                }
            }
            inertia += best.1;
            best.0
        })
        .collect();
    (labels, inertia)
}

/// Move each non-empty centroid to the mean of its members; returns the
/// clusters that received no samples.
fn update_centroids(
    data: ArrayView2<f64>,
    labels: &[usize],
    centroids: &mut Array2<f64>,
) -> Vec<usize> {
    let k = centroids.nrows();
    let mut sums = Array2::<f64>::zeros(centroids.raw_dim());
    let mut counts = vec![0usize; k];

    for (row, &label) in data.axis_iter(Axis(0)).zip(labels) {
        counts[label] += 1;
        let mut sum = sums.row_mut(label);
        sum += &row;
    }

    let mut empty = Vec::new();
    for c in 0..k {
        if counts[c] == 0 {
            empty.push(c);
        } else {
            let mean = &sums.row(c) / counts[c] as f64;
            centroids.row_mut(c).assign(&mean);
        }
    }
    empty
}

/// Move empty centroids onto the samples farthest from their centroid
fn reseed_empty(
    data: ArrayView2<f64>,
    labels: &[usize],
    centroids: &mut Array2<f64>,
    empty: &[usize],
) -> usize {
    let mut candidates: Vec<(usize, f64)> = data
        .axis_iter(Axis(0))
        .zip(labels)
        .enumerate()
        .map(|(i, (row, &label))| (i, squared_euclidean(row, centroids.row(label))))
        .filter(|&(_, d)| d > 0.0)
        .collect();
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut reseeded = 0;
    for (&cluster, &(sample, dist)) in empty.iter().zip(&candidates) {
        debug!(
            "Reseeding empty cluster {} at sample {} (distance^2 {:.4})",
            cluster, sample, dist
        );
        centroids.row_mut(cluster).assign(&data.row(sample));
        reseeded += 1;
    }

    if reseeded < empty.len() {
        warn!(
            "{} empty cluster(s) left in place: every sample coincides with its centroid",
            empty.len() - reseeded
        );
    }
    reseeded
}

/// k-means++ seeding: first centroid uniform, the rest weighted by squared
/// distance to the nearest centroid chosen so far.
fn init_plus_plus<R: Rng + ?Sized>(data: ArrayView2<f64>, k: usize, rng: &mut R) -> Array2<f64> {
    let n = data.nrows();
    let mut centroids = Array2::zeros((k, data.ncols()));

    let first = rng.gen_range(0..n);
    centroids.row_mut(0).assign(&data.row(first));

    let mut nearest: Vec<f64> = data
        .axis_iter(Axis(0))
        .map(|row| squared_euclidean(row, data.row(first)))
        .collect();

    for c in 1..k {
        let total: f64 = nearest.iter().sum();
        let selected = if total > 0.0 {
            let threshold = rng.gen::<f64>() * total;
            let mut cumsum = 0.0;
            let mut selected = None;
            let mut last_positive = 0;
            for (i, &d) in nearest.iter().enumerate() {
                if d <= 0.0 {
                    continue;
                }
                last_positive = i;
                cumsum += d;
                if cumsum > threshold {
                    selected = Some(i);
                    break;
                }
            }
            selected.unwrap_or(last_positive)
        } else {
            // All samples coincide with chosen centroids
            rng.gen_range(0..n)
        };

        centroids.row_mut(c).assign(&data.row(selected));
        for (d, row) in nearest.iter_mut().zip(data.axis_iter(Axis(0))) {
            *d = d.min(squared_euclidean(row, data.row(selected)));
        }
    }

    centroids
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use proptest::prelude::*;
    use rand_distr::{Distribution, Normal};

    fn two_blobs(seed: u64) -> StandardizedMatrix {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 0.5).unwrap();
        let mut rows = Vec::with_capacity(100);
        for center in [(-5.0, -5.0), (5.0, 5.0)] {
            for _ in 0..50 {
                rows.push(vec![
                    center.0 + noise.sample(&mut rng),
                    center.1 + noise.sample(&mut rng),
                ]);
            }
        }
        StandardizedMatrix::from_rows(&rows).unwrap()
    }

    fn line(points: &[f64]) -> StandardizedMatrix {
        let rows: Vec<Vec<f64>> = points.iter().map(|&p| vec![p]).collect();
        StandardizedMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_two_blobs_split_evenly() {
        let data = two_blobs(7);
        let fit = KMeans::new(KMeansConfig::with_clusters(2)).unwrap().fit(&data).unwrap();

        let mut counts = fit.assignment.counts();
        counts.sort();
        assert_eq!(counts, vec![50, 50]);
        // First 50 samples share a label, the rest share the other
        let labels = fit.assignment.labels();
        assert!(labels[..50].iter().all(|&l| l == labels[0]));
        assert!(labels[50..].iter().all(|&l| l == labels[50]));
        assert_ne!(labels[0], labels[50]);
        assert!(fit.converged);
    }

    #[test]
    fn test_invalid_cluster_count() {
        let data = line(&[0.0, 1.0, 2.0]);
        for k in [0, 4] {
            let err = KMeans::new(KMeansConfig::with_clusters(k))
                .unwrap()
                .fit(&data)
                .unwrap_err();
            assert_eq!(
                err,
                ClusterError::InvalidClusterCount {
                    requested: k,
                    n_samples: 3
                }
            );
        }
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(KMeans::new(KMeansConfig::with_clusters(2).with_max_iterations(0)).is_err());
        assert!(KMeans::new(KMeansConfig::with_clusters(2).with_n_init(0)).is_err());
    }

    #[test]
    fn test_same_seed_same_result() {
        let data = two_blobs(11);
        let kmeans = KMeans::new(KMeansConfig::with_clusters(4).with_seed(3)).unwrap();
        let a = kmeans.fit(&data).unwrap();
        let b = kmeans.fit(&data).unwrap();
        assert_eq!(a.assignment, b.assignment);
        assert_eq!(a.centroids, b.centroids);
        assert_eq!(a.inertia, b.inertia);
    }

    #[test]
    fn test_k_equals_n_has_zero_inertia() {
        let data = line(&[0.0, 1.0, 5.0, 9.0]);
        let fit = KMeans::new(KMeansConfig::with_clusters(4)).unwrap().fit(&data).unwrap();
        assert!(fit.inertia.abs() < 1e-12);
        assert_eq!(fit.assignment.n_present(), 4);
    }

    #[test]
    fn test_empty_clusters_reseeded_to_farthest_points() {
        let data = line(&[0.0, 1.0, 10.0, 11.0]);
        let kmeans = KMeans::new(KMeansConfig::with_clusters(3)).unwrap();
        // Two centroids far from every sample start out empty
        let start = array![[0.5], [100.0], [-100.0]];
        let fit = kmeans.lloyd(data.view(), start).unwrap();

        assert!(fit.reseeds >= 2);
        assert_eq!(fit.assignment.n_present(), 3);
        assert!(fit.converged);
        for pair in fit.inertia_history.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12);
        }
    }

    #[test]
    fn test_duplicate_points_retire_label() {
        let data = StandardizedMatrix::from_rows(&[vec![1.0, 1.0], vec![1.0, 1.0], vec![1.0, 1.0]])
            .unwrap();
        let fit = KMeans::new(KMeansConfig::with_clusters(2)).unwrap().fit(&data).unwrap();

        // Fewer distinct points than k: one label stays unused
        assert_eq!(fit.assignment.counts(), vec![3, 0]);
        assert_eq!(fit.inertia, 0.0);
    }

    #[test]
    fn test_explicit_rng_matches_seeded_fit() {
        let data = two_blobs(5);
        let kmeans = KMeans::new(KMeansConfig::with_clusters(3).with_seed(42)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let a = kmeans.fit_with_rng(&data, &mut rng).unwrap();
        let b = kmeans.fit(&data).unwrap();
        assert_eq!(a.assignment, b.assignment);
    }

    #[test]
    fn test_predict() {
        let data = two_blobs(9);
        let fit = KMeans::new(KMeansConfig::with_clusters(2)).unwrap().fit(&data).unwrap();
        let probe = StandardizedMatrix::from_rows(&[vec![-5.0, -5.0], vec![5.0, 5.0]]).unwrap();
        let predicted = fit.predict(&probe).unwrap();
        assert_eq!(predicted.labels()[0], fit.assignment.labels()[0]);
        assert_eq!(predicted.labels()[1], fit.assignment.labels()[50]);

        let wrong = line(&[0.0]);
        assert!(matches!(
            fit.predict(&wrong),
            Err(ClusterError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    proptest! {
        #[test]
        fn prop_labels_in_range_and_inertia_non_increasing(
            points in prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0), 2..40),
            k_seed in 0usize..1000,
            seed in 0u64..1000,
        ) {
            let rows: Vec<Vec<f64>> = points.iter().map(|p| vec![p.0, p.1]).collect();
            let data = StandardizedMatrix::from_rows(&rows).unwrap();
            let k = 1 + k_seed % rows.len();

            let config = KMeansConfig::with_clusters(k).with_seed(seed).with_n_init(2);
            let kmeans = KMeans::new(config).unwrap();
            let fit = kmeans.fit(&data).unwrap();

            prop_assert_eq!(fit.assignment.len(), rows.len());
            prop_assert!(fit.assignment.labels().iter().all(|&l| l < k));
            for pair in fit.inertia_history.windows(2) {
                prop_assert!(pair[1] <= pair[0] * (1.0 + 1e-12) + 1e-12);
            }
        }
    }
}
