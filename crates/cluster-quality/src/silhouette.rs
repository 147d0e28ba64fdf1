//! Silhouette Coefficients

use crate::QualityError;
use cluster_engine::ClusterAssignment;
use feature_table::{euclidean, StandardizedMatrix};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Silhouette breakdown for one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSilhouette {
    /// Cluster label
    pub label: usize,
    /// Number of members
    pub size: usize,
    /// Mean silhouette of the members
    pub mean: f64,
    /// Member silhouettes in ascending order
    pub sorted_values: Vec<f64>,
}

/// Per-sample silhouettes and their mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilhouetteResult {
    /// Silhouette per sample, in sample order
    pub values: Vec<f64>,
    /// Arithmetic mean of `values`
    pub mean: f64,
    /// Breakdown for every label present in the assignment
    pub clusters: Vec<ClusterSilhouette>,
}

impl SilhouetteResult {
    /// Score an assignment.
    ///
    /// For sample i, a(i) is the mean distance to the rest of its cluster and
    /// b(i) the smallest mean distance to another cluster; the silhouette is
    /// (b - a) / max(a, b), or 0 when both are 0. Members of singleton
    /// clusters score 0 and still count toward the mean.
    ///
    /// Distances are computed on the fly: O(n^2) time, O(n * k) memory.
    pub fn compute(
        data: &StandardizedMatrix,
        assignment: &ClusterAssignment,
    ) -> Result<Self, QualityError> {
        let n = data.n_samples();
        if assignment.len() != n {
            return Err(QualityError::LengthMismatch {
                labels: assignment.len(),
                samples: n,
            });
        }

        let n_labels = assignment.n_present();
        if n_labels < 2 || n_labels >= n {
            return Err(QualityError::DegenerateAssignment {
                n_labels,
                n_samples: n,
            });
        }

        let labels = assignment.labels();
        let counts = assignment.counts();
        let k = assignment.n_clusters();

        // Sum of distances from each sample to every cluster
        let mut sums = vec![0.0; n * k];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = euclidean(data.row(i), data.row(j));
                sums[i * k + labels[j]] += d;
                sums[j * k + labels[i]] += d;
            }
        }

        let values: Vec<f64> = (0..n)
            .map(|i| {
                let own = labels[i];
                if counts[own] < 2 {
                    return 0.0;
                }
                let a = sums[i * k + own] / (counts[own] - 1) as f64;
                let b = (0..k)
                    .filter(|&l| l != own && counts[l] > 0)
                    .map(|l| sums[i * k + l] / counts[l] as f64)
                    .fold(f64::INFINITY, f64::min);

                let denom = a.max(b);
                if denom > 0.0 {
                    (b - a) / denom
                } else {
                    0.0
                }
            })
            .collect();

        let mean = values.iter().sum::<f64>() / n as f64;

        let clusters = (0..k)
            .filter(|&l| counts[l] > 0)
            .map(|label| {
                let mut sorted_values: Vec<f64> = labels
                    .iter()
                    .zip(&values)
                    .filter(|&(&l, _)| l == label)
                    .map(|(_, &v)| v)
                    .collect();
                sorted_values.sort_by(f64::total_cmp);
                let size = sorted_values.len();
                let mean = sorted_values.iter().sum::<f64>() / size as f64;
                debug!("Cluster {}: size={}, mean silhouette={:.3}", label, size, mean);
                ClusterSilhouette {
                    label,
                    size,
                    mean,
                    sorted_values,
                }
            })
            .collect();

        info!(
            "Silhouette over {} samples and {} clusters: mean={:.3}",
            n, n_labels, mean
        );

        Ok(Self {
            values,
            mean,
            clusters,
        })
    }
}

/// Mean silhouette of an assignment
pub fn silhouette_score(
    data: &StandardizedMatrix,
    assignment: &ClusterAssignment,
) -> Result<f64, QualityError> {
    SilhouetteResult::compute(data, assignment).map(|r| r.mean)
}
