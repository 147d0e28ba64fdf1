//! Clustering Error Types

use thiserror::Error;

/// Errors raised by the clusterers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    /// k or cut_k outside [1, n_samples]
    #[error("Cluster count {requested} is outside [1, {n_samples}] for {n_samples} samples")]
    InvalidClusterCount { requested: usize, n_samples: usize },

    /// Label out of the declared label space
    #[error("Label {label} at sample {index} is outside [0, {n_clusters})")]
    LabelOutOfRange {
        index: usize,
        label: usize,
        n_clusters: usize,
    },

    /// Iteration parameters that would never run
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Row width does not match the fitted centroids
    #[error("Expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
