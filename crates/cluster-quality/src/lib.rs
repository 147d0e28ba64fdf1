//! Cluster Quality
//!
//! Silhouette coefficients for any cluster assignment over a standardized
//! feature matrix.

mod silhouette;

pub use silhouette::{silhouette_score, ClusterSilhouette, SilhouetteResult};

use thiserror::Error;

/// Errors raised while scoring an assignment
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QualityError {
    /// Silhouette is undefined for this labeling
    #[error(
        "Silhouette needs between 2 and n_samples - 1 distinct labels; got {n_labels} for {n_samples} samples"
    )]
    DegenerateAssignment { n_labels: usize, n_samples: usize },

    /// Assignment and matrix describe different sample counts
    #[error("Assignment has {labels} labels but the matrix has {samples} samples")]
    LengthMismatch { labels: usize, samples: usize },
}
