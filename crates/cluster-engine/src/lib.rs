//! Clustering Engine
//!
//! Partition-based (k-means) and Ward hierarchical clustering over a
//! standardized feature matrix. Both clusterers are pure functions of the
//! matrix and their configuration and can run side by side.

mod assignment;
mod config;
mod error;
mod hierarchical;
mod kmeans;

pub use assignment::ClusterAssignment;
pub use config::{HierarchicalConfig, KMeansConfig, Linkage};
pub use error::ClusterError;
pub use hierarchical::{HierarchicalClusterer, HierarchicalResult, MergeEvent, MergeTree};
pub use kmeans::{KMeans, KMeansFit};

/// Validate a requested cluster count against the sample count
pub(crate) fn check_cluster_count(requested: usize, n_samples: usize) -> Result<(), ClusterError> {
    if requested == 0 || requested > n_samples {
        return Err(ClusterError::InvalidClusterCount {
            requested,
            n_samples,
        });
    }
    Ok(())
}
