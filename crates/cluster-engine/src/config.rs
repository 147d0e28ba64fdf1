//! Clustering configuration

use serde::{Deserialize, Serialize};

/// k-means configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Number of clusters
    pub n_clusters: usize,
    /// Iteration cap per restart
    pub max_iterations: usize,
    /// Number of k-means++ restarts; the lowest-inertia run is kept
    pub n_init: usize,
    /// Seed for the restart generator
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_clusters: 8,
            max_iterations: 300,
            n_init: 10,
            seed: 100,
        }
    }
}

impl KMeansConfig {
    /// Config for k clusters with default iteration settings
    pub fn with_clusters(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            ..Default::default()
        }
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set restart count
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }
}

/// Linkage criterion for agglomerative clustering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Ward variance minimization
    #[default]
    Ward,
}

/// Hierarchical clustering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchicalConfig {
    /// Number of clusters to cut the tree at
    pub cut_k: usize,
    /// Merge criterion
    pub linkage: Linkage,
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            cut_k: 3,
            linkage: Linkage::Ward,
        }
    }
}
