//! Analysis report

use cluster_engine::MergeEvent;
use cluster_quality::SilhouetteResult;
use cluster_summary::{ClusterSummary, CrossTab, FeatureDescription};
use neighbor_embedding::Embedding;
use serde::{Deserialize, Serialize};

/// k-means outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionReport {
    pub labels: Vec<usize>,
    pub n_clusters: usize,
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
    pub inertia_history: Vec<f64>,
    pub reseeds: usize,
    /// Centroids in standardized units, one row per label
    pub centroids: Vec<Vec<f64>>,
    /// Centroids mapped back to the original measurement units
    pub centroids_original: Vec<Vec<f64>>,
    /// `None` when the labeling has a single cluster
    pub silhouette: Option<SilhouetteResult>,
    /// Why `silhouette` is missing
    pub silhouette_error: Option<String>,
    pub summary: ClusterSummary,
}

/// Ward clustering outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchicalReport {
    pub labels: Vec<usize>,
    pub n_clusters: usize,
    /// Final merges of the tree (truncated dendrogram)
    pub last_merges: Vec<MergeEvent>,
    /// `None` when the labeling has a single cluster
    pub silhouette: Option<SilhouetteResult>,
    /// Why `silhouette` is missing
    pub silhouette_error: Option<String>,
    pub summary: ClusterSummary,
}

/// Everything produced by one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub n_samples: usize,
    pub feature_names: Vec<String>,
    /// Whole-table statistics of the raw feature columns
    pub describe: Vec<FeatureDescription>,
    pub kmeans: PartitionReport,
    pub hierarchical: HierarchicalReport,
    /// Rows are k-means labels, columns are Ward labels
    pub crosstab: CrossTab,
    pub embedding: Option<Embedding>,
}
