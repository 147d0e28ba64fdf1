//! Pipeline errors

use cluster_engine::ClusterError;
use cluster_quality::QualityError;
use cluster_summary::SummaryError;
use feature_table::FeatureError;
use neighbor_embedding::EmbeddingError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    #[error("Clustering error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Quality error: {0}")]
    Quality(#[from] QualityError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Summary error: {0}")]
    Summary(#[from] SummaryError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// A worker task panicked or was cancelled
    #[error("Stage '{stage}' did not complete: {reason}")]
    Stage { stage: &'static str, reason: String },
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
