//! Neighbor Embedding
//!
//! Projects a standardized feature matrix into 2D with exact t-SNE, for
//! visualization only. Cost is O(n^2) in memory and per iteration: the
//! joint-probability matrix, the low-dimensional affinities and the
//! gradient are all dense n x n. Inputs beyond a few thousand samples
//! should be subsampled by the caller.

mod affinity;
mod config;
mod tsne;

pub use config::EmbeddingConfig;
pub use tsne::{Embedding, NeighborEmbedder};

use thiserror::Error;

/// Errors raised by the embedder
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddingError {
    /// Perplexity outside (0, n_samples - 1)
    #[error(
        "Perplexity {perplexity} must be finite and in (0, {}) for {n_samples} samples",
        .n_samples.saturating_sub(1)
    )]
    InvalidPerplexity { perplexity: f64, n_samples: usize },

    /// Optimizer parameter that would never run or diverge immediately
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}
