//! Embedding configuration

use serde::{Deserialize, Serialize};

/// t-SNE configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Effective neighborhood size
    pub perplexity: f64,
    /// Total gradient-descent iterations (iteration cap)
    pub n_iter: usize,
    /// Factor applied to P during the exploration phase
    pub early_exaggeration: f64,
    /// Iterations spent in the exploration phase
    pub exaggeration_iters: usize,
    /// Step size; `None` picks max(n / early_exaggeration / 4, 50)
    pub learning_rate: Option<f64>,
    /// Stop once the gradient norm falls below this
    pub min_grad_norm: f64,
    /// Seed for the initial layout
    pub seed: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            perplexity: 40.0,
            n_iter: 1000,
            early_exaggeration: 12.0,
            exaggeration_iters: 250,
            learning_rate: None,
            min_grad_norm: 1e-7,
            seed: 90,
        }
    }
}

impl EmbeddingConfig {
    /// Set perplexity
    pub fn with_perplexity(mut self, perplexity: f64) -> Self {
        self.perplexity = perplexity;
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set iteration cap
    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    /// Learning rate for `n` samples
    pub fn effective_learning_rate(&self, n: usize) -> f64 {
        self.learning_rate
            .unwrap_or_else(|| (n as f64 / self.early_exaggeration / 4.0).max(50.0))
    }
}
