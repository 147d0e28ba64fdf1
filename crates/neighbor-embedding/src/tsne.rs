//! Exact t-SNE

use crate::affinity::{joint_probabilities, squared_distances, MACHINE_EPSILON};
use crate::{EmbeddingConfig, EmbeddingError};
use feature_table::StandardizedMatrix;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const N_COMPONENTS: usize = 2;
const INITIAL_SCALE: f64 = 1e-4;
const EXPLORATION_MOMENTUM: f64 = 0.5;
const FINAL_MOMENTUM: f64 = 0.8;
const MIN_GAIN: f64 = 0.01;

/// 2D coordinates for every sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// n x 2, rows aligned with the input samples
    pub coordinates: Array2<f64>,
    /// KL(P || Q) at the last iteration
    pub kl_divergence: f64,
    /// Gradient-descent iterations actually run
    pub iterations: usize,
}

impl Embedding {
    /// Number of embedded samples
    pub fn n_samples(&self) -> usize {
        self.coordinates.nrows()
    }

    /// Coordinates of one sample
    pub fn point(&self, i: usize) -> [f64; 2] {
        [self.coordinates[[i, 0]], self.coordinates[[i, 1]]]
    }
}

/// Exact t-SNE embedder
#[derive(Debug, Clone)]
pub struct NeighborEmbedder {
    config: EmbeddingConfig,
}

impl NeighborEmbedder {
    /// Create an embedder, rejecting optimizer settings that cannot run
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        if config.n_iter == 0 {
            return Err(EmbeddingError::InvalidParameter {
                name: "n_iter",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(config.early_exaggeration.is_finite() && config.early_exaggeration >= 1.0) {
            return Err(EmbeddingError::InvalidParameter {
                name: "early_exaggeration",
                reason: format!("must be >= 1, got {}", config.early_exaggeration),
            });
        }
        if let Some(rate) = config.learning_rate {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(EmbeddingError::InvalidParameter {
                    name: "learning_rate",
                    reason: format!("must be positive, got {rate}"),
                });
            }
        }
        if config.min_grad_norm.is_nan() || config.min_grad_norm < 0.0 {
            return Err(EmbeddingError::InvalidParameter {
                name: "min_grad_norm",
                reason: format!("must be non-negative, got {}", config.min_grad_norm),
            });
        }
        Ok(Self { config })
    }

    /// Get configuration
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    /// Embed with the configured seed
    pub fn embed(&self, data: &StandardizedMatrix) -> Result<Embedding, EmbeddingError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.embed_with_rng(data, &mut rng)
    }

    /// Embed drawing the initial layout from `rng`
    pub fn embed_with_rng<R: Rng + ?Sized>(
        &self,
        data: &StandardizedMatrix,
        rng: &mut R,
    ) -> Result<Embedding, EmbeddingError> {
        let n = data.n_samples();
        let perplexity = self.config.perplexity;
        let upper = n.saturating_sub(1) as f64;
        if !(perplexity.is_finite() && perplexity > 0.0 && perplexity < upper) {
            return Err(EmbeddingError::InvalidPerplexity {
                perplexity,
                n_samples: n,
            });
        }

        info!(
            "Embedding {} samples x {} features (perplexity={})",
            n,
            data.n_features(),
            perplexity
        );

        let distances = squared_distances(data.view());
        let p = joint_probabilities(&distances, perplexity);

        let mut y = Array2::from_shape_fn((n, N_COMPONENTS), |_| {
            INITIAL_SCALE * rng.sample::<f64, _>(StandardNormal)
        });

        let learning_rate = self.config.effective_learning_rate(n);
        let exploration = self.config.exaggeration_iters.min(self.config.n_iter);
        debug!(
            "Learning rate {:.2}, {} exploration iterations",
            learning_rate, exploration
        );

        let exaggerated = &p * self.config.early_exaggeration;
        let mut stage = Stage {
            momentum: EXPLORATION_MOMENTUM,
            learning_rate,
            min_grad_norm: self.config.min_grad_norm,
        };
        let (_, mut iterations) = stage.run(&exaggerated, &mut y, exploration);

        let kl = if self.config.n_iter > exploration {
            stage.momentum = FINAL_MOMENTUM;
            let (final_kl, ran) = stage.run(&p, &mut y, self.config.n_iter - exploration);
            iterations += ran;
            final_kl
        } else {
            // Never left the exploration phase; report divergence against
            // the unexaggerated P.
            kl_gradient(&p, &y).0
        };

        info!("Embedding finished after {} iterations, KL={:.4}", iterations, kl);

        Ok(Embedding {
            coordinates: y,
            kl_divergence: kl,
            iterations,
        })
    }
}

/// One optimizer phase: momentum gradient descent with per-coordinate gains
struct Stage {
    momentum: f64,
    learning_rate: f64,
    min_grad_norm: f64,
}

impl Stage {
    /// Run up to `max_iter` steps; returns the last KL and steps taken
    fn run(&self, p: &Array2<f64>, y: &mut Array2<f64>, max_iter: usize) -> (f64, usize) {
        let mut update = Array2::<f64>::zeros(y.raw_dim());
        let mut gains = Array2::<f64>::ones(y.raw_dim());
        let mut kl = 0.0;

        for it in 0..max_iter {
            let (error, mut grad) = kl_gradient(p, y);
            kl = error;

            ndarray::Zip::from(&mut gains)
                .and(&update)
                .and(&grad)
                .for_each(|gain, &u, &g| {
                    *gain = if u * g < 0.0 { *gain + 0.2 } else { *gain * 0.8 };
                    *gain = gain.max(MIN_GAIN);
                });
            grad *= &gains;

            update.zip_mut_with(&grad, |u, &g| {
                *u = self.momentum * *u - self.learning_rate * g;
            });
            *y += &update;

            let grad_norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
            if (it + 1) % 50 == 0 {
                debug!("Iteration {}: KL={:.4}, grad norm={:.2e}", it + 1, kl, grad_norm);
            }
            if grad_norm < self.min_grad_norm {
                debug!("Gradient norm {:.2e} below threshold at iteration {}", grad_norm, it + 1);
                return (kl, it + 1);
            }
        }
        (kl, max_iter)
    }
}

/// KL(P || Q) and its gradient for the Student-t (one degree of freedom)
/// low-dimensional kernel
fn kl_gradient(p: &Array2<f64>, y: &Array2<f64>) -> (f64, Array2<f64>) {
    let n = y.nrows();

    // Unnormalized kernel w_ij = 1 / (1 + |y_i - y_j|^2)
    let mut w = Array2::<f64>::zeros((n, n));
    let mut w_sum = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let v = 1.0 / (1.0 + feature_table::squared_euclidean(y.row(i), y.row(j)));
            w[[i, j]] = v;
            w[[j, i]] = v;
            w_sum += 2.0 * v;
        }
    }
    let w_sum = w_sum.max(MACHINE_EPSILON);

    let mut kl = 0.0;
    let mut grad = Array2::<f64>::zeros((n, N_COMPONENTS));
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let q = (w[[i, j]] / w_sum).max(MACHINE_EPSILON);
            let pij = p[[i, j]];
            kl += pij * (pij.max(MACHINE_EPSILON) / q).ln();

            let coeff = 4.0 * (pij - q) * w[[i, j]];
            for c in 0..N_COMPONENTS {
                grad[[i, c]] += coeff * (y[[i, c]] - y[[j, c]]);
            }
        }
    }
    (kl, grad)
}
