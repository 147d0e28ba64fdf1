//! High-dimensional affinities

use ndarray::{Array2, ArrayView1, ArrayView2};
use tracing::debug;

/// Floor applied to probabilities before logs and divisions
pub(crate) const MACHINE_EPSILON: f64 = f64::EPSILON;

const PERPLEXITY_TOLERANCE: f64 = 1e-5;
const MAX_SEARCH_STEPS: usize = 100;

/// Squared Euclidean distances between all rows
pub(crate) fn squared_distances(data: ArrayView2<'_, f64>) -> Array2<f64> {
    let n = data.nrows();
    let mut dist = Array2::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d = feature_table::squared_euclidean(data.row(i), data.row(j));
            dist[[i, j]] = d;
            dist[[j, i]] = d;
        }
    }
    dist
}

/// Conditional distribution p(j | i) for one sample.
///
/// Binary-searches the Gaussian precision until the entropy (in nats)
/// matches ln(perplexity). Returns the row and the precision found.
pub(crate) fn conditional_row(
    distances: ArrayView1<'_, f64>,
    i: usize,
    perplexity: f64,
) -> (Vec<f64>, f64) {
    let n = distances.len();
    let target = perplexity.ln();
    let floor = distances
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .map(|(_, &d)| d)
        .fold(f64::INFINITY, f64::min);

    let mut beta = 1.0;
    let mut beta_min = f64::NEG_INFINITY;
    let mut beta_max = f64::INFINITY;
    let mut row = vec![0.0; n];

    for _ in 0..MAX_SEARCH_STEPS {
        let mut sum = 0.0;
        for j in 0..n {
            row[j] = if j == i {
                0.0
            } else {
                (-(distances[j] - floor) * beta).exp()
            };
            sum += row[j];
        }
        if sum == 0.0 {
            sum = MACHINE_EPSILON;
        }

        let mut weighted = 0.0;
        for j in 0..n {
            row[j] /= sum;
            weighted += row[j] * (distances[j] - floor);
        }
        let entropy = sum.ln() + beta * weighted;
        let diff = entropy - target;

        if diff.abs() <= PERPLEXITY_TOLERANCE {
            break;
        }
        if diff > 0.0 {
            beta_min = beta;
            beta = if beta_max.is_infinite() {
                beta * 2.0
            } else {
                (beta + beta_max) / 2.0
            };
        } else {
            beta_max = beta;
            beta = if beta_min.is_infinite() {
                beta / 2.0
            } else {
                (beta + beta_min) / 2.0
            };
        }
    }

    (row, beta)
}

/// Symmetric joint probabilities P with zero diagonal, summing to 1
pub(crate) fn joint_probabilities(distances: &Array2<f64>, perplexity: f64) -> Array2<f64> {
    let n = distances.nrows();
    let mut conditional = Array2::zeros((n, n));
    let mut sigma_sum = 0.0;

    for i in 0..n {
        let (row, beta) = conditional_row(distances.row(i), i, perplexity);
        for (j, p) in row.into_iter().enumerate() {
            conditional[[i, j]] = p;
        }
        sigma_sum += (1.0 / beta).sqrt();
    }
    debug!("Mean sigma: {:.6}", sigma_sum / n as f64);

    let mut joint = &conditional + &conditional.t();
    let total = joint.sum().max(MACHINE_EPSILON);
    for ((i, j), p) in joint.indexed_iter_mut() {
        *p = if i == j {
            0.0
        } else {
            (*p / total).max(MACHINE_EPSILON)
        };
    }
    joint
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn spread() -> Array2<f64> {
        let points = array![[0.0, 0.0], [1.0, 0.2], [2.5, 1.0], [0.3, 3.0], [4.0, 4.0], [5.0, 0.5]];
        squared_distances(points.view())
    }

    #[test]
    fn test_row_entropy_matches_perplexity() {
        let dist = spread();
        for i in 0..dist.nrows() {
            let (row, _) = conditional_row(dist.row(i), i, 3.0);
            assert_eq!(row[i], 0.0);
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);

            let entropy: f64 = row
                .iter()
                .filter(|&&p| p > 0.0)
                .map(|&p| -p * p.ln())
                .sum();
            assert!((entropy.exp() - 3.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_joint_is_symmetric_and_normalized() {
        let p = joint_probabilities(&spread(), 2.0);
        let n = p.nrows();
        for i in 0..n {
            assert_eq!(p[[i, i]], 0.0);
            for j in 0..n {
                assert!((p[[i, j]] - p[[j, i]]).abs() < 1e-15);
            }
        }
        assert!((p.sum() - 1.0).abs() < 1e-9);
    }
}
