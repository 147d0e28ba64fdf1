//! Descriptive Statistics

use serde::{Deserialize, Serialize};

/// Descriptive statistics for a column or a per-cluster slice of one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    /// Number of values
    pub count: usize,
    /// Mean value
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator, 0 when count < 2)
    pub std: f64,
    /// Minimum value
    pub min: f64,
    /// First quartile
    pub q1: f64,
    /// Median
    pub median: f64,
    /// Third quartile
    pub q3: f64,
    /// Maximum value
    pub max: f64,
}

impl DescriptiveStats {
    /// Compute statistics from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let std = if values.len() >= 2 {
            let m2: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
            (m2 / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Self {
            count: values.len(),
            mean,
            std,
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
        }
    }

    /// Interquartile range
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Quantile of already-sorted values with linear interpolation between
/// the two nearest ranks. Returns 0 for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Mean and population standard deviation (n denominator)
pub(crate) fn mean_and_population_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_computation() {
        let stats = DescriptiveStats::compute(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((stats.mean - 3.0).abs() < 1e-12);
        assert_eq!(stats.count, 5);
    }

    #[test]
    fn test_sample_std() {
        // Sample std of this set is sqrt(32 / 7)
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = DescriptiveStats::compute(&values);
        assert!((stats.std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_quartiles_interpolate() {
        let stats = DescriptiveStats::compute(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.q1 - 1.75).abs() < 1e-12);
        assert!((stats.median - 2.5).abs() < 1e-12);
        assert!((stats.q3 - 3.25).abs() < 1e-12);
        assert!((stats.iqr() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_value() {
        let stats = DescriptiveStats::compute(&[170.0]);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.median, 170.0);
    }

    #[test]
    fn test_empty_values() {
        let stats = DescriptiveStats::compute(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
    }

    #[test]
    fn test_population_std() {
        let (mean, std) = mean_and_population_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std - 2.0).abs() < 1e-12);
    }
}
