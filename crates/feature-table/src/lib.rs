//! Feature Table and Standardization
//!
//! Provides the numeric feature table consumed by the clustering engine,
//! z-score standardization, and descriptive statistics for reporting.

mod error;
mod standardizer;
mod statistics;
mod table;

pub use error::FeatureError;
pub use standardizer::{ColumnScaler, FeatureStandardizer, Standardized, StandardizedMatrix};
pub use statistics::{quantile, DescriptiveStats};
pub use table::{Column, ColumnData, FeatureTable};

use ndarray::ArrayView1;

/// Squared Euclidean distance between two rows
pub fn squared_euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Euclidean distance between two rows
pub fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    squared_euclidean(a, b).sqrt()
}
