//! Feature Table Error Types

use thiserror::Error;

/// Errors raised while building or standardizing a feature table
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Retained column has zero variance
    #[error("Column '{column}' has zero variance; z-score standardization is undefined")]
    DegenerateFeature { column: String },

    /// Column length differs from the rest of the table
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Two columns share a name
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// NaN or infinite value in a numeric column
    #[error("Column '{column}' has a missing or non-finite value at row {row}")]
    NonFiniteValue { column: String, row: usize },

    /// Table has no rows
    #[error("Feature table has no rows")]
    EmptyTable,

    /// Nothing left to standardize
    #[error("No numeric feature columns remain after exclusions")]
    NoFeatures,

    /// Row or matrix width does not match the fitted features
    #[error("Expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
