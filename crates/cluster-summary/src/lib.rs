//! Cluster Summary
//!
//! Pure aggregation over label vectors: cluster sizes, per-cluster
//! descriptive statistics of the original feature columns, category counts
//! for passthrough columns and cross-tabulation of two assignments.

mod crosstab;
mod summarizer;

pub use crosstab::CrossTab;
pub use summarizer::{
    describe, CategoryBreakdown, ClusterCount, ClusterStats, ClusterSummarizer, ClusterSummary,
    FeatureBreakdown, FeatureDescription,
};

use thiserror::Error;

/// Summary errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummaryError {
    /// Nothing to aggregate
    #[error("Cannot summarize an empty assignment")]
    EmptyAssignment,

    /// Column or second assignment not aligned with the labels
    #[error("'{name}' has {actual} rows, assignment has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}
