//! Contingency table of two assignments

use crate::SummaryError;
use cluster_engine::ClusterAssignment;
use serde::{Deserialize, Serialize};

/// Sample counts for every (row label, column label) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossTab {
    /// `counts[r][c]` samples carry row label r and column label c
    pub counts: Vec<Vec<usize>>,
}

impl CrossTab {
    /// Tabulate two labelings of the same samples
    pub fn compute(
        rows: &ClusterAssignment,
        cols: &ClusterAssignment,
    ) -> Result<Self, SummaryError> {
        if rows.is_empty() {
            return Err(SummaryError::EmptyAssignment);
        }
        if rows.len() != cols.len() {
            return Err(SummaryError::LengthMismatch {
                name: "column assignment".to_string(),
                expected: rows.len(),
                actual: cols.len(),
            });
        }

        let mut counts = vec![vec![0usize; cols.n_clusters()]; rows.n_clusters()];
        for (&r, &c) in rows.labels().iter().zip(cols.labels()) {
            counts[r][c] += 1;
        }
        Ok(Self { counts })
    }

    /// Row totals
    pub fn row_totals(&self) -> Vec<usize> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Column totals
    pub fn column_totals(&self) -> Vec<usize> {
        let width = self.counts.first().map(Vec::len).unwrap_or(0);
        (0..width)
            .map(|c| self.counts.iter().map(|row| row[c]).sum())
            .collect()
    }
}
