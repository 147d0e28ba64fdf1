//! Cluster label assignment

use crate::error::ClusterError;
use serde::{Deserialize, Serialize};

/// One label per sample, each in `[0, n_clusters)`.
///
/// `n_clusters` is the declared label space; a label in that range may be
/// unused by every sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    labels: Vec<usize>,
    n_clusters: usize,
}

impl ClusterAssignment {
    /// Create an assignment with an explicit label space
    pub fn new(labels: Vec<usize>, n_clusters: usize) -> Result<Self, ClusterError> {
        if let Some((index, &label)) = labels.iter().enumerate().find(|&(_, &l)| l >= n_clusters) {
            return Err(ClusterError::LabelOutOfRange {
                index,
                label,
                n_clusters,
            });
        }
        Ok(Self { labels, n_clusters })
    }

    /// Create an assignment whose label space is `0..=max(labels)`
    pub fn from_labels(labels: Vec<usize>) -> Self {
        let n_clusters = labels.iter().max().map(|m| m + 1).unwrap_or(0);
        Self { labels, n_clusters }
    }

    /// Labels in sample order
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Size of the declared label space
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no samples are labeled
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Sample count per label, indexed by label
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_clusters];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }

    /// Number of labels used by at least one sample
    pub fn n_present(&self) -> usize {
        self.counts().iter().filter(|&&c| c > 0).count()
    }

    /// Indices of samples carrying `label`
    pub fn members(&self, label: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == label)
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_include_unused_labels() {
        let assignment = ClusterAssignment::new(vec![0, 2, 2, 0, 2], 4).unwrap();
        assert_eq!(assignment.counts(), vec![2, 0, 3, 0]);
        assert_eq!(assignment.n_present(), 2);
        assert_eq!(assignment.members(2), vec![1, 2, 4]);
    }

    #[test]
    fn test_label_out_of_range() {
        let err = ClusterAssignment::new(vec![0, 1, 3], 3).unwrap_err();
        assert_eq!(
            err,
            ClusterError::LabelOutOfRange {
                index: 2,
                label: 3,
                n_clusters: 3,
            }
        );
    }

    #[test]
    fn test_from_labels_infers_space() {
        let assignment = ClusterAssignment::from_labels(vec![1, 1, 4]);
        assert_eq!(assignment.n_clusters(), 5);
        assert!(ClusterAssignment::from_labels(vec![]).is_empty());
    }
}
