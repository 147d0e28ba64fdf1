//! Per-cluster aggregation

use crate::SummaryError;
use cluster_engine::ClusterAssignment;
use feature_table::{Column, ColumnData, DescriptiveStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Size of one cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCount {
    pub label: usize,
    pub count: usize,
}

/// Statistics of one feature within one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub label: usize,
    pub stats: DescriptiveStats,
}

/// Per-cluster statistics of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBreakdown {
    pub feature: String,
    pub clusters: Vec<ClusterStats>,
}

/// Per-cluster value counts of one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub column: String,
    /// label -> category -> count, present labels only
    pub clusters: BTreeMap<usize, BTreeMap<String, usize>>,
}

/// Whole-column statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescription {
    pub feature: String,
    pub stats: DescriptiveStats,
}

/// Aggregated view of one assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub n_samples: usize,
    /// One entry per label in the declared label space, zero counts included
    pub counts: Vec<ClusterCount>,
    pub features: Vec<FeatureBreakdown>,
    pub categories: Vec<CategoryBreakdown>,
}

impl ClusterSummary {
    /// Count for `label`, 0 when outside the label space
    pub fn count(&self, label: usize) -> usize {
        self.counts
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// Statistics of `feature` within cluster `label`
    pub fn stats(&self, feature: &str, label: usize) -> Option<&DescriptiveStats> {
        self.features
            .iter()
            .find(|f| f.feature == feature)?
            .clusters
            .iter()
            .find(|c| c.label == label)
            .map(|c| &c.stats)
    }
}

/// Aggregates cluster sizes and per-cluster column statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterSummarizer;

impl ClusterSummarizer {
    /// Create a summarizer
    pub fn new() -> Self {
        Self
    }

    /// Cluster sizes for every label in the declared label space
    pub fn counts(
        &self,
        assignment: &ClusterAssignment,
    ) -> Result<Vec<ClusterCount>, SummaryError> {
        if assignment.is_empty() {
            return Err(SummaryError::EmptyAssignment);
        }
        Ok(assignment
            .counts()
            .into_iter()
            .enumerate()
            .map(|(label, count)| ClusterCount { label, count })
            .collect())
    }

    /// Sizes plus statistics of `columns` grouped by label.
    ///
    /// Numeric columns yield descriptive statistics for each label that has
    /// members; categorical columns yield per-label value counts.
    pub fn summarize(
        &self,
        assignment: &ClusterAssignment,
        columns: &[Column],
    ) -> Result<ClusterSummary, SummaryError> {
        let counts = self.counts(assignment)?;
        let n = assignment.len();
        for column in columns {
            if column.data.len() != n {
                return Err(SummaryError::LengthMismatch {
                    name: column.name.clone(),
                    expected: n,
                    actual: column.data.len(),
                });
            }
        }

        let members: Vec<(usize, Vec<usize>)> = counts
            .iter()
            .filter(|c| c.count > 0)
            .map(|c| (c.label, assignment.members(c.label)))
            .collect();

        let mut features = Vec::new();
        let mut categories = Vec::new();
        for column in columns {
            match &column.data {
                ColumnData::Numeric(values) => {
                    let clusters = members
                        .iter()
                        .map(|(label, rows)| {
                            let subset: Vec<f64> = rows.iter().map(|&r| values[r]).collect();
                            ClusterStats {
                                label: *label,
                                stats: DescriptiveStats::compute(&subset),
                            }
                        })
                        .collect();
                    features.push(FeatureBreakdown {
                        feature: column.name.clone(),
                        clusters,
                    });
                }
                ColumnData::Categorical(values) => {
                    let clusters = members
                        .iter()
                        .map(|(label, rows)| {
                            let mut tally = BTreeMap::new();
                            for &r in rows {
                                *tally.entry(values[r].clone()).or_insert(0) += 1;
                            }
                            (*label, tally)
                        })
                        .collect();
                    categories.push(CategoryBreakdown {
                        column: column.name.clone(),
                        clusters,
                    });
                }
            }
        }

        debug!(
            "Summarized {} numeric and {} categorical columns",
            features.len(),
            categories.len()
        );
        info!(
            "Cluster sizes over {} samples: {:?}",
            n,
            counts.iter().map(|c| c.count).collect::<Vec<_>>()
        );

        Ok(ClusterSummary {
            n_samples: n,
            counts,
            features,
            categories,
        })
    }

    /// Summarize several assignments of the same samples against the same columns
    pub fn summarize_many<'a, I>(
        &self,
        assignments: I,
        columns: &[Column],
    ) -> Result<Vec<(String, ClusterSummary)>, SummaryError>
    where
        I: IntoIterator<Item = (&'a str, &'a ClusterAssignment)>,
    {
        assignments
            .into_iter()
            .map(|(name, assignment)| {
                self.summarize(assignment, columns)
                    .map(|summary| (name.to_string(), summary))
            })
            .collect()
    }
}

/// Whole-column statistics for every numeric column
pub fn describe(columns: &[Column]) -> Vec<FeatureDescription> {
    columns
        .iter()
        .filter_map(|c| {
            c.as_numeric().map(|values| FeatureDescription {
                feature: c.name.clone(),
                stats: DescriptiveStats::compute(values),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn columns() -> Vec<Column> {
        vec![
            Column::numeric("height", vec![150.0, 160.0, 170.0, 180.0, 190.0]),
            Column::categorical(
                "Gender",
                ["F", "F", "M", "M", "F"].iter().map(|s| s.to_string()).collect(),
            ),
        ]
    }

    #[test]
    fn test_counts_include_declared_empty_labels() {
        let assignment = ClusterAssignment::new(vec![0, 0, 2, 2, 2], 4).unwrap();
        let counts = ClusterSummarizer::new().counts(&assignment).unwrap();
        let sizes: Vec<usize> = counts.iter().map(|c| c.count).collect();
        assert_eq!(sizes, vec![2, 0, 3, 0]);
        assert_eq!(counts[2], ClusterCount { label: 2, count: 3 });
    }

    #[test]
    fn test_empty_assignment() {
        let assignment = ClusterAssignment::new(vec![], 3).unwrap();
        let summarizer = ClusterSummarizer::new();
        assert_eq!(summarizer.counts(&assignment), Err(SummaryError::EmptyAssignment));
        assert_eq!(
            summarizer.summarize(&assignment, &[]).unwrap_err(),
            SummaryError::EmptyAssignment
        );
    }

    #[test]
    fn test_per_cluster_statistics() {
        let assignment = ClusterAssignment::new(vec![0, 0, 1, 1, 0], 3).unwrap();
        let summary = ClusterSummarizer::new()
            .summarize(&assignment, &columns())
            .unwrap();

        assert_eq!(summary.count(0), 3);
        assert_eq!(summary.count(2), 0);

        let first = summary.stats("height", 0).unwrap();
        assert_eq!(first.count, 3);
        assert!((first.mean - 500.0 / 3.0).abs() < 1e-9);
        assert_eq!(first.min, 150.0);
        assert_eq!(first.median, 160.0);
        assert_eq!(first.max, 190.0);

        let second = summary.stats("height", 1).unwrap();
        assert_eq!(second.mean, 175.0);
        assert!(summary.stats("height", 2).is_none());

        let gender = &summary.categories[0];
        assert_eq!(gender.clusters[&0]["F"], 3);
        assert_eq!(gender.clusters[&1]["M"], 2);
        assert!(!gender.clusters.contains_key(&2));
    }

    #[test]
    fn test_misaligned_column() {
        let assignment = ClusterAssignment::new(vec![0, 1, 0], 2).unwrap();
        let err = ClusterSummarizer::new()
            .summarize(&assignment, &columns())
            .unwrap_err();
        assert_eq!(
            err,
            SummaryError::LengthMismatch {
                name: "height".to_string(),
                expected: 3,
                actual: 5,
            }
        );
    }

    #[test]
    fn test_summarize_many_keeps_names() {
        let kmeans = ClusterAssignment::new(vec![0, 1, 2, 0, 1], 3).unwrap();
        let hac = ClusterAssignment::new(vec![0, 0, 1, 1, 1], 2).unwrap();
        let summaries = ClusterSummarizer::new()
            .summarize_many([("kmeans", &kmeans), ("hac", &hac)], &columns())
            .unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].0, "kmeans");
        assert_eq!(summaries[1].1.counts.len(), 2);
    }

    #[test]
    fn test_describe_skips_categorical() {
        let described = describe(&columns());
        assert_eq!(described.len(), 1);
        assert_eq!(described[0].feature, "height");
        assert_eq!(described[0].stats.median, 170.0);
        assert_eq!(described[0].stats.q1, 160.0);
    }

    proptest! {
        #[test]
        fn prop_counts_sum_to_samples(labels in prop::collection::vec(0usize..6, 1..80)) {
            let n = labels.len();
            let assignment = ClusterAssignment::new(labels, 6).unwrap();
            let counts = ClusterSummarizer::new().counts(&assignment).unwrap();
            prop_assert_eq!(counts.len(), 6);
            prop_assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), n);
        }
    }
}
