//! Column-oriented Feature Table

use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Values held by a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnData {
    /// Numeric measurements or numerically encoded fields
    Numeric(Vec<f64>),
    /// Free-form labels (e.g. data source), never standardized
    Categorical(Vec<String>),
}

impl ColumnData {
    /// Number of rows in the column
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Categorical(values) => values.len(),
        }
    }

    /// Whether the column has no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "values")]
    pub data: ColumnData,
}

impl Column {
    /// Create a numeric column
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    /// Create a categorical column
    pub fn categorical(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(values),
        }
    }

    /// Numeric values, if this is a numeric column
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::Numeric(values) => Some(values),
            ColumnData::Categorical(_) => None,
        }
    }
}

/// Ordered set of named columns with one row per sample.
///
/// Rows are aligned by position. Construction rejects ragged columns,
/// duplicate names and non-finite numeric values, so every table that
/// exists is free of missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Column>", into = "Vec<Column>")]
pub struct FeatureTable {
    columns: Vec<Column>,
    n_rows: usize,
}

impl FeatureTable {
    /// Build a table, validating shape and values
    pub fn new(columns: Vec<Column>) -> Result<Self, FeatureError> {
        let n_rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        let mut seen = HashSet::with_capacity(columns.len());

        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(FeatureError::DuplicateColumn(column.name.clone()));
            }

            let actual = column.data.len();
            if actual != n_rows {
                return Err(FeatureError::RaggedColumn {
                    column: column.name.clone(),
                    expected: n_rows,
                    actual,
                });
            }

            if let Some(values) = column.as_numeric() {
                if let Some(row) = values.iter().position(|v| !v.is_finite()) {
                    return Err(FeatureError::NonFiniteValue {
                        column: column.name.clone(),
                        row,
                    });
                }
            }
        }

        Ok(Self { columns, n_rows })
    }

    /// Build a table from numeric columns only
    pub fn from_numeric<S: Into<String>>(
        columns: impl IntoIterator<Item = (S, Vec<f64>)>,
    ) -> Result<Self, FeatureError> {
        Self::new(
            columns
                .into_iter()
                .map(|(name, values)| Column::numeric(name, values))
                .collect(),
        )
    }

    /// Number of rows (samples)
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// All columns in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a numeric column by name
    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        self.column(name).and_then(Column::as_numeric)
    }

    /// Iterate over numeric columns as (name, values)
    pub fn numeric_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .filter_map(|c| c.as_numeric().map(|v| (c.name.as_str(), v)))
    }
}

impl TryFrom<Vec<Column>> for FeatureTable {
    type Error = FeatureError;

    fn try_from(columns: Vec<Column>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<FeatureTable> for Vec<Column> {
    fn from(table: FeatureTable) -> Self {
        table.columns
    }
}
