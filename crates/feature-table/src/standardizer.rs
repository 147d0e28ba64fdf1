//! Z-score Standardization

use crate::error::FeatureError;
use crate::statistics::mean_and_population_std;
use crate::table::{Column, FeatureTable};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Feature matrix with every column at mean 0 and standard deviation 1.
///
/// Rows are samples, aligned with the source table. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizedMatrix {
    data: Array2<f64>,
    feature_names: Vec<String>,
}

impl StandardizedMatrix {
    /// Wrap a matrix that is already standardized (or is treated as such).
    ///
    /// Checks that names match the column count and values are finite; the
    /// moments themselves are not re-checked.
    pub fn from_standardized(
        data: Array2<f64>,
        feature_names: Vec<String>,
    ) -> Result<Self, FeatureError> {
        if data.nrows() == 0 {
            return Err(FeatureError::EmptyTable);
        }
        if data.ncols() == 0 {
            return Err(FeatureError::NoFeatures);
        }
        if feature_names.len() != data.ncols() {
            return Err(FeatureError::DimensionMismatch {
                expected: data.ncols(),
                actual: feature_names.len(),
            });
        }
        for (col, name) in feature_names.iter().enumerate() {
            if let Some(row) = data.column(col).iter().position(|v| !v.is_finite()) {
                return Err(FeatureError::NonFiniteValue {
                    column: name.clone(),
                    row,
                });
            }
        }

        Ok(Self {
            data,
            feature_names,
        })
    }

    /// Wrap rows with generated feature names (`x0`, `x1`, ...)
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, FeatureError> {
        let n_features = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Array2::zeros((rows.len(), n_features));

        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_features {
                return Err(FeatureError::DimensionMismatch {
                    expected: n_features,
                    actual: row.len(),
                });
            }
            data.row_mut(i).assign(&ArrayView1::from(row.as_slice()));
        }

        let names = (0..n_features).map(|j| format!("x{j}")).collect();
        Self::from_standardized(data, names)
    }

    /// Number of samples (rows)
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Number of features (columns)
    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }

    /// Feature names in column order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Read-only view of the whole matrix
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Read-only view of one sample
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    /// Pairwise Euclidean distances between all samples (n x n).
    ///
    /// Memory is O(n^2).
    pub fn pairwise_distances(&self) -> Array2<f64> {
        let n = self.n_samples();
        let mut dist = Array2::zeros((n, n));
        for i in 0..n {
            for j in (i + 1)..n {
                let d = crate::euclidean(self.row(i), self.row(j));
                dist[[i, j]] = d;
                dist[[j, i]] = d;
            }
        }
        dist
    }
}

/// Fitted per-column mean and standard deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScaler {
    pub feature_names: Vec<String>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl ColumnScaler {
    /// Fit on named columns; rejects constant columns.
    ///
    /// A column is degenerate when its population std is 0 or at most
    /// `n * f64::EPSILON * |mean|`, the rounding residue a constant column
    /// can leave. Columns whose spread is that small relative to their mean
    /// are rejected too.
    pub fn fit(columns: &[(&str, &[f64])]) -> Result<Self, FeatureError> {
        let mut feature_names = Vec::with_capacity(columns.len());
        let mut means = Vec::with_capacity(columns.len());
        let mut stds = Vec::with_capacity(columns.len());

        for (name, values) in columns {
            let (mean, std) = mean_and_population_std(values);

            // Constant columns can leave rounding residue in the computed std
            let noise_floor = values.len() as f64 * f64::EPSILON * mean.abs();
            if std == 0.0 || std <= noise_floor {
                return Err(FeatureError::DegenerateFeature {
                    column: name.to_string(),
                });
            }

            debug!("Column '{}': mean={:.4}, std={:.4}", name, mean, std);
            feature_names.push(name.to_string());
            means.push(mean);
            stds.push(std);
        }

        Ok(Self {
            feature_names,
            means,
            stds,
        })
    }

    /// Number of fitted features
    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    /// Standardize one row of raw values
    pub fn transform_row(&self, row: &[f64]) -> Result<Array1<f64>, FeatureError> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    /// Map a standardized row back to original units
    pub fn inverse_transform_row(
        &self,
        row: ArrayView1<f64>,
    ) -> Result<Array1<f64>, FeatureError> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(z, (m, s))| z * s + m)
            .collect())
    }

    /// Map every row of a standardized matrix back to original units
    pub fn inverse_transform(
        &self,
        data: ArrayView2<f64>,
    ) -> Result<Array2<f64>, FeatureError> {
        self.check_width(data.ncols())?;
        let mut out = data.to_owned();
        let params = self.means.iter().zip(&self.stds);
        for (mut col, (m, s)) in out.axis_iter_mut(Axis(1)).zip(params) {
            col.mapv_inplace(|z| z * s + m);
        }
        Ok(out)
    }

    fn check_width(&self, actual: usize) -> Result<(), FeatureError> {
        if actual != self.n_features() {
            return Err(FeatureError::DimensionMismatch {
                expected: self.n_features(),
                actual,
            });
        }
        Ok(())
    }
}

/// Output of [`FeatureStandardizer::standardize`]
#[derive(Debug, Clone)]
pub struct Standardized {
    /// Retained numeric feature columns, unmodified
    pub features: Vec<Column>,
    /// Excluded and categorical columns, kept for reporting
    pub passthrough: Vec<Column>,
    /// Z-scored feature matrix
    pub matrix: StandardizedMatrix,
    /// Fitted column means and standard deviations
    pub scaler: ColumnScaler,
}

/// Selects numeric feature columns and z-score normalizes them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureStandardizer {
    excluded: Vec<String>,
}

impl FeatureStandardizer {
    /// Create a standardizer that skips the named columns
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }

    /// Names of columns excluded from the feature set
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    /// Split the table into features and passthrough columns, then z-score
    /// every feature column with its population mean and std.
    pub fn standardize(&self, table: &FeatureTable) -> Result<Standardized, FeatureError> {
        if table.n_rows() == 0 {
            return Err(FeatureError::EmptyTable);
        }

        for name in &self.excluded {
            if table.column(name).is_none() {
                debug!("Excluded column '{}' not present in table", name);
            }
        }

        let (features, passthrough): (Vec<Column>, Vec<Column>) =
            table.columns().iter().cloned().partition(|c| {
                c.as_numeric().is_some() && !self.excluded.iter().any(|e| e == &c.name)
            });

        if features.is_empty() {
            return Err(FeatureError::NoFeatures);
        }

        let named: Vec<(&str, &[f64])> = features
            .iter()
            .filter_map(|c| c.as_numeric().map(|v| (c.name.as_str(), v)))
            .collect();
        let scaler = ColumnScaler::fit(&named)?;

        let n = table.n_rows();
        let mut data = Array2::zeros((n, named.len()));
        for (j, (_, values)) in named.iter().enumerate() {
            let (mean, std) = (scaler.means[j], scaler.stds[j]);
            for (i, v) in values.iter().enumerate() {
                data[[i, j]] = (v - mean) / std;
            }
        }

        info!(
            "Standardized {} samples x {} features ({} passthrough columns)",
            n,
            named.len(),
            passthrough.len()
        );

        let matrix = StandardizedMatrix::from_standardized(data, scaler.feature_names.clone())?;

        Ok(Standardized {
            features,
            passthrough,
            matrix,
            scaler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn body_table() -> FeatureTable {
        FeatureTable::new(vec![
            Column::numeric("index", vec![0.0, 1.0, 2.0, 3.0]),
            Column::numeric("Gender", vec![1.0, 2.0, 1.0, 2.0]),
            Column::numeric("Waist", vec![70.0, 80.0, 90.0, 100.0]),
            Column::numeric("TotalHeight", vec![160.0, 175.0, 168.0, 181.0]),
            Column::categorical(
                "source",
                vec!["Mendeley".into(), "NHANES".into(), "NHANES".into(), "Mendeley".into()],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_excludes_designated_and_categorical_columns() {
        let result = FeatureStandardizer::new(["Gender", "index"])
            .standardize(&body_table())
            .unwrap();

        assert_eq!(result.matrix.feature_names(), &["Waist", "TotalHeight"]);
        let passthrough: Vec<&str> = result.passthrough.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(passthrough, vec!["index", "Gender", "source"]);
        // Retained columns come back unmodified
        assert_eq!(
            result.features[0].as_numeric(),
            Some(&[70.0, 80.0, 90.0, 100.0][..])
        );
    }

    #[test]
    fn test_zscore_values() {
        let result = FeatureStandardizer::new(["Gender", "index", "TotalHeight"])
            .standardize(&body_table())
            .unwrap();

        // mean 85, population std sqrt(125)
        let std = 125.0f64.sqrt();
        let expected = [-15.0 / std, -5.0 / std, 5.0 / std, 15.0 / std];
        for (i, e) in expected.iter().enumerate() {
            assert!((result.matrix.view()[[i, 0]] - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_is_degenerate() {
        let table = FeatureTable::from_numeric(vec![
            ("Waist", vec![70.0, 80.0, 90.0]),
            ("Chest", vec![0.1, 0.1, 0.1]),
        ])
        .unwrap();

        let err = FeatureStandardizer::default().standardize(&table).unwrap_err();
        assert_eq!(
            err,
            FeatureError::DegenerateFeature {
                column: "Chest".into()
            }
        );
    }

    #[test]
    fn test_noise_floor_boundary() {
        // Two ulps apart at 1e9: std 1.2e-7 is below 2 * eps * 1e9 = 4.4e-7
        let residue = [1e9, 1e9 + 2.4e-7];
        assert_eq!(
            ColumnScaler::fit(&[("Height", &residue[..])]).unwrap_err(),
            FeatureError::DegenerateFeature {
                column: "Height".into()
            }
        );

        // std 5e-6 clears the floor
        let varying = [1e9, 1e9 + 1e-5];
        let scaler = ColumnScaler::fit(&[("Height", &varying[..])]).unwrap();
        assert!(scaler.stds[0] > 2.0 * f64::EPSILON * 1e9);
    }

    #[test]
    fn test_excluded_names() {
        let standardizer = FeatureStandardizer::new(["Gender", "index"]);
        assert_eq!(standardizer.excluded(), &["Gender".to_string(), "index".to_string()]);
    }

    #[test]
    fn test_no_features_left() {
        let table = FeatureTable::from_numeric(vec![("Gender", vec![1.0, 2.0])]).unwrap();
        let err = FeatureStandardizer::new(["Gender"]).standardize(&table).unwrap_err();
        assert_eq!(err, FeatureError::NoFeatures);
    }

    #[test]
    fn test_empty_table() {
        let table = FeatureTable::from_numeric(vec![("Waist", vec![])]).unwrap();
        let err = FeatureStandardizer::default().standardize(&table).unwrap_err();
        assert_eq!(err, FeatureError::EmptyTable);
    }

    #[test]
    fn test_deterministic() {
        let standardizer = FeatureStandardizer::new(["index"]);
        let a = standardizer.standardize(&body_table()).unwrap();
        let b = standardizer.standardize(&body_table()).unwrap();
        assert_eq!(a.matrix, b.matrix);
    }

    #[test]
    fn test_scaler_round_trip_row() {
        let result = FeatureStandardizer::new(["Gender", "index"])
            .standardize(&body_table())
            .unwrap();
        let z = result.scaler.transform_row(&[85.0, 171.0]).unwrap();
        assert!(z[0].abs() < 1e-12);

        let back = result.scaler.inverse_transform_row(z.view()).unwrap();
        assert!((back[0] - 85.0).abs() < 1e-9);
        assert!((back[1] - 171.0).abs() < 1e-9);

        let err = result.scaler.transform_row(&[1.0]).unwrap_err();
        assert_eq!(err, FeatureError::DimensionMismatch { expected: 2, actual: 1 });
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err = StandardizedMatrix::from_rows(&[vec![0.0, 1.0], vec![2.0]]).unwrap_err();
        assert_eq!(err, FeatureError::DimensionMismatch { expected: 2, actual: 1 });
    }

    #[test]
    fn test_pairwise_distances_symmetric() {
        let m = StandardizedMatrix::from_rows(&[vec![0.0, 0.0], vec![3.0, 4.0], vec![0.0, 1.0]])
            .unwrap();
        let d = m.pairwise_distances();
        assert!((d[[0, 1]] - 5.0).abs() < 1e-12);
        assert_eq!(d[[1, 0]], d[[0, 1]]);
        assert_eq!(d[[2, 2]], 0.0);
    }

    proptest! {
        #[test]
        fn prop_standardized_moments(
            rows in prop::collection::vec((-500.0f64..500.0, 0.0f64..250.0), 3..60)
        ) {
            let a: Vec<f64> = rows.iter().map(|r| r.0).collect();
            let b: Vec<f64> = rows.iter().map(|r| r.1).collect();
            let spread = |v: &[f64]| {
                let max = v.iter().cloned().fold(f64::MIN, f64::max);
                let min = v.iter().cloned().fold(f64::MAX, f64::min);
                max - min
            };
            let (spread_a, spread_b) = (spread(&a), spread(&b));
            prop_assume!(spread_a > 1e-3 && spread_b > 1e-3);

            let table = FeatureTable::from_numeric(vec![("a", a), ("b", b)]).unwrap();
            let result = FeatureStandardizer::default().standardize(&table).unwrap();

            for col in result.matrix.view().axis_iter(Axis(1)) {
                let values = col.to_vec();
                let (mean, std) = mean_and_population_std(&values);
                prop_assert!(mean.abs() < 1e-9);
                prop_assert!((std - 1.0).abs() < 1e-9);
            }
        }
    }
}
