//! JSON input and output

use crate::error::{PipelineError, Result};
use crate::report::PipelineReport;
use feature_table::FeatureTable;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the report inside the output directory
pub const REPORT_FILE: &str = "cluster_report.json";

/// Read a feature table stored as a JSON list of `{"name", "values"}` columns
pub fn read_table(path: &Path) -> Result<FeatureTable> {
    let raw = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table: FeatureTable = serde_json::from_str(&raw)?;
    info!(
        "Loaded {} rows x {} columns from {}",
        table.n_rows(),
        table.n_columns(),
        path.display()
    );
    Ok(table)
}

/// Write the report as pretty JSON, creating the directory if needed
pub fn write_report(report: &PipelineReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|source| PipelineError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let path = output_dir.join(REPORT_FILE);
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json).map_err(|source| PipelineError::Io {
        path: path.clone(),
        source,
    })?;
    info!("Report written to {}", path.display());
    Ok(path)
}
