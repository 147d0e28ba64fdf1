//! Pipeline configuration

use crate::error::Result;
use cluster_engine::{HierarchicalConfig, KMeansConfig};
use neighbor_embedding::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Max level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Full analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// JSON feature table to read
    pub input: PathBuf,
    /// Directory receiving the report
    pub output_dir: PathBuf,
    /// Columns kept out of the feature matrix
    pub excluded_columns: Vec<String>,
    pub kmeans: KMeansConfig,
    pub hierarchical: HierarchicalConfig,
    pub embedding: EmbeddingConfig,
    /// Skip the O(n^2) embedding stage
    pub skip_embedding: bool,
    /// Number of final merges kept for the dendrogram view
    pub dendrogram_merges: usize,
    pub logging: LoggingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/measurements.json"),
            output_dir: PathBuf::from("report_outputs"),
            excluded_columns: vec!["Gender".to_string(), "index".to_string()],
            kmeans: KMeansConfig::default(),
            hierarchical: HierarchicalConfig::default(),
            embedding: EmbeddingConfig::default(),
            skip_embedding: false,
            dendrogram_merges: 25,
            logging: LoggingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from multiple sources.
    ///
    /// Sources are merged in order (later overrides earlier):
    /// 1. Defaults
    /// 2. The given TOML/JSON/YAML file, when provided
    /// 3. Environment variables with the ANTHRO_ prefix
    ///    (e.g. `ANTHRO_KMEANS__N_CLUSTERS=5`)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("ANTHRO")
                .separator("__")
                .try_parsing(true),
        );

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_engine::Linkage;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.kmeans.n_clusters, 8);
        assert_eq!(config.kmeans.seed, 100);
        assert_eq!(config.hierarchical.cut_k, 3);
        assert_eq!(config.hierarchical.linkage, Linkage::Ward);
        assert_eq!(config.embedding.perplexity, 40.0);
        assert_eq!(config.embedding.seed, 90);
        assert_eq!(config.excluded_columns, vec!["Gender", "index"]);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{"kmeans": {"n_clusters": 4}, "skip_embedding": true}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.kmeans.n_clusters, 4);
        assert_eq!(config.kmeans.max_iterations, 300);
        assert!(config.skip_embedding);
        assert_eq!(config.hierarchical.cut_k, 3);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("anthro-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "skip_embedding = true\n[kmeans]\nn_clusters = 5\n[embedding]\nperplexity = 12.5\n",
        )
        .unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.kmeans.n_clusters, 5);
        assert_eq!(config.kmeans.seed, 100);
        assert_eq!(config.embedding.perplexity, 12.5);
        assert!(config.skip_embedding);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let path = std::env::temp_dir().join("anthro-config-does-not-exist.toml");
        assert!(matches!(
            PipelineConfig::load(Some(&path)),
            Err(crate::PipelineError::Config(_))
        ));
    }
}
