//! Anthropometric Clustering - Main Entry Point

use anyhow::Context;
use clap::Parser;
use cluster_quality::SilhouetteResult;
use pipeline::{init_logging, read_table, run_pipeline, write_report, PipelineConfig};
use std::path::PathBuf;
use tracing::info;

/// Cluster anthropometric measurements with k-means and Ward linkage
#[derive(Parser, Debug)]
#[command(name = "anthro-cluster")]
#[command(version, about)]
struct Args {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON feature table to analyze
    #[arg(long)]
    input: Option<PathBuf>,

    /// Directory for the JSON report
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of k-means clusters
    #[arg(long)]
    k: Option<usize>,

    /// Number of clusters cut from the Ward tree
    #[arg(long)]
    cut_k: Option<usize>,

    /// Embedding perplexity
    #[arg(long)]
    perplexity: Option<f64>,

    /// k-means seed
    #[arg(long)]
    seed: Option<u64>,

    /// Embedding seed
    #[arg(long)]
    embed_seed: Option<u64>,

    /// Skip the 2D embedding
    #[arg(long)]
    skip_embedding: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(k) = self.k {
            config.kmeans.n_clusters = k;
        }
        if let Some(cut_k) = self.cut_k {
            config.hierarchical.cut_k = cut_k;
        }
        if let Some(perplexity) = self.perplexity {
            config.embedding.perplexity = perplexity;
        }
        if let Some(seed) = self.seed {
            config.kmeans.seed = seed;
        }
        if let Some(seed) = self.embed_seed {
            config.embedding.seed = seed;
        }
        if self.skip_embedding {
            config.skip_embedding = true;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

fn silhouette_text(silhouette: Option<&SilhouetteResult>) -> String {
    silhouette.map_or_else(|| "undefined".to_string(), |s| format!("{:.3}", s.mean))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = PipelineConfig::load(args.config.as_deref()).context("loading configuration")?;
    args.apply(&mut config);
    init_logging(&config.logging)?;

    info!("=== Anthropometric Clustering v{} ===", env!("CARGO_PKG_VERSION"));

    let table = read_table(&config.input)?;
    let report = run_pipeline(&table, &config).await?;
    let path = write_report(&report, &config.output_dir)?;

    info!(
        "k-means (k={}): inertia={:.3}, silhouette={}",
        report.kmeans.n_clusters,
        report.kmeans.inertia,
        silhouette_text(report.kmeans.silhouette.as_ref())
    );
    info!(
        "Ward (cut_k={}): silhouette={}",
        report.hierarchical.n_clusters,
        silhouette_text(report.hierarchical.silhouette.as_ref())
    );
    info!("Done. Report -> {}", path.display());

    Ok(())
}
