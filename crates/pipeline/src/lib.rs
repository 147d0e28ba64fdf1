//! Anthropometric Clustering Pipeline
//!
//! Standardizes a measurement table, runs k-means, Ward clustering and the
//! 2D embedding concurrently over the same matrix, then scores and
//! summarizes both labelings.

use cluster_engine::{HierarchicalClusterer, KMeans};
use cluster_quality::{QualityError, SilhouetteResult};
use cluster_summary::{describe, ClusterSummarizer, CrossTab};
use feature_table::{FeatureStandardizer, FeatureTable, Standardized};
use ndarray::Array2;
use neighbor_embedding::NeighborEmbedder;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod error;
mod io;
mod report;

pub use config::{LoggingConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use io::{read_table, write_report, REPORT_FILE};
pub use report::{HierarchicalReport, PartitionReport, PipelineReport};

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| PipelineError::Logging(format!("unknown log level '{}'", config.level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.map_err(|e| PipelineError::Logging(e.to_string()))
}

fn matrix_rows(m: &Array2<f64>) -> Vec<Vec<f64>> {
    m.rows().into_iter().map(|r| r.to_vec()).collect()
}

/// Keep a labeling's silhouette, or the reason it is undefined
fn scored(
    labeling: &str,
    result: std::result::Result<SilhouetteResult, QualityError>,
) -> (Option<SilhouetteResult>, Option<String>) {
    match result {
        Ok(silhouette) => (Some(silhouette), None),
        Err(e) => {
            warn!("No silhouette for the {} labeling: {}", labeling, e);
            (None, Some(e.to_string()))
        }
    }
}

fn joined<T>(stage: &'static str, result: std::result::Result<T, JoinError>) -> Result<T> {
    result.map_err(|e| PipelineError::Stage {
        stage,
        reason: e.to_string(),
    })
}

/// Run the full analysis on one table.
///
/// The three fitting stages share one read-only matrix and run on the
/// blocking pool; scoring and summarizing start once all three are joined.
/// A labeling whose silhouette is undefined (a single cluster) is reported
/// without one; every other stage error fails the run.
pub async fn run_pipeline(table: &FeatureTable, config: &PipelineConfig) -> Result<PipelineReport> {
    let standardizer = FeatureStandardizer::new(config.excluded_columns.iter().cloned());
    debug!("Excluded columns: {:?}", standardizer.excluded());
    let Standardized {
        features,
        passthrough,
        matrix,
        scaler,
    } = standardizer.standardize(table)?;
    let matrix = Arc::new(matrix);

    // Validate every stage up front so a bad parameter fails before any work
    let kmeans = KMeans::new(config.kmeans.clone())?;
    let clusterer = HierarchicalClusterer::new(config.hierarchical.clone());
    let embedder = if config.skip_embedding {
        info!("Embedding stage skipped");
        None
    } else {
        Some(NeighborEmbedder::new(config.embedding.clone())?)
    };

    let kmeans_task = {
        let matrix = Arc::clone(&matrix);
        tokio::task::spawn_blocking(move || kmeans.fit(&matrix))
    };
    let hierarchical_task = {
        let matrix = Arc::clone(&matrix);
        tokio::task::spawn_blocking(move || clusterer.fit(&matrix))
    };
    let embedding_task = embedder.map(|embedder| {
        let matrix = Arc::clone(&matrix);
        tokio::task::spawn_blocking(move || embedder.embed(&matrix))
    });
    let embedding_joined = async move {
        match embedding_task {
            Some(task) => Some(task.await),
            None => None,
        }
    };

    let (kmeans_fit, hierarchical, embedding) =
        tokio::join!(kmeans_task, hierarchical_task, embedding_joined);
    let kmeans_fit = joined("kmeans", kmeans_fit)??;
    let hierarchical = joined("hierarchical", hierarchical)??;
    let embedding = match embedding {
        Some(result) => Some(joined("embedding", result)??),
        None => None,
    };

    if kmeans_fit.assignment.n_present() < kmeans_fit.k() {
        warn!(
            "k-means used {} of {} labels; the data has fewer distinct points than k",
            kmeans_fit.assignment.n_present(),
            kmeans_fit.k()
        );
    }

    let kmeans_quality = {
        let matrix = Arc::clone(&matrix);
        let assignment = kmeans_fit.assignment.clone();
        tokio::task::spawn_blocking(move || SilhouetteResult::compute(&matrix, &assignment))
    };
    let hierarchical_quality = {
        let matrix = Arc::clone(&matrix);
        let assignment = hierarchical.assignment.clone();
        tokio::task::spawn_blocking(move || SilhouetteResult::compute(&matrix, &assignment))
    };
    let (kmeans_silhouette, hierarchical_silhouette) =
        tokio::join!(kmeans_quality, hierarchical_quality);
    let (kmeans_silhouette, kmeans_silhouette_error) =
        scored("k-means", joined("kmeans silhouette", kmeans_silhouette)?);
    let (hierarchical_silhouette, hierarchical_silhouette_error) =
        scored("Ward", joined("hierarchical silhouette", hierarchical_silhouette)?);

    let mut report_columns = features.clone();
    report_columns.extend(passthrough);

    let summarizer = ClusterSummarizer::new();
    let kmeans_summary = summarizer.summarize(&kmeans_fit.assignment, &report_columns)?;
    let hierarchical_summary = summarizer.summarize(&hierarchical.assignment, &report_columns)?;
    let crosstab = CrossTab::compute(&kmeans_fit.assignment, &hierarchical.assignment)?;

    let centroids_original = scaler.inverse_transform(kmeans_fit.centroids.view())?;

    if let (Some(k), Some(h)) = (&kmeans_silhouette, &hierarchical_silhouette) {
        info!("k-means silhouette={:.3}, Ward silhouette={:.3}", k.mean, h.mean);
    }

    Ok(PipelineReport {
        n_samples: matrix.n_samples(),
        feature_names: matrix.feature_names().to_vec(),
        describe: describe(&features),
        kmeans: PartitionReport {
            labels: kmeans_fit.assignment.labels().to_vec(),
            n_clusters: kmeans_fit.k(),
            inertia: kmeans_fit.inertia,
            iterations: kmeans_fit.iterations,
            converged: kmeans_fit.converged,
            inertia_history: kmeans_fit.inertia_history.clone(),
            reseeds: kmeans_fit.reseeds,
            centroids: matrix_rows(&kmeans_fit.centroids),
            centroids_original: matrix_rows(&centroids_original),
            silhouette: kmeans_silhouette,
            silhouette_error: kmeans_silhouette_error,
            summary: kmeans_summary,
        },
        hierarchical: HierarchicalReport {
            labels: hierarchical.assignment.labels().to_vec(),
            n_clusters: hierarchical.assignment.n_clusters(),
            last_merges: hierarchical.tree.last_merges(config.dendrogram_merges).to_vec(),
            silhouette: hierarchical_silhouette,
            silhouette_error: hierarchical_silhouette_error,
            summary: hierarchical_summary,
        },
        crosstab,
        embedding,
    })
}
