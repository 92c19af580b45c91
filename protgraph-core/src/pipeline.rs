// Pipeline orchestrator: read → normalize → build → persist.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::config::ProtGraphConfig;
use crate::normalize;
use crate::progress::ProgressReporter;
use crate::similarity::{BuildOptions, BuildSummary, SimilarityGraphBuilder};
use crate::store::GraphStore;

/// What one load run did.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Data rows read from the table.
    pub raw_records: usize,
    /// Entities kept after normalization.
    pub normalized: usize,
    pub build: BuildSummary,
    /// Edges from earlier runs removed before persisting.
    pub edges_replaced: u64,
    pub entities_written: u64,
    pub edges_written: u64,
    #[serde(skip)]
    pub duration: Duration,
}

/// Load a table, build its similarity graph and persist it atomically.
pub async fn load_and_persist(
    path: &Path,
    config: &ProtGraphConfig,
    store: &dyn GraphStore,
    reporter: &dyn ProgressReporter,
) -> crate::error::Result<PipelineReport> {
    let start = Instant::now();

    let (raw_records, entities) = normalize::load_table(path, config.input.limit)?;
    let normalized = entities.len();

    let builder = SimilarityGraphBuilder::new(BuildOptions::from(&config.graph));
    let (graph, build) = builder.build(entities, reporter)?;

    let written = store
        .replace_graph(graph.entities(), graph.edges(), config.graph.replace_edges)
        .await?;

    let report = PipelineReport {
        raw_records,
        normalized,
        build,
        edges_replaced: written.edges_removed,
        entities_written: written.entities_written,
        edges_written: written.edges_written,
        duration: start.elapsed(),
    };
    info!(
        raw = report.raw_records,
        normalized = report.normalized,
        entities = report.entities_written,
        edges = report.edges_written,
        replaced = report.edges_replaced,
        elapsed_ms = report.duration.as_millis(),
        "Pipeline complete"
    );
    Ok(report)
}
