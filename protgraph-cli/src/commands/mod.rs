pub mod annotate;
pub mod evaluate;
pub mod graph;
pub mod load;
pub mod neighbors;
pub mod predictions;
pub mod search;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use serde::Serialize;

use protgraph_core::config::ProtGraphConfig;
use protgraph_core::progress::{IndicatifReporter, ProgressReporter};
use protgraph_core::store::sqlite::SqliteStore;

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG: &str = "protgraph.toml";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a protein table, build the similarity graph and store it
    Load(load::LoadArgs),
    /// Show counts and degree statistics of the stored graph
    Status(status::StatusArgs),
    /// Find proteins by accession, exact name or keyword
    Search(search::SearchArgs),
    /// Show the neighborhood of one protein
    Neighbors(neighbors::NeighborsArgs),
    /// Export a slice of the graph as text, JSON or DOT
    Graph(graph::GraphArgs),
    /// Suggest EC numbers for a protein from its neighbors
    Annotate(annotate::AnnotateArgs),
    /// Measure prediction quality by hiding known labels
    Evaluate(evaluate::EvaluateArgs),
    /// List stored predictions
    Predictions(predictions::PredictionsArgs),
}

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub quiet: bool,
}

pub async fn run(cmd: Command, opts: &GlobalOpts) -> anyhow::Result<()> {
    match cmd {
        Command::Load(args) => load::run(args, opts).await,
        Command::Status(args) => status::run(args, opts).await,
        Command::Search(args) => search::run(args, opts).await,
        Command::Neighbors(args) => neighbors::run(args, opts).await,
        Command::Graph(args) => graph::run(args, opts).await,
        Command::Annotate(args) => annotate::run(args, opts).await,
        Command::Evaluate(args) => evaluate::run(args, opts).await,
        Command::Predictions(args) => predictions::run(args, opts).await,
    }
}

/// Load the config file. An explicit `--config` must exist; the default
/// `protgraph.toml` falls back to built-in defaults when absent.
pub fn load_config(opts: &GlobalOpts) -> anyhow::Result<ProtGraphConfig> {
    let config = match &opts.config {
        Some(path) => ProtGraphConfig::load(path)
            .with_context(|| format!("Cannot load config: {}", path.display()))?,
        None => ProtGraphConfig::load_or_default(Path::new(DEFAULT_CONFIG))
            .with_context(|| format!("Cannot load config: {DEFAULT_CONFIG}"))?,
    };
    Ok(config)
}

/// Database path: `--db` wins over `[store] path`.
pub fn resolve_db_path(opts: &GlobalOpts, config: &ProtGraphConfig) -> PathBuf {
    opts.db.clone().unwrap_or_else(|| config.store.path.clone())
}

/// Open a store that a previous `load` created.
pub fn open_store(db_path: &Path) -> anyhow::Result<SqliteStore> {
    SqliteStore::open_existing(db_path).with_context(|| {
        format!(
            "Cannot open database: {}. Run `protgraph load` first.",
            db_path.display()
        )
    })
}

pub fn reporter(opts: &GlobalOpts) -> Box<dyn ProgressReporter> {
    if opts.quiet {
        Box::new(IndicatifReporter::hidden())
    } else {
        Box::new(IndicatifReporter::new())
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
