use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use protgraph_core::config::BuildStrategy;
use protgraph_core::pipeline::load_and_persist;
use protgraph_core::store::sqlite::SqliteStore;

use super::GlobalOpts;

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Tab-separated protein table (Entry, Entry Name, Protein names, Gene Names, EC number, InterPro)
    pub table: PathBuf,

    /// Minimum Jaccard similarity for an edge
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Pair enumeration strategy
    #[arg(long, value_parser = ["exhaustive", "inverted-index"])]
    pub strategy: Option<String>,

    /// Keep only the first N normalized records
    #[arg(long)]
    pub limit: Option<usize>,

    /// Compare pairs on a single thread
    #[arg(long)]
    pub no_parallel: bool,

    /// Keep edges from earlier loads instead of replacing them
    #[arg(long)]
    pub keep_edges: bool,

    /// Print the load report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: LoadArgs, opts: &GlobalOpts) -> anyhow::Result<()> {
    let mut config = super::load_config(opts)?;
    if let Some(threshold) = args.threshold {
        config.graph.similarity_threshold = threshold;
    }
    if let Some(strategy) = args.strategy.as_deref() {
        config.graph.strategy = match strategy {
            "exhaustive" => BuildStrategy::Exhaustive,
            _ => BuildStrategy::InvertedIndex,
        };
    }
    if args.limit.is_some() {
        config.input.limit = args.limit;
    }
    if args.no_parallel {
        config.graph.parallel = false;
    }
    if args.keep_edges {
        config.graph.replace_edges = false;
    }
    config.validate().context("Invalid config override")?;

    if !args.table.exists() {
        anyhow::bail!("Input table not found: {}", args.table.display());
    }

    let db_path = super::resolve_db_path(opts, &config);
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Cannot open database: {}", db_path.display()))?;

    let progress = super::reporter(opts);
    let report = load_and_persist(&args.table, &config, &store, progress.as_ref())
        .await
        .with_context(|| format!("Cannot load input table: {}", args.table.display()))?;

    if args.json {
        return super::print_json(&report);
    }

    let build = &report.build;
    println!("Loaded {} into {}", args.table.display(), db_path.display());
    println!();
    println!("  Rows read:        {}", report.raw_records);
    println!("  Proteins kept:    {}", report.normalized);
    println!("  Edges:            {}", build.edges);
    println!("  Isolated:         {}", build.isolated);
    println!("  Components:       {}", build.components);
    println!(
        "  Pairs compared:   {} of {} ({:?})",
        build.pairs_compared, build.cost.exhaustive_pairs, build.strategy
    );
    if report.edges_replaced > 0 {
        println!("  Edges replaced:   {}", report.edges_replaced);
    }
    println!("  Duration:         {:.2?}", report.duration);
    Ok(())
}
