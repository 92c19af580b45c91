use anyhow::Context;
use clap::Args;

use protgraph_core::query;

use super::GlobalOpts;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Number of isolated proteins to list
    #[arg(long, default_value_t = 10)]
    pub isolated: usize,

    /// Print statistics as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: StatusArgs, opts: &GlobalOpts) -> anyhow::Result<()> {
    let config = super::load_config(opts)?;
    let db_path = super::resolve_db_path(opts, &config);
    let store = super::open_store(&db_path)?;

    let stats = query::statistics(&store, args.isolated)
        .await
        .context("Failed to read graph statistics")?;

    if args.json {
        return super::print_json(&stats);
    }

    println!("protgraph status for {}", db_path.display());
    println!();
    println!("  Proteins:  {} total", stats.total_entities);
    println!("    labeled     {:>8}", stats.labeled);
    println!("    unlabeled   {:>8}", stats.unlabeled);
    println!("    isolated    {:>8}", stats.isolated);
    println!("  Edges:     {}", stats.total_edges);
    println!();
    println!("  Average degree: {:.2}", stats.average_degree);
    match &stats.most_connected {
        Some(top) => println!("  Most connected: {} ({} edges)", top.id, top.degree),
        None => println!("  Most connected: (none)"),
    }

    if !stats.degree_histogram.is_empty() {
        println!();
        println!("  Degree distribution:");
        for (degree, count) in &stats.degree_histogram {
            println!("    {degree:>6}  {count:>8}");
        }
    }

    if !stats.isolated_sample.is_empty() {
        println!();
        println!("  Isolated proteins (first {}):", stats.isolated_sample.len());
        for node in &stats.isolated_sample {
            println!("    {:<12} {}", node.id, node.display_name);
        }
    }
    Ok(())
}
