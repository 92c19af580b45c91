use anyhow::Context;
use clap::Args;
use serde::Serialize;

use protgraph_core::query;
use protgraph_core::types::{EdgeView, NodeView};

use super::GlobalOpts;

#[derive(Args, Debug)]
pub struct NeighborsArgs {
    /// Accession of the protein
    pub id: String,

    /// Hops to include: 1 (direct neighbors) or 2 (neighbors of neighbors)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub depth: u8,

    /// Print nodes and edges as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct GraphJson {
    nodes: Vec<NodeView>,
    edges: Vec<EdgeView>,
}

pub async fn run(args: NeighborsArgs, opts: &GlobalOpts) -> anyhow::Result<()> {
    let config = super::load_config(opts)?;
    let store = super::open_store(&super::resolve_db_path(opts, &config))?;

    if args.depth == 1 {
        let Some(view) = query::subgraph(&store, &args.id)
            .await
            .context("Neighbor query failed")?
        else {
            println!("No protein with accession {}", args.id);
            return Ok(());
        };
        if args.json {
            return super::print_json(&GraphJson {
                nodes: view.nodes(),
                edges: view.edge_views(),
            });
        }
        println!("{} ({})", view.entity.id, view.entity.shown_name());
        if view.neighbors.is_empty() {
            println!("  no neighbors");
        }
        for n in &view.neighbors {
            println!(
                "  {:<12} {:<16} {:.3}  {}",
                n.entity.id,
                n.entity.shown_name(),
                n.weight,
                n.entity.labels.as_deref().unwrap_or("-")
            );
        }
        return Ok(());
    }

    let Some(hood) = query::neighborhood(&store, &args.id)
        .await
        .context("Neighbor query failed")?
    else {
        println!("No protein with accession {}", args.id);
        return Ok(());
    };
    if args.json {
        return super::print_json(&GraphJson {
            nodes: hood.nodes(),
            edges: hood.edge_views(),
        });
    }

    println!("{} ({})", hood.entity.id, hood.entity.shown_name());
    println!();
    println!("  Direct neighbors ({}):", hood.direct.len());
    for n in &hood.direct {
        println!("    {:<12} {:<16} {:.3}", n.entity.id, n.entity.shown_name(), n.weight);
    }
    println!("  Second neighbors ({}):", hood.second.len());
    for e in &hood.second {
        println!("    {:<12} {}", e.id, e.shown_name());
    }
    println!("  Edges: {}", hood.edges.len());
    Ok(())
}
