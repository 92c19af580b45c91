use std::fmt::Write;

use anyhow::Context;
use clap::Args;

use protgraph_core::query::{self, GraphSample};

use super::GlobalOpts;

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Maximum number of proteins to include
    #[arg(long, default_value_t = 100)]
    pub limit: usize,

    /// Output format: text, json, dot
    #[arg(long, default_value = "text", value_parser = ["text", "json", "dot"])]
    pub format: String,
}

pub async fn run(args: GraphArgs, opts: &GlobalOpts) -> anyhow::Result<()> {
    let config = super::load_config(opts)?;
    let store = super::open_store(&super::resolve_db_path(opts, &config))?;

    let sample = query::graph_sample(&store, args.limit)
        .await
        .context("Graph query failed")?;

    match args.format.as_str() {
        "json" => super::print_json(&sample)?,
        "dot" => print!("{}", render_dot(&sample)),
        _ => print_text(&sample),
    }
    Ok(())
}

fn print_text(sample: &GraphSample) {
    println!("{} proteins, {} edges", sample.nodes.len(), sample.edges.len());
    for edge in &sample.edges {
        println!("  {} -- {}  {:.3}", edge.source, edge.target, edge.weight);
    }
}

fn render_dot(sample: &GraphSample) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "graph proteins {{");
    let _ = writeln!(out, "  node [shape=ellipse];");
    for node in &sample.nodes {
        let _ = writeln!(
            out,
            "  \"{}\" [label=\"{}\"];",
            escape(&node.id),
            escape(&node.display_name)
        );
    }
    for edge in &sample.edges {
        let _ = writeln!(
            out,
            "  \"{}\" -- \"{}\" [weight={:.3}, label=\"{:.2}\"];",
            escape(&edge.source),
            escape(&edge.target),
            edge.weight,
            edge.weight
        );
    }
    let _ = writeln!(out, "}}");
    out
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
