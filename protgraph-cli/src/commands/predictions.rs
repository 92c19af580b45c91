use anyhow::Context;
use clap::Args;

use protgraph_core::store::GraphStore;

use super::GlobalOpts;

#[derive(Args, Debug)]
pub struct PredictionsArgs {
    /// Only show EC numbers starting with this prefix (e.g. "2.7.")
    #[arg(long)]
    pub prefix: Option<String>,

    /// Maximum number of rows
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Print predictions as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: PredictionsArgs, opts: &GlobalOpts) -> anyhow::Result<()> {
    let config = super::load_config(opts)?;
    let store = super::open_store(&super::resolve_db_path(opts, &config))?;

    let rows = store
        .predictions(args.prefix.as_deref(), Some(args.limit))
        .await
        .context("Failed to read predictions")?;

    if args.json {
        return super::print_json(&rows);
    }
    if rows.is_empty() {
        println!("No stored predictions. Run `protgraph annotate <ID> --save` first.");
        return Ok(());
    }
    for p in &rows {
        println!("{:<12} {:>2}. {:<16} {:.3}", p.entity_id, p.rank, p.label, p.weight);
    }
    Ok(())
}
