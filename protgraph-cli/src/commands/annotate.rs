use anyhow::Context;
use clap::Args;

use protgraph_core::annotate::{Annotator, PropagationParams};

use super::GlobalOpts;

#[derive(Args, Debug)]
pub struct AnnotateArgs {
    /// Accession of the protein to annotate
    pub id: String,

    /// Maximum number of EC numbers to suggest
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Drop suggestions whose cumulative weight is below this
    #[arg(long)]
    pub min_weight: Option<f64>,

    /// Ignore neighbors connected below this similarity
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Store the suggestions as predictions for this protein
    #[arg(long)]
    pub save: bool,

    /// Print suggestions as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: AnnotateArgs, opts: &GlobalOpts) -> anyhow::Result<()> {
    let mut config = super::load_config(opts)?;
    if let Some(top_n) = args.top_n {
        config.annotate.top_n = top_n;
    }
    if let Some(min_weight) = args.min_weight {
        config.annotate.min_weight = min_weight;
    }
    if let Some(threshold) = args.threshold {
        config.annotate.similarity_threshold = threshold;
    }
    config.validate().context("Invalid config override")?;

    let store = super::open_store(&super::resolve_db_path(opts, &config))?;
    let annotator = Annotator::new(PropagationParams::from(&config.annotate))
        .context("Invalid config for annotation")?;

    let votes = if args.save {
        annotator.annotate_and_save(&store, &args.id).await
    } else {
        annotator.annotate(&store, &args.id).await
    }
    .context("Annotation failed")?;

    let Some(votes) = votes else {
        println!("No protein with accession {}", args.id);
        return Ok(());
    };

    if args.json {
        return super::print_json(&votes);
    }
    if votes.is_empty() {
        println!("No labeled neighbors above the threshold for {}", args.id);
        return Ok(());
    }
    println!("Suggested EC numbers for {}:", args.id);
    for (rank, vote) in votes.iter().enumerate() {
        println!("  {:>2}. {:<16} {:.3}", rank + 1, vote.label, vote.weight);
    }
    if args.save {
        println!();
        println!("Saved {} predictions.", votes.len());
    }
    Ok(())
}
