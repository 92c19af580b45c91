use anyhow::Context;
use clap::Args;

use protgraph_core::annotate::{Evaluator, PropagationParams};

use super::GlobalOpts;

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Number of labeled proteins to hide and predict
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Ignore neighbors connected below this similarity
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Drop candidates whose cumulative weight is below this
    #[arg(long)]
    pub min_weight: Option<f64>,

    /// List every sample with its prediction
    #[arg(long)]
    pub details: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: EvaluateArgs, opts: &GlobalOpts) -> anyhow::Result<()> {
    let mut config = super::load_config(opts)?;
    if let Some(sample_size) = args.sample_size {
        config.evaluate.sample_size = sample_size;
    }
    if let Some(threshold) = args.threshold {
        config.annotate.similarity_threshold = threshold;
    }
    if let Some(min_weight) = args.min_weight {
        config.annotate.min_weight = min_weight;
    }
    config.validate().context("Invalid config override")?;

    let store = super::open_store(&super::resolve_db_path(opts, &config))?;
    let evaluator = Evaluator::new(
        PropagationParams::from(&config.annotate),
        config.evaluate.sample_size,
    )
    .context("Invalid config for evaluation")?;

    let progress = super::reporter(opts);
    let report = evaluator
        .run(&store, progress.as_ref())
        .await
        .context("Evaluation failed")?;

    if args.json {
        return super::print_json(&report);
    }

    println!("Evaluated {} labeled proteins", report.sample_size);
    println!();
    println!("  Predictions: {}", report.predictions_made);
    println!("  Correct:     {}", report.correct);
    println!("  Precision:   {:.2}", report.metrics.precision);
    println!("  Recall:      {:.2}", report.metrics.recall);
    println!("  F1 score:    {:.2}", report.metrics.f1);
    println!("  Coverage:    {:.2}", report.metrics.coverage);

    if args.details {
        println!();
        for outcome in &report.outcomes {
            println!(
                "  {} {:<12} truth={:<24} predicted={}",
                if outcome.correct { "+" } else { " " },
                outcome.entity_id,
                outcome.truth,
                outcome.predicted.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}
