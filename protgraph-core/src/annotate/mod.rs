//! Label propagation over the similarity graph.
//!
//! [`propagate`] holds the pure evidence aggregator and the store-backed
//! [`Annotator`]. [`evaluate`] measures prediction quality by hiding known
//! labels and predicting them back.

pub mod evaluate;
pub mod propagate;

pub use evaluate::{EvaluationMetrics, EvaluationReport, Evaluator, SampleOutcome};
pub use propagate::{Annotator, PropagationParams, aggregate, predict_top1};
