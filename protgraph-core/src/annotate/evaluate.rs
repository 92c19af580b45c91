// Offline evaluation: hide known labels, predict them back, restore.
#![allow(clippy::cast_precision_loss)]

use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::EvaluateSection;
use crate::error::AnnotateError;
use crate::progress::ProgressReporter;
use crate::store::GraphStore;
use crate::types::split_labels;

use super::propagate::{PropagationParams, predict_top1};

/// Precision, recall, F1 and coverage of one evaluation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EvaluationMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub coverage: f64,
}

impl EvaluationMetrics {
    /// Derive metrics from raw counts. Every ratio with a zero denominator is 0.
    pub fn from_counts(correct: usize, predicted: usize, truths: usize, samples: usize) -> Self {
        let precision = ratio(correct, predicted);
        let recall = ratio(correct, truths);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            coverage: ratio(predicted, samples),
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Result of predicting one hidden label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleOutcome {
    pub entity_id: String,
    /// The hidden label field, as stored.
    pub truth: String,
    pub predicted: Option<String>,
    /// The prediction is one of the truth's label tokens.
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub sample_size: usize,
    pub predictions_made: usize,
    pub correct: usize,
    pub true_labels: usize,
    pub metrics: EvaluationMetrics,
    pub outcomes: Vec<SampleOutcome>,
}

impl EvaluationReport {
    fn from_outcomes(outcomes: Vec<SampleOutcome>) -> Self {
        let predictions_made = outcomes.iter().filter(|o| o.predicted.is_some()).count();
        let correct = outcomes.iter().filter(|o| o.correct).count();
        let true_labels = outcomes.iter().filter(|o| !o.truth.is_empty()).count();
        let sample_size = outcomes.len();
        Self {
            sample_size,
            predictions_made,
            correct,
            true_labels,
            metrics: EvaluationMetrics::from_counts(
                correct,
                predictions_made,
                true_labels,
                sample_size,
            ),
            outcomes,
        }
    }
}

/// Leave-labels-out evaluation of label propagation.
///
/// Runs in three strictly ordered phases over the store:
/// 1. Hide the labels of every sampled entity.
/// 2. Predict a top-1 label for each sample from its still-labeled neighbors.
/// 3. Restore the labels hidden in phase 1, whether or not phase 2 succeeded.
///
/// A sample counts as correct when its top-1 label is any token of its
/// hidden label field.
#[derive(Debug, Clone)]
pub struct Evaluator {
    pub params: PropagationParams,
    pub sample_size: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            params: PropagationParams::default(),
            sample_size: EvaluateSection::default().sample_size,
        }
    }
}

impl Evaluator {
    pub fn new(params: PropagationParams, sample_size: usize) -> Result<Self, AnnotateError> {
        params.validate()?;
        Ok(Self {
            params,
            sample_size,
        })
    }

    pub async fn run(
        &self,
        store: &dyn GraphStore,
        reporter: &dyn ProgressReporter,
    ) -> crate::error::Result<EvaluationReport> {
        let start = Instant::now();
        let samples: Vec<(String, String)> = store
            .labeled_entities(self.sample_size)
            .await?
            .into_iter()
            .filter_map(|e| e.labels.map(|labels| (e.id, labels)))
            .collect();
        let ids: Vec<String> = samples.iter().map(|(id, _)| id.clone()).collect();

        let hidden = match store.hide_labels(&ids).await {
            Ok(n) => n,
            Err(e) => {
                restore(store, &ids).await;
                return Err(e);
            }
        };
        info!(samples = samples.len(), hidden, "Hid sample labels");

        let scored = self.score(store, &samples, reporter).await;
        let restored = store.restore_hidden_labels(&ids).await;

        let outcomes = match (scored, restored) {
            (Ok(outcomes), Ok(restored)) => {
                info!(restored, "Restored sample labels");
                outcomes
            }
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), restored) => {
                if let Err(restore_err) = restored {
                    warn!(error = %restore_err, "Label restore failed after scoring error");
                }
                return Err(e);
            }
        };

        let report = EvaluationReport::from_outcomes(outcomes);
        info!(
            samples = report.sample_size,
            predictions = report.predictions_made,
            correct = report.correct,
            precision = report.metrics.precision,
            recall = report.metrics.recall,
            f1 = report.metrics.f1,
            coverage = report.metrics.coverage,
            elapsed_ms = start.elapsed().as_millis(),
            "Evaluation complete"
        );
        Ok(report)
    }

    async fn score(
        &self,
        store: &dyn GraphStore,
        samples: &[(String, String)],
        reporter: &dyn ProgressReporter,
    ) -> crate::error::Result<Vec<SampleOutcome>> {
        reporter.start("Scoring hidden labels", Some(samples.len() as u64));
        let mut outcomes = Vec::with_capacity(samples.len());
        for (id, truth) in samples {
            let neighbors = match store.neighbors(id).await {
                Ok(n) => n,
                Err(e) => {
                    reporter.finish();
                    return Err(e);
                }
            };
            let predicted = predict_top1(&neighbors, &self.params);
            let correct = predicted
                .as_deref()
                .is_some_and(|label| split_labels(truth).contains(&label));
            outcomes.push(SampleOutcome {
                entity_id: id.clone(),
                truth: truth.clone(),
                predicted,
                correct,
            });
            reporter.advance(1);
        }
        reporter.finish();
        Ok(outcomes)
    }
}

async fn restore(store: &dyn GraphStore, ids: &[String]) {
    if let Err(e) = store.restore_hidden_labels(ids).await {
        warn!(error = %e, "Label restore failed");
    }
}
