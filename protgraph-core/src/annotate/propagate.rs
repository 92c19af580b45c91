use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::AnnotateSection;
use crate::error::AnnotateError;
use crate::store::GraphStore;
use crate::types::{LabelVote, Neighbor};

/// Knobs for one propagation query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationParams {
    /// Neighbors connected below this weight cast no votes.
    pub similarity_threshold: f64,
    /// Maximum number of labels returned.
    pub top_n: usize,
    /// Labels whose cumulative weight falls below this are dropped.
    pub min_weight: f64,
}

impl Default for PropagationParams {
    fn default() -> Self {
        Self::from(&AnnotateSection::default())
    }
}

impl From<&AnnotateSection> for PropagationParams {
    fn from(section: &AnnotateSection) -> Self {
        Self {
            similarity_threshold: section.similarity_threshold,
            top_n: section.top_n,
            min_weight: section.min_weight,
        }
    }
}

impl PropagationParams {
    pub fn validate(&self) -> Result<(), AnnotateError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(AnnotateError::InvalidParameter(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.top_n == 0 {
            return Err(AnnotateError::InvalidParameter(
                "top_n must be at least 1".into(),
            ));
        }
        if !self.min_weight.is_finite() || self.min_weight < 0.0 {
            return Err(AnnotateError::InvalidParameter(format!(
                "min_weight must be a non-negative number, got {}",
                self.min_weight
            )));
        }
        Ok(())
    }
}

/// Rank candidate labels for an entity from its neighbors.
///
/// Every label token of a qualifying neighbor receives that neighbor's full
/// edge weight. A neighbor annotated `"1.1.1.1;2.2.2.2"` at weight 0.5 adds
/// 0.5 to both labels. Ties keep the order in which labels were first seen.
pub fn aggregate(neighbors: &[Neighbor], params: &PropagationParams) -> Vec<LabelVote> {
    let mut votes: Vec<LabelVote> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();

    for neighbor in neighbors
        .iter()
        .filter(|n| n.weight >= params.similarity_threshold)
    {
        for token in neighbor.entity.label_tokens() {
            if let Some(&i) = slot.get(token) {
                votes[i].weight += neighbor.weight;
            } else {
                slot.insert(token, votes.len());
                votes.push(LabelVote {
                    label: token.to_string(),
                    weight: neighbor.weight,
                });
            }
        }
    }

    votes.retain(|v| v.weight >= params.min_weight);
    // sort_by is stable: equal weights stay in first-seen order
    votes.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    votes.truncate(params.top_n);
    votes
}

/// The single best label, or `None` when no neighbor qualifies.
pub fn predict_top1(neighbors: &[Neighbor], params: &PropagationParams) -> Option<String> {
    let single = PropagationParams { top_n: 1, ..*params };
    aggregate(neighbors, &single)
        .into_iter()
        .next()
        .map(|v| v.label)
}

/// Store-backed label propagation.
#[derive(Debug, Clone, Default)]
pub struct Annotator {
    pub params: PropagationParams,
}

impl Annotator {
    pub fn new(params: PropagationParams) -> Result<Self, AnnotateError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Ranked label suggestions for `id`. `None` when the entity is unknown,
    /// an empty list when no neighbor contributes evidence.
    pub async fn annotate(
        &self,
        store: &dyn GraphStore,
        id: &str,
    ) -> crate::error::Result<Option<Vec<LabelVote>>> {
        if store.get_entity(id).await?.is_none() {
            debug!(id, "annotate: unknown entity");
            return Ok(None);
        }
        let neighbors = store.neighbors(id).await?;
        let votes = aggregate(&neighbors, &self.params);
        debug!(
            id,
            neighbors = neighbors.len(),
            labels = votes.len(),
            "Aggregated neighbor evidence"
        );
        Ok(Some(votes))
    }

    /// Like [`annotate`](Self::annotate), and replaces the stored
    /// predictions of `id` with the result.
    pub async fn annotate_and_save(
        &self,
        store: &dyn GraphStore,
        id: &str,
    ) -> crate::error::Result<Option<Vec<LabelVote>>> {
        let Some(votes) = self.annotate(store, id).await? else {
            return Ok(None);
        };
        store.replace_predictions(id, &votes).await?;
        info!(id, saved = votes.len(), "Stored label predictions");
        Ok(Some(votes))
    }
}


// ── Property-based tests ──────────────────────────────────────────────
#[cfg(test)]
mod proptests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::types::Entity;
    use proptest::prelude::*;

    fn arb_neighbor() -> impl Strategy<Value = Neighbor> {
        (
            proptest::option::of(proptest::collection::btree_set("[1-3]\\.[1-3]\\.1\\.1", 1..4)),
            0.0f64..=1.0,
        )
            .prop_map(|(labels, weight)| Neighbor {
                entity: Entity {
                    id: "N".into(),
                    display_name: None,
                    description: None,
                    gene_names: None,
                    labels: labels.map(|l| l.into_iter().collect::<Vec<_>>().join(";")),
                    domains: BTreeSet::new(),
                },
                weight,
            })
    }

    proptest! {
        #[test]
        fn votes_are_sorted_bounded_and_unique(
            neighbors in proptest::collection::vec(arb_neighbor(), 0..20),
            top_n in 1usize..6,
            min_weight in 0.0f64..1.5,
        ) {
            let params = PropagationParams { similarity_threshold: 0.2, top_n, min_weight };
            let votes = aggregate(&neighbors, &params);

            prop_assert!(votes.len() <= top_n);
            prop_assert!(votes.windows(2).all(|w| w[0].weight >= w[1].weight));
            prop_assert!(votes.iter().all(|v| v.weight >= min_weight));
            let distinct: BTreeSet<_> = votes.iter().map(|v| &v.label).collect();
            prop_assert_eq!(distinct.len(), votes.len());
        }

        #[test]
        fn vote_weight_never_exceeds_total_evidence(
            neighbors in proptest::collection::vec(arb_neighbor(), 0..20),
        ) {
            let params = PropagationParams { similarity_threshold: 0.0, top_n: 100, min_weight: 0.0 };
            let total: f64 = neighbors.iter().filter(|n| n.entity.labels.is_some()).map(|n| n.weight).sum();
            for vote in aggregate(&neighbors, &params) {
                prop_assert!(vote.weight <= total + 1e-9);
            }
        }
    }
}
