// Similarity graph builder: pairwise Jaccard over domain sets.
//
// Pair counts and set sizes are cast to f64 for ratios; precision loss is
// irrelevant at these magnitudes.
#![allow(clippy::cast_precision_loss)]

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use petgraph::graph::UnGraph;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::{BuildStrategy, GraphSection};
use crate::error::BuildError;
use crate::progress::ProgressReporter;
use crate::types::{Entity, SimilarityEdge};

/// Jaccard similarity `|A ∩ B| / |A ∪ B|`. Zero when both sets are empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|d| large.contains(*d)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

// ── Options ────────────────────────────────────────────────────────

/// Parameters for one graph build.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Inclusive lower bound on edge weight.
    pub threshold: f64,
    pub strategy: BuildStrategy,
    /// Spread pair evaluation across the rayon pool.
    pub parallel: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from(&GraphSection::default())
    }
}

impl From<&GraphSection> for BuildOptions {
    fn from(section: &GraphSection) -> Self {
        Self {
            threshold: section.similarity_threshold,
            strategy: section.strategy,
            parallel: section.parallel,
        }
    }
}

/// Up-front cost model of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildCost {
    pub entities: u64,
    /// `n(n-1)/2`: comparisons done by the exhaustive strategy.
    pub exhaustive_pairs: u64,
}

impl BuildCost {
    pub fn for_entities(n: usize) -> Self {
        let n = n as u64;
        Self {
            entities: n,
            exhaustive_pairs: n * n.saturating_sub(1) / 2,
        }
    }
}

/// What a build produced.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub nodes: usize,
    pub edges: usize,
    pub isolated: usize,
    pub components: usize,
    pub pairs_compared: u64,
    pub cost: BuildCost,
    pub strategy: BuildStrategy,
    #[serde(skip)]
    pub duration: Duration,
}

// ── Graph ──────────────────────────────────────────────────────────

/// Undirected weighted graph over normalized entities.
///
/// Every entity is a node, including those without any qualifying edge.
/// Edges are sorted by `(source, target)`.
#[derive(Debug, Clone, Default)]
pub struct SimilarityGraph {
    entities: Vec<Entity>,
    edges: Vec<SimilarityEdge>,
}

impl SimilarityGraph {
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn edges(&self) -> &[SimilarityEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.entities.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Neighbors of `id` with their edge weights.
    pub fn neighbors(&self, id: &str) -> Vec<(&Entity, f64)> {
        let by_id: HashMap<&str, &Entity> =
            self.entities.iter().map(|e| (e.id.as_str(), e)).collect();
        self.edges
            .iter()
            .filter_map(|edge| {
                let other = edge.other(id)?;
                by_id.get(other).map(|e| (*e, edge.weight))
            })
            .collect()
    }

    /// Degree of every entity, in entity order.
    pub fn degrees(&self) -> Vec<(&str, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for edge in &self.edges {
            *counts.entry(edge.source.as_str()).or_default() += 1;
            *counts.entry(edge.target.as_str()).or_default() += 1;
        }
        self.entities
            .iter()
            .map(|e| (e.id.as_str(), counts.get(e.id.as_str()).copied().unwrap_or(0)))
            .collect()
    }

    /// Entities without any edge.
    pub fn isolated(&self) -> Vec<&Entity> {
        let degrees = self.degrees();
        self.entities
            .iter()
            .zip(degrees)
            .filter(|(_, (_, d))| *d == 0)
            .map(|(e, _)| e)
            .collect()
    }

    /// Number of connected components (isolated entities count as one each).
    pub fn component_count(&self) -> usize {
        let mut graph = UnGraph::<(), ()>::with_capacity(self.entities.len(), self.edges.len());
        let index: HashMap<&str, _> = self
            .entities
            .iter()
            .map(|e| (e.id.as_str(), graph.add_node(())))
            .collect();
        for edge in &self.edges {
            if let (Some(&a), Some(&b)) = (
                index.get(edge.source.as_str()),
                index.get(edge.target.as_str()),
            ) {
                graph.add_edge(a, b, ());
            }
        }
        petgraph::algo::connected_components(&graph)
    }
}

// ── Builder ────────────────────────────────────────────────────────

/// Builds a [`SimilarityGraph`] from normalized entities.
#[derive(Debug, Default)]
pub struct SimilarityGraphBuilder {
    pub options: BuildOptions,
}

impl SimilarityGraphBuilder {
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    /// Compute all qualifying edges and return the graph with a summary.
    pub fn build(
        &self,
        entities: Vec<Entity>,
        reporter: &dyn ProgressReporter,
    ) -> Result<(SimilarityGraph, BuildSummary), BuildError> {
        let threshold = self.options.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(BuildError::InvalidThreshold(threshold));
        }

        let start = Instant::now();
        let cost = BuildCost::for_entities(entities.len());
        // At threshold 0 every pair qualifies, so pruning would drop edges.
        let strategy = if threshold <= 0.0 {
            BuildStrategy::Exhaustive
        } else {
            self.options.strategy
        };
        info!(
            entities = cost.entities,
            exhaustive_pairs = cost.exhaustive_pairs,
            threshold,
            ?strategy,
            "Building similarity graph"
        );

        reporter.start("Comparing domain sets", Some(cost.entities));
        let pairs = PairSource::new(&entities, strategy);
        let rows: Vec<Row> = if self.options.parallel {
            (0..entities.len())
                .into_par_iter()
                .map(|i| {
                    let row = pairs.row(&entities, i, threshold);
                    reporter.advance(1);
                    row
                })
                .collect()
        } else {
            (0..entities.len())
                .map(|i| {
                    let row = pairs.row(&entities, i, threshold);
                    reporter.advance(1);
                    row
                })
                .collect()
        };
        reporter.finish();
        drop(pairs);

        let pairs_compared = rows.iter().map(|r| r.compared).sum();
        let mut edges: Vec<SimilarityEdge> = rows.into_iter().flat_map(|r| r.edges).collect();
        edges.sort_by(|a, b| a.key().cmp(&b.key()));

        let graph = SimilarityGraph { entities, edges };
        let summary = BuildSummary {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            isolated: graph.isolated().len(),
            components: graph.component_count(),
            pairs_compared,
            cost,
            strategy,
            duration: start.elapsed(),
        };
        info!(
            nodes = summary.nodes,
            edges = summary.edges,
            isolated = summary.isolated,
            components = summary.components,
            pairs_compared = summary.pairs_compared,
            elapsed_ms = summary.duration.as_millis(),
            "Similarity graph built"
        );
        Ok((graph, summary))
    }
}

/// Edges found for one left-hand entity.
#[derive(Debug, Default)]
struct Row {
    edges: Vec<SimilarityEdge>,
    compared: u64,
}

/// Enumerates right-hand partners `j > i` for each entity ordinal `i`.
#[derive(Debug)]
enum PairSource<'a> {
    Exhaustive,
    /// domain → ascending entity ordinals carrying it
    Inverted(HashMap<&'a str, Vec<usize>>),
}

impl<'a> PairSource<'a> {
    fn new(entities: &'a [Entity], strategy: BuildStrategy) -> Self {
        match strategy {
            BuildStrategy::Exhaustive => Self::Exhaustive,
            BuildStrategy::InvertedIndex => {
                let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
                for (ordinal, entity) in entities.iter().enumerate() {
                    for domain in &entity.domains {
                        index.entry(domain.as_str()).or_default().push(ordinal);
                    }
                }
                Self::Inverted(index)
            }
        }
    }

    fn partners(&self, entities: &[Entity], i: usize) -> Vec<usize> {
        match self {
            Self::Exhaustive => (i + 1..entities.len()).collect(),
            Self::Inverted(index) => {
                let mut partners: Vec<usize> = entities[i]
                    .domains
                    .iter()
                    .filter_map(|d| index.get(d.as_str()))
                    .flat_map(|posting| {
                        // Postings are ascending: skip everything at or before i.
                        let from = posting.partition_point(|&j| j <= i);
                        posting[from..].iter().copied()
                    })
                    .collect();
                partners.sort_unstable();
                partners.dedup();
                partners
            }
        }
    }

    fn row(&self, entities: &[Entity], i: usize, threshold: f64) -> Row {
        let left = &entities[i];
        let mut row = Row::default();
        for j in self.partners(entities, i) {
            let right = &entities[j];
            row.compared += 1;
            let weight = jaccard(&left.domains, &right.domains);
            if weight >= threshold {
                if let Some(edge) = SimilarityEdge::new(&left.id, &right.id, weight) {
                    row.edges.push(edge);
                }
            }
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopReporter;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn entity(id: &str, domains: &[&str]) -> Entity {
        Entity {
            id: id.to_string(),
            display_name: Some(format!("{id}_HUMAN")),
            description: None,
            gene_names: None,
            labels: None,
            domains: set(domains),
        }
    }

    fn build(entities: Vec<Entity>, threshold: f64, strategy: BuildStrategy) -> SimilarityGraph {
        let builder = SimilarityGraphBuilder::new(BuildOptions {
            threshold,
            strategy,
            parallel: false,
        });
        builder.build(entities, &NoopReporter).unwrap().0
    }

    #[test]
    fn jaccard_basics() {
        assert!((jaccard(&set(&["A", "B", "C"]), &set(&["B", "C", "D"])) - 0.5).abs() < 1e-12);
        assert!((jaccard(&set(&["A"]), &set(&["A"])) - 1.0).abs() < 1e-12);
        assert!(jaccard(&set(&["A"]), &set(&["B"])).abs() < 1e-12);
        assert!(jaccard(&set(&[]), &set(&[])).abs() < 1e-12);
    }

    #[test]
    fn three_protein_example() {
        let entities = vec![
            entity("P1", &["A", "B", "C"]),
            entity("P2", &["B", "C", "D"]),
            entity("P3", &["X", "Y"]),
        ];
        for strategy in [BuildStrategy::Exhaustive, BuildStrategy::InvertedIndex] {
            let graph = build(entities.clone(), 0.3, strategy);
            assert_eq!(graph.node_count(), 3);
            assert_eq!(graph.edge_count(), 1);
            let edge = &graph.edges()[0];
            assert_eq!(edge.key(), ("P1", "P2"));
            assert!((edge.weight - 0.5).abs() < 1e-12);
            let isolated: Vec<_> = graph.isolated().iter().map(|e| e.id.as_str()).collect();
            assert_eq!(isolated, vec!["P3"]);
            assert_eq!(graph.component_count(), 2);
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let entities = vec![entity("P1", &["A", "B"]), entity("P2", &["B", "C"])];
        // jaccard = 1/3
        let graph = build(entities.clone(), 1.0 / 3.0, BuildStrategy::Exhaustive);
        assert_eq!(graph.edge_count(), 1);
        let graph = build(entities, 0.34, BuildStrategy::Exhaustive);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn zero_threshold_connects_disjoint_sets() {
        let entities = vec![entity("P1", &["A"]), entity("P2", &["B"])];
        let graph = build(entities, 0.0, BuildStrategy::InvertedIndex);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.edges()[0].weight.abs() < 1e-12);
    }

    #[test]
    fn degenerate_inputs_are_not_errors() {
        assert_eq!(build(Vec::new(), 0.3, BuildStrategy::Exhaustive).node_count(), 0);
        let single = build(vec![entity("P1", &["A"])], 0.3, BuildStrategy::InvertedIndex);
        assert_eq!(single.node_count(), 1);
        assert_eq!(single.edge_count(), 0);
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let builder = SimilarityGraphBuilder::new(BuildOptions {
            threshold: 1.5,
            ..BuildOptions::default()
        });
        let err = builder.build(Vec::new(), &NoopReporter).unwrap_err();
        assert!(matches!(err, BuildError::InvalidThreshold(_)));

        let builder = SimilarityGraphBuilder::new(BuildOptions {
            threshold: f64::NAN,
            ..BuildOptions::default()
        });
        assert!(builder.build(Vec::new(), &NoopReporter).is_err());
    }

    #[test]
    fn inverted_index_compares_fewer_pairs() {
        let entities = vec![
            entity("P1", &["A"]),
            entity("P2", &["A"]),
            entity("P3", &["B"]),
            entity("P4", &["C"]),
        ];
        let builder = SimilarityGraphBuilder::new(BuildOptions {
            threshold: 0.3,
            strategy: BuildStrategy::InvertedIndex,
            parallel: false,
        });
        let (_, summary) = builder.build(entities, &NoopReporter).unwrap();
        assert_eq!(summary.cost.exhaustive_pairs, 6);
        assert_eq!(summary.pairs_compared, 1);
        assert_eq!(summary.edges, 1);
        assert_eq!(summary.isolated, 2);
    }

    #[test]
    fn neighbors_and_degrees() {
        let graph = build(
            vec![
                entity("P1", &["A", "B"]),
                entity("P2", &["A", "B"]),
                entity("P3", &["A", "B", "C"]),
            ],
            0.5,
            BuildStrategy::InvertedIndex,
        );
        let mut neighbors: Vec<_> = graph
            .neighbors("P3")
            .into_iter()
            .map(|(e, w)| (e.id.clone(), w))
            .collect();
        neighbors.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(neighbors.len(), 2);
        assert!((neighbors[0].1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(graph.degrees(), vec![("P1", 2), ("P2", 2), ("P3", 2)]);
    }

    #[test]
    fn parallel_build_matches_sequential() {
        let entities: Vec<Entity> = (0..40)
            .map(|i| {
                let domains = [format!("D{}", i % 5), format!("D{}", i % 7), format!("D{}", i % 3)];
                let refs: Vec<&str> = domains.iter().map(String::as_str).collect();
                entity(&format!("P{i:02}"), &refs)
            })
            .collect();
        let sequential = build(entities.clone(), 0.3, BuildStrategy::InvertedIndex);
        let builder = SimilarityGraphBuilder::new(BuildOptions {
            threshold: 0.3,
            strategy: BuildStrategy::InvertedIndex,
            parallel: true,
        });
        let (parallel, _) = builder.build(entities, &NoopReporter).unwrap();
        assert_eq!(sequential.edges(), parallel.edges());
    }
}
