// Query engine: entity lookup, neighborhoods and graph statistics.
//
// Shared by the CLI `search`, `neighbors`, `graph` and `status` commands.
#![allow(clippy::cast_precision_loss)]

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::store::GraphStore;
use crate::types::{
    DegreeEntry, EdgeView, Entity, EntityLookup, Neighbor, NodeView, SimilarityEdge,
};

/// Find entities matching `lookup`, ordered by id.
pub async fn lookup(
    store: &dyn GraphStore,
    lookup: &EntityLookup,
    limit: Option<usize>,
) -> crate::error::Result<Vec<Entity>> {
    store.find_entities(lookup, limit).await
}

// ── Neighborhoods ──────────────────────────────────────────────────

/// An entity with its neighbors up to two hops away.
#[derive(Debug, Clone, Serialize)]
pub struct Neighborhood {
    pub entity: Entity,
    /// Entities sharing an edge with `entity`, strongest first.
    pub direct: Vec<Neighbor>,
    /// Entities two hops away that are neither `entity` nor a direct neighbor.
    pub second: Vec<Entity>,
    /// Every edge with a direct neighbor as an endpoint.
    pub edges: Vec<SimilarityEdge>,
}

impl Neighborhood {
    pub fn nodes(&self) -> Vec<NodeView> {
        std::iter::once(&self.entity)
            .chain(self.direct.iter().map(|n| &n.entity))
            .chain(&self.second)
            .map(NodeView::from)
            .collect()
    }

    pub fn edge_views(&self) -> Vec<EdgeView> {
        self.edges.iter().map(EdgeView::from).collect()
    }
}

/// Two-hop neighborhood of `id`. `None` if the entity is unknown.
pub async fn neighborhood(
    store: &dyn GraphStore,
    id: &str,
) -> crate::error::Result<Option<Neighborhood>> {
    let Some(entity) = store.get_entity(id).await? else {
        return Ok(None);
    };
    let direct = store.neighbors(id).await?;
    let direct_ids: Vec<String> = direct.iter().map(|n| n.entity.id.clone()).collect();
    let edges = store.edges_touching(&direct_ids).await?;

    let mut known: BTreeSet<&str> = direct_ids.iter().map(String::as_str).collect();
    known.insert(id);
    let second_ids: BTreeSet<&str> = edges
        .iter()
        .flat_map(|e| [e.source.as_str(), e.target.as_str()])
        .filter(|other| !known.contains(other))
        .collect();

    let mut second = Vec::with_capacity(second_ids.len());
    for other in second_ids {
        if let Some(e) = store.get_entity(other).await? {
            second.push(e);
        }
    }

    Ok(Some(Neighborhood {
        entity,
        direct,
        second,
        edges,
    }))
}

/// One-hop view used when expanding a node in place.
#[derive(Debug, Clone, Serialize)]
pub struct Subgraph {
    pub entity: Entity,
    pub neighbors: Vec<Neighbor>,
    pub edges: Vec<SimilarityEdge>,
}

impl Subgraph {
    pub fn nodes(&self) -> Vec<NodeView> {
        std::iter::once(&self.entity)
            .chain(self.neighbors.iter().map(|n| &n.entity))
            .map(NodeView::from)
            .collect()
    }

    pub fn edge_views(&self) -> Vec<EdgeView> {
        self.edges.iter().map(EdgeView::from).collect()
    }
}

/// The entity, its direct neighbors and its incident edges.
pub async fn subgraph(store: &dyn GraphStore, id: &str) -> crate::error::Result<Option<Subgraph>> {
    let Some(entity) = store.get_entity(id).await? else {
        return Ok(None);
    };
    Ok(Some(Subgraph {
        entity,
        neighbors: store.neighbors(id).await?,
        edges: store.incident_edges(id).await?,
    }))
}

/// Renderer-ready slice of the graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphSample {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

/// Up to `limit` entities (by id) and the edges among them.
pub async fn graph_sample(
    store: &dyn GraphStore,
    limit: usize,
) -> crate::error::Result<GraphSample> {
    let entities = store.list_entities(Some(limit)).await?;
    let ids: Vec<String> = entities.iter().map(|e| e.id.clone()).collect();
    let members: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
    let edges = store
        .edges_touching(&ids)
        .await?
        .iter()
        .filter(|e| members.contains(e.source.as_str()) && members.contains(e.target.as_str()))
        .map(EdgeView::from)
        .collect();
    Ok(GraphSample {
        nodes: entities.iter().map(NodeView::from).collect(),
        edges,
    })
}

// ── Statistics ─────────────────────────────────────────────────────

/// Dashboard-style summary of the stored graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphStatistics {
    pub total_entities: u64,
    pub total_edges: u64,
    pub labeled: u64,
    pub unlabeled: u64,
    pub isolated: u64,
    /// First isolated entities by id.
    pub isolated_sample: Vec<NodeView>,
    /// degree → number of entities with that degree
    pub degree_histogram: BTreeMap<u64, u64>,
    pub average_degree: f64,
    pub max_degree: u64,
    pub most_connected: Option<DegreeEntry>,
}

/// Summarize the stored graph. `isolated_limit` bounds the isolated list.
pub async fn statistics(
    store: &dyn GraphStore,
    isolated_limit: usize,
) -> crate::error::Result<GraphStatistics> {
    let stats = store.stats().await?;
    let (labeled, unlabeled) = store.count_by_label_presence().await?;
    let isolated_sample = store
        .nodes_without_edges(Some(isolated_limit))
        .await?
        .iter()
        .map(NodeView::from)
        .collect();
    let degrees = store.degree_distribution().await?;

    let mut degree_histogram = BTreeMap::new();
    for entry in &degrees {
        *degree_histogram.entry(entry.degree).or_insert(0u64) += 1;
    }
    let average_degree = if degrees.is_empty() {
        0.0
    } else {
        degrees.iter().map(|d| d.degree).sum::<u64>() as f64 / degrees.len() as f64
    };
    // Ties go to the smallest id
    let most_connected = degrees
        .iter()
        .filter(|d| d.degree > 0)
        .fold(None::<&DegreeEntry>, |best, d| match best {
            Some(b) if b.degree >= d.degree => Some(b),
            _ => Some(d),
        })
        .cloned();

    Ok(GraphStatistics {
        total_entities: stats.total_entities,
        total_edges: stats.total_edges,
        labeled,
        unlabeled,
        isolated: stats.isolated,
        isolated_sample,
        degree_histogram,
        average_degree,
        max_degree: most_connected.as_ref().map_or(0, |d| d.degree),
        most_connected,
    })
}

// ── Navigation ─────────────────────────────────────────────────────

/// History of displayed subgraphs, owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct NavigationStack {
    frames: Vec<Subgraph>,
}

impl NavigationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, view: Subgraph) {
        self.frames.push(view);
    }

    /// Drop the current view and return it. The previous view becomes current.
    pub fn pop(&mut self) -> Option<Subgraph> {
        self.frames.pop()
    }

    pub fn current(&self) -> Option<&Subgraph> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
