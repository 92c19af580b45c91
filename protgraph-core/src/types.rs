use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ── Entities ───────────────────────────────────────────────────────

/// Separator used by both the domain list and the label field.
pub const FIELD_SEPARATOR: char = ';';

/// A protein record after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Accession (`Entry` column). Primary key.
    pub id: String,
    /// Short mnemonic name (`Entry Name` column).
    pub display_name: Option<String>,
    /// Free-text protein names (`Protein names` column).
    pub description: Option<String>,
    /// Gene names as exported (`Gene Names` column).
    pub gene_names: Option<String>,
    /// Raw EC number field, semicolon-joined. Kept un-split.
    pub labels: Option<String>,
    /// `InterPro` domain identifiers. Never empty after normalization.
    pub domains: BTreeSet<String>,
}

impl Entity {
    /// Label tokens of this entity, split and trimmed.
    pub fn label_tokens(&self) -> Vec<&str> {
        self.labels.as_deref().map(split_labels).unwrap_or_default()
    }

    /// Name shown by presentation layers: display name, or the id as fallback.
    pub fn shown_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Split a semicolon-joined label field into trimmed, non-empty tokens.
pub fn split_labels(raw: &str) -> Vec<&str> {
    raw.split(FIELD_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

// ── Edges ──────────────────────────────────────────────────────────

/// An undirected similarity edge. `source < target` lexicographically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

impl SimilarityEdge {
    /// Build an edge in canonical orientation. Returns `None` for self-loops.
    pub fn new(a: &str, b: &str, weight: f64) -> Option<Self> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Some(Self {
                source: a.to_string(),
                target: b.to_string(),
                weight,
            }),
            std::cmp::Ordering::Greater => Some(Self {
                source: b.to_string(),
                target: a.to_string(),
                weight,
            }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The unordered pair key.
    pub fn key(&self) -> (&str, &str) {
        (&self.source, &self.target)
    }

    /// The endpoint opposite `id`, if `id` is an endpoint.
    pub fn other(&self, id: &str) -> Option<&str> {
        if self.source == id {
            Some(&self.target)
        } else if self.target == id {
            Some(&self.source)
        } else {
            None
        }
    }
}

// ── Neighbor evidence ──────────────────────────────────────────────

/// One row of a neighbor query: a neighbor entity and the connecting weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub entity: Entity,
    pub weight: f64,
}

/// Cumulative evidence for one label within a single propagation query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelVote {
    pub label: String,
    pub weight: f64,
}

/// A persisted ranked prediction for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPrediction {
    pub entity_id: String,
    /// 1-based rank within the entity's vote list.
    pub rank: u32,
    pub label: String,
    pub weight: f64,
}

// ── Lookup ─────────────────────────────────────────────────────────

/// How an [`EntityLookup`] term is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Exact match on the accession.
    ById,
    /// Exact match on the full protein names text.
    ByName,
    /// ASCII case-insensitive substring over accession, display name and
    /// protein names. Non-ASCII letters must match exactly.
    ByKeyword,
}

impl MatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ById => "id",
            Self::ByName => "name",
            Self::ByKeyword => "keyword",
        }
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entity search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLookup {
    pub mode: MatchMode,
    pub term: String,
}

impl EntityLookup {
    pub fn by_id(term: impl Into<String>) -> Self {
        Self {
            mode: MatchMode::ById,
            term: term.into(),
        }
    }

    pub fn by_name(term: impl Into<String>) -> Self {
        Self {
            mode: MatchMode::ByName,
            term: term.into(),
        }
    }

    pub fn by_keyword(term: impl Into<String>) -> Self {
        Self {
            mode: MatchMode::ByKeyword,
            term: term.into(),
        }
    }

    /// Evaluate the lookup against an in-memory entity.
    pub fn matches(&self, entity: &Entity) -> bool {
        match self.mode {
            MatchMode::ById => entity.id == self.term,
            MatchMode::ByName => entity.description.as_deref() == Some(self.term.as_str()),
            MatchMode::ByKeyword => {
                let needle = self.term.to_ascii_lowercase();
                [
                    Some(entity.id.as_str()),
                    entity.display_name.as_deref(),
                    entity.description.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_ascii_lowercase().contains(&needle))
            }
        }
    }
}

// ── Presentation shapes ────────────────────────────────────────────

/// Node shape consumed by renderers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub display_name: String,
}

impl From<&Entity> for NodeView {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            display_name: entity.shown_name().to_string(),
        }
    }
}

/// Edge shape consumed by renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeView {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

impl From<&SimilarityEdge> for EdgeView {
    fn from(edge: &SimilarityEdge) -> Self {
        Self {
            source: edge.source.clone(),
            target: edge.target.clone(),
            weight: edge.weight,
        }
    }
}

// ── Store statistics ───────────────────────────────────────────────

/// Summary statistics about the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_entities: u64,
    pub total_edges: u64,
    pub labeled: u64,
    pub unlabeled: u64,
    pub isolated: u64,
    pub predictions: u64,
    pub db_size_bytes: u64,
}

/// Counts from one atomic graph write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphWrite {
    pub edges_removed: u64,
    pub entities_written: u64,
    pub edges_written: u64,
}

/// Degree of a single entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeEntry {
    pub id: String,
    pub degree: u64,
}
