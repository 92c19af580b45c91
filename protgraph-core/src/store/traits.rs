use crate::types::{
    DegreeEntry, Entity, EntityLookup, GraphWrite, LabelPrediction, LabelVote, Neighbor,
    SimilarityEdge, StoreStats,
};

/// The graph store abstraction. Loading, querying and annotation all go
/// through this trait.
///
/// Reads that find nothing return `None` or an empty `Vec`. An `Err` means
/// the store itself failed; see
/// [`ProtGraphError::is_store_unavailable`](crate::error::ProtGraphError::is_store_unavailable).
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    // ── Entity operations ──────────────────────────────────────────

    /// Insert or update an entity, keyed by its id.
    async fn upsert_entity(&self, entity: &Entity) -> crate::error::Result<()>;

    /// Batch upsert within a single transaction. Returns the number written.
    async fn upsert_entities_batch(&self, entities: &[Entity]) -> crate::error::Result<u64>;

    /// Get an entity by id.
    async fn get_entity(&self, id: &str) -> crate::error::Result<Option<Entity>>;

    /// Find entities matching a lookup, ordered by id.
    async fn find_entities(
        &self,
        lookup: &EntityLookup,
        limit: Option<usize>,
    ) -> crate::error::Result<Vec<Entity>>;

    /// List entities ordered by id.
    async fn list_entities(&self, limit: Option<usize>) -> crate::error::Result<Vec<Entity>>;

    /// Entities whose label field is present, ordered by id.
    async fn labeled_entities(&self, limit: usize) -> crate::error::Result<Vec<Entity>>;

    // ── Edge operations ────────────────────────────────────────────

    /// Insert or update an edge, keyed by its unordered pair.
    async fn upsert_edge(&self, edge: &SimilarityEdge) -> crate::error::Result<()>;

    /// Batch upsert within a single transaction. Returns the number written.
    async fn upsert_edges_batch(&self, edges: &[SimilarityEdge]) -> crate::error::Result<u64>;

    /// Remove every edge. Returns the number removed.
    async fn clear_edges(&self) -> crate::error::Result<u64>;

    /// All neighbors of an entity with the connecting weights.
    async fn neighbors(&self, id: &str) -> crate::error::Result<Vec<Neighbor>>;

    /// Edges with `id` as an endpoint.
    async fn incident_edges(&self, id: &str) -> crate::error::Result<Vec<SimilarityEdge>>;

    /// Edges with at least one endpoint in `ids`, each reported once.
    async fn edges_touching(&self, ids: &[String]) -> crate::error::Result<Vec<SimilarityEdge>>;

    /// A page of edges ordered by `(source, target)`.
    async fn list_edges(&self, limit: Option<usize>) -> crate::error::Result<Vec<SimilarityEdge>>;

    // ── Graph statistics ───────────────────────────────────────────

    /// Degree of an entity, `None` if the entity is unknown.
    async fn degree(&self, id: &str) -> crate::error::Result<Option<u64>>;

    /// Degree of every entity, ordered by id.
    async fn degree_distribution(&self) -> crate::error::Result<Vec<DegreeEntry>>;

    /// Entities without any edge, ordered by id.
    async fn nodes_without_edges(&self, limit: Option<usize>)
    -> crate::error::Result<Vec<Entity>>;

    /// Number of entities without any edge.
    async fn count_isolated(&self) -> crate::error::Result<u64>;

    /// `(labeled, unlabeled)` entity counts.
    async fn count_by_label_presence(&self) -> crate::error::Result<(u64, u64)>;

    // ── Evaluation support ─────────────────────────────────────────

    /// Move the label field of each listed entity aside. Returns the number hidden.
    async fn hide_labels(&self, ids: &[String]) -> crate::error::Result<u64>;

    /// Put the hidden labels of the listed entities back. Returns the number restored.
    async fn restore_hidden_labels(&self, ids: &[String]) -> crate::error::Result<u64>;

    // ── Predictions ────────────────────────────────────────────────

    /// Replace the stored prediction list of one entity.
    async fn replace_predictions(
        &self,
        entity_id: &str,
        votes: &[LabelVote],
    ) -> crate::error::Result<()>;

    /// Stored predictions, optionally restricted to labels starting with
    /// `label_prefix`. Ordered by entity id, then rank.
    async fn predictions(
        &self,
        label_prefix: Option<&str>,
        limit: Option<usize>,
    ) -> crate::error::Result<Vec<LabelPrediction>>;

    // ── Graph replacement ─────────────────────────────────────────

    /// Write a whole graph atomically: optionally clear every edge, then
    /// upsert `entities` and `edges`. Either all of it lands or none.
    ///
    /// No other operation on the same store interleaves with the write.
    async fn replace_graph(
        &self,
        entities: &[Entity],
        edges: &[SimilarityEdge],
        clear_edges: bool,
    ) -> crate::error::Result<GraphWrite>;

    // ── Metrics ────────────────────────────────────────────────────

    /// Get summary statistics about the store.
    async fn stats(&self) -> crate::error::Result<StoreStats>;
}
