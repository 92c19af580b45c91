use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params, params_from_iter};

use crate::error::StoreError;
use crate::types::{
    DegreeEntry, Entity, EntityLookup, GraphWrite, LabelPrediction, LabelVote, MatchMode,
    Neighbor, SimilarityEdge, StoreStats,
};

use super::GraphStore;
use super::schema;

/// Entity columns in the order `row_to_entity` expects.
const ENTITY_COLUMNS: &str = "id, display_name, description, gene_names, labels, domains";

/// Upper bound on bound parameters per `IN (...)` list.
const IN_CHUNK: usize = 400;

/// SQLite-backed implementation of `GraphStore`.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> crate::error::Result<Self> {
        let conn = Connection::open(path).map_err(StoreError::classify)?;
        Self::with_connection(conn, Some(path))
    }

    /// Open a store that must already exist. A missing file is reported as
    /// [`StoreError::Unavailable`] instead of silently creating an empty store.
    pub fn open_existing(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Err(StoreError::Unavailable(format!(
                "database not found: {}",
                path.display()
            ))
            .into());
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(StoreError::classify)?;
        Self::with_connection(conn, Some(path))
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::classify)?;
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, path: Option<&Path>) -> crate::error::Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            db_path: path.map(Path::to_path_buf),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> crate::error::Result<()> {
        let conn = self.session()?;

        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(StoreError::classify)?;

        // WAL is ignored for in-memory databases
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");

        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(StoreError::classify)?;
        conn.execute_batch(schema::VIEWS_SQL)
            .map_err(StoreError::classify)?;

        conn.execute(
            "INSERT OR IGNORE INTO protgraph_meta (key, value) VALUES ('schema_version', ?1)",
            params![schema::SCHEMA_VERSION],
        )
        .map_err(StoreError::classify)?;

        let version: String = conn
            .query_row(
                "SELECT value FROM protgraph_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::classify)?;
        if version != schema::SCHEMA_VERSION {
            return Err(StoreError::Migration(format!(
                "store has schema version {version}, expected {}",
                schema::SCHEMA_VERSION
            ))
            .into());
        }
        Ok(())
    }

    /// Scoped access to the connection. The guard releases it on drop,
    /// whichever way the caller exits.
    fn session(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("store connection poisoned".into()))
    }

    /// Helper: read a full entity from a row selected with `ENTITY_COLUMNS`.
    fn row_to_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entity> {
        let domains_json: String = row.get("domains")?;
        Ok(Entity {
            id: row.get("id")?,
            display_name: row.get("display_name")?,
            description: row.get("description")?,
            gene_names: row.get("gene_names")?,
            labels: row.get("labels")?,
            domains: serde_json::from_str::<BTreeSet<String>>(&domains_json).unwrap_or_default(),
        })
    }

    fn row_to_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<SimilarityEdge> {
        Ok(SimilarityEdge {
            source: row.get("source")?,
            target: row.get("target")?,
            weight: row.get("weight")?,
        })
    }

    fn query_entities<P: rusqlite::Params>(
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> Result<Vec<Entity>, StoreError> {
        let mut stmt = conn.prepare_cached(sql).map_err(StoreError::classify)?;
        let rows = stmt
            .query_map(params, Self::row_to_entity)
            .map_err(StoreError::classify)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::classify)
    }

    fn write_entity(conn: &Connection, entity: &Entity, loaded_at: &str) -> Result<(), StoreError> {
        let domains_json = serde_json::to_string(&entity.domains)?;
        conn.prepare_cached(
            "INSERT INTO entities
                (id, display_name, description, gene_names, labels, hidden_labels, domains, loaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                description = excluded.description,
                gene_names = excluded.gene_names,
                labels = excluded.labels,
                hidden_labels = NULL,
                domains = excluded.domains,
                loaded_at = excluded.loaded_at",
        )
        .and_then(|mut stmt| {
            stmt.execute(params![
                entity.id,
                entity.display_name,
                entity.description,
                entity.gene_names,
                entity.labels,
                domains_json,
                loaded_at,
            ])
        })
        .map_err(StoreError::classify)?;
        Ok(())
    }

    fn write_edge(conn: &Connection, edge: &SimilarityEdge) -> Result<(), StoreError> {
        // Callers may hand in either orientation; the table stores source < target.
        let (source, target) = if edge.source <= edge.target {
            (&edge.source, &edge.target)
        } else {
            (&edge.target, &edge.source)
        };
        conn.prepare_cached(
            "INSERT INTO edges (source, target, weight) VALUES (?1, ?2, ?3)
             ON CONFLICT(source, target) DO UPDATE SET weight = excluded.weight",
        )
        .and_then(|mut stmt| stmt.execute(params![source, target, edge.weight]))
        .map_err(StoreError::classify)?;
        Ok(())
    }
}

/// Run `f` in its own transaction. Dropping it uncommitted rolls back.
fn in_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let tx = conn
        .unchecked_transaction()
        .map_err(StoreError::classify)?;
    let out = f(&tx)?;
    tx.commit().map_err(StoreError::classify)?;
    Ok(out)
}

/// `LIMIT` parameter: `-1` is "no limit" in `SQLite`.
fn limit_param(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX))
}

/// The `WHERE` clause for each lookup mode. `?1` is the search term.
fn lookup_clause(mode: MatchMode) -> &'static str {
    match mode {
        MatchMode::ById => "id = ?1",
        MatchMode::ByName => "description = ?1",
        MatchMode::ByKeyword => {
            "instr(lower(id), lower(?1)) > 0
             OR instr(lower(COALESCE(display_name, '')), lower(?1)) > 0
             OR instr(lower(COALESCE(description, '')), lower(?1)) > 0"
        }
    }
}

#[async_trait::async_trait]
impl GraphStore for SqliteStore {
    // ── Entity operations ──────────────────────────────────────────

    async fn upsert_entity(&self, entity: &Entity) -> crate::error::Result<()> {
        let conn = self.session()?;
        Self::write_entity(&conn, entity, &Utc::now().to_rfc3339())?;
        Ok(())
    }

    async fn upsert_entities_batch(&self, entities: &[Entity]) -> crate::error::Result<u64> {
        let conn = self.session()?;
        let loaded_at = Utc::now().to_rfc3339();
        let written = in_transaction(&conn, |tx| {
            for entity in entities {
                Self::write_entity(tx, entity, &loaded_at)?;
            }
            Ok(entities.len() as u64)
        })?;
        Ok(written)
    }

    async fn get_entity(&self, id: &str) -> crate::error::Result<Option<Entity>> {
        let conn = self.session()?;
        let entity = conn
            .query_row(
                &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1"),
                params![id],
                Self::row_to_entity,
            )
            .optional()
            .map_err(StoreError::classify)?;
        Ok(entity)
    }

    async fn find_entities(
        &self,
        lookup: &EntityLookup,
        limit: Option<usize>,
    ) -> crate::error::Result<Vec<Entity>> {
        let conn = self.session()?;
        let sql = format!(
            "SELECT {ENTITY_COLUMNS} FROM entities WHERE {} ORDER BY id LIMIT ?2",
            lookup_clause(lookup.mode)
        );
        let entities = Self::query_entities(&conn, &sql, params![lookup.term, limit_param(limit)])?;
        Ok(entities)
    }

    async fn list_entities(&self, limit: Option<usize>) -> crate::error::Result<Vec<Entity>> {
        let conn = self.session()?;
        let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities ORDER BY id LIMIT ?1");
        Ok(Self::query_entities(&conn, &sql, params![limit_param(limit)])?)
    }

    async fn labeled_entities(&self, limit: usize) -> crate::error::Result<Vec<Entity>> {
        let conn = self.session()?;
        let sql = format!(
            "SELECT {ENTITY_COLUMNS} FROM entities WHERE labels IS NOT NULL ORDER BY id LIMIT ?1"
        );
        Ok(Self::query_entities(
            &conn,
            &sql,
            params![limit_param(Some(limit))],
        )?)
    }

    // ── Edge operations ────────────────────────────────────────────

    async fn upsert_edge(&self, edge: &SimilarityEdge) -> crate::error::Result<()> {
        let conn = self.session()?;
        Self::write_edge(&conn, edge)?;
        Ok(())
    }

    async fn upsert_edges_batch(&self, edges: &[SimilarityEdge]) -> crate::error::Result<u64> {
        let conn = self.session()?;
        let written = in_transaction(&conn, |tx| {
            for edge in edges {
                Self::write_edge(tx, edge)?;
            }
            Ok(edges.len() as u64)
        })?;
        Ok(written)
    }

    async fn clear_edges(&self) -> crate::error::Result<u64> {
        let conn = self.session()?;
        let removed = conn
            .execute("DELETE FROM edges", [])
            .map_err(StoreError::classify)?;
        Ok(removed as u64)
    }

    async fn neighbors(&self, id: &str) -> crate::error::Result<Vec<Neighbor>> {
        let conn = self.session()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT e.id, e.display_name, e.description, e.gene_names, e.labels, e.domains,
                        a.weight
                 FROM adjacency a
                 JOIN entities e ON e.id = a.neighbor_id
                 WHERE a.id = ?1
                 ORDER BY a.weight DESC, e.id",
            )
            .map_err(StoreError::classify)?;
        let rows = stmt
            .query_map(params![id], |row| {
                Ok(Neighbor {
                    entity: Self::row_to_entity(row)?,
                    weight: row.get("weight")?,
                })
            })
            .map_err(StoreError::classify)?;
        Ok(rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::classify)?)
    }

    async fn incident_edges(&self, id: &str) -> crate::error::Result<Vec<SimilarityEdge>> {
        let conn = self.session()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT source, target, weight FROM edges
                 WHERE source = ?1 OR target = ?1
                 ORDER BY source, target",
            )
            .map_err(StoreError::classify)?;
        let rows = stmt
            .query_map(params![id], Self::row_to_edge)
            .map_err(StoreError::classify)?;
        Ok(rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::classify)?)
    }

    async fn edges_touching(&self, ids: &[String]) -> crate::error::Result<Vec<SimilarityEdge>> {
        let conn = self.session()?;
        let mut found: BTreeMap<(String, String), f64> = BTreeMap::new();
        for chunk in ids.chunks(IN_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT source, target, weight FROM edges
                 WHERE source IN ({placeholders}) OR target IN ({placeholders})"
            );
            let mut stmt = conn.prepare(&sql).map_err(StoreError::classify)?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter().chain(chunk)), Self::row_to_edge)
                .map_err(StoreError::classify)?;
            for edge in rows {
                let edge = edge.map_err(StoreError::classify)?;
                found.insert((edge.source, edge.target), edge.weight);
            }
        }
        Ok(found
            .into_iter()
            .map(|((source, target), weight)| SimilarityEdge {
                source,
                target,
                weight,
            })
            .collect())
    }

    async fn list_edges(&self, limit: Option<usize>) -> crate::error::Result<Vec<SimilarityEdge>> {
        let conn = self.session()?;
        let mut stmt = conn
            .prepare_cached("SELECT source, target, weight FROM edges ORDER BY source, target LIMIT ?1")
            .map_err(StoreError::classify)?;
        let rows = stmt
            .query_map(params![limit_param(limit)], Self::row_to_edge)
            .map_err(StoreError::classify)?;
        Ok(rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::classify)?)
    }

    // ── Graph statistics ───────────────────────────────────────────

    async fn degree(&self, id: &str) -> crate::error::Result<Option<u64>> {
        let conn = self.session()?;
        let degree = conn
            .query_row(
                "SELECT degree FROM entity_degree WHERE id = ?1",
                params![id],
                |row| row.get::<_, u64>(0),
            )
            .optional()
            .map_err(StoreError::classify)?;
        Ok(degree)
    }

    async fn degree_distribution(&self) -> crate::error::Result<Vec<DegreeEntry>> {
        let conn = self.session()?;
        let mut stmt = conn
            .prepare_cached("SELECT id, degree FROM entity_degree ORDER BY id")
            .map_err(StoreError::classify)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DegreeEntry {
                    id: row.get(0)?,
                    degree: row.get(1)?,
                })
            })
            .map_err(StoreError::classify)?;
        Ok(rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::classify)?)
    }

    async fn nodes_without_edges(
        &self,
        limit: Option<usize>,
    ) -> crate::error::Result<Vec<Entity>> {
        let conn = self.session()?;
        let sql = format!(
            "SELECT {ENTITY_COLUMNS} FROM entities
             WHERE id NOT IN (SELECT source FROM edges)
               AND id NOT IN (SELECT target FROM edges)
             ORDER BY id LIMIT ?1"
        );
        Ok(Self::query_entities(&conn, &sql, params![limit_param(limit)])?)
    }

    async fn count_isolated(&self) -> crate::error::Result<u64> {
        let conn = self.session()?;
        let count: u64 = conn
            .query_row(
                "SELECT COUNT(*) FROM entities
                 WHERE id NOT IN (SELECT source FROM edges)
                   AND id NOT IN (SELECT target FROM edges)",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::classify)?;
        Ok(count)
    }

    async fn count_by_label_presence(&self) -> crate::error::Result<(u64, u64)> {
        let conn = self.session()?;
        let counts = conn
            .query_row(
                "SELECT COUNT(labels), COUNT(*) - COUNT(labels) FROM entities",
                [],
                |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
            )
            .map_err(StoreError::classify)?;
        Ok(counts)
    }

    // ── Evaluation support ─────────────────────────────────────────

    async fn hide_labels(&self, ids: &[String]) -> crate::error::Result<u64> {
        let conn = self.session()?;
        let hidden = in_transaction(&conn, |tx| {
            let mut stmt = tx
                .prepare_cached(
                    "UPDATE entities SET hidden_labels = labels, labels = NULL
                     WHERE id = ?1 AND labels IS NOT NULL",
                )
                .map_err(StoreError::classify)?;
            let mut hidden = 0u64;
            for id in ids {
                hidden += stmt.execute(params![id]).map_err(StoreError::classify)? as u64;
            }
            Ok(hidden)
        })?;
        Ok(hidden)
    }

    async fn restore_hidden_labels(&self, ids: &[String]) -> crate::error::Result<u64> {
        let conn = self.session()?;
        let restored = in_transaction(&conn, |tx| {
            let mut stmt = tx
                .prepare_cached(
                    "UPDATE entities SET labels = hidden_labels, hidden_labels = NULL
                     WHERE id = ?1 AND hidden_labels IS NOT NULL",
                )
                .map_err(StoreError::classify)?;
            let mut restored = 0u64;
            for id in ids {
                restored += stmt.execute(params![id]).map_err(StoreError::classify)? as u64;
            }
            Ok(restored)
        })?;
        Ok(restored)
    }

    // ── Predictions ────────────────────────────────────────────────

    async fn replace_predictions(
        &self,
        entity_id: &str,
        votes: &[LabelVote],
    ) -> crate::error::Result<()> {
        let conn = self.session()?;
        let predicted_at = Utc::now().to_rfc3339();
        in_transaction(&conn, |tx| {
            tx.execute(
                "DELETE FROM predictions WHERE entity_id = ?1",
                params![entity_id],
            )
            .map_err(StoreError::classify)?;
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO predictions (entity_id, rank, label, weight, predicted_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(StoreError::classify)?;
            for (rank, vote) in (1i64..).zip(votes) {
                stmt.execute(params![entity_id, rank, vote.label, vote.weight, predicted_at])
                    .map_err(StoreError::classify)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    async fn predictions(
        &self,
        label_prefix: Option<&str>,
        limit: Option<usize>,
    ) -> crate::error::Result<Vec<LabelPrediction>> {
        let conn = self.session()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT entity_id, rank, label, weight FROM predictions
                 WHERE ?1 IS NULL OR substr(label, 1, length(?1)) = ?1
                 ORDER BY entity_id, rank
                 LIMIT ?2",
            )
            .map_err(StoreError::classify)?;
        let rows = stmt
            .query_map(params![label_prefix, limit_param(limit)], |row| {
                Ok(LabelPrediction {
                    entity_id: row.get(0)?,
                    rank: row.get(1)?,
                    label: row.get(2)?,
                    weight: row.get(3)?,
                })
            })
            .map_err(StoreError::classify)?;
        Ok(rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::classify)?)
    }

    // ── Graph replacement ─────────────────────────────────────────

    async fn replace_graph(
        &self,
        entities: &[Entity],
        edges: &[SimilarityEdge],
        clear_edges: bool,
    ) -> crate::error::Result<GraphWrite> {
        // One session for the whole write: nothing else can join the transaction.
        let conn = self.session()?;
        let loaded_at = Utc::now().to_rfc3339();
        let written = in_transaction(&conn, |tx| {
            let edges_removed = if clear_edges {
                tx.execute("DELETE FROM edges", [])
                    .map_err(StoreError::classify)? as u64
            } else {
                0
            };
            for entity in entities {
                Self::write_entity(tx, entity, &loaded_at)?;
            }
            for edge in edges {
                Self::write_edge(tx, edge)?;
            }
            Ok(GraphWrite {
                edges_removed,
                entities_written: entities.len() as u64,
                edges_written: edges.len() as u64,
            })
        })?;
        Ok(written)
    }

    // ── Metrics ────────────────────────────────────────────────────

    async fn stats(&self) -> crate::error::Result<StoreStats> {
        let conn = self.session()?;
        let count = |sql: &str| -> Result<u64, StoreError> {
            conn.query_row(sql, [], |row| row.get(0))
                .map_err(StoreError::classify)
        };

        let total_entities = count("SELECT COUNT(*) FROM entities")?;
        let total_edges = count("SELECT COUNT(*) FROM edges")?;
        let labeled = count("SELECT COUNT(labels) FROM entities")?;
        let isolated = count(
            "SELECT COUNT(*) FROM entities
             WHERE id NOT IN (SELECT source FROM edges)
               AND id NOT IN (SELECT target FROM edges)",
        )?;
        let predictions = count("SELECT COUNT(DISTINCT entity_id) FROM predictions")?;

        let db_size_bytes = self
            .db_path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map_or(0, |m| m.len());

        Ok(StoreStats {
            total_entities,
            total_edges,
            labeled,
            unlabeled: total_entities - labeled,
            isolated,
            predictions,
            db_size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entity(id: &str, domains: &[&str], labels: Option<&str>) -> Entity {
        Entity {
            id: id.to_string(),
            display_name: Some(format!("{id}_HUMAN")),
            description: Some(format!("Protein {id}")),
            gene_names: Some(format!("G{id}")),
            labels: labels.map(str::to_string),
            domains: domains.iter().map(|d| (*d).to_string()).collect(),
        }
    }

    fn edge(a: &str, b: &str, weight: f64) -> SimilarityEdge {
        SimilarityEdge::new(a, b, weight).unwrap()
    }

    async fn seeded_store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_entities_batch(&[
                make_entity("P1", &["A", "B"], Some("1.1.1.1")),
                make_entity("P2", &["A", "B", "C"], Some("1.1.1.1;2.2.2.2")),
                make_entity("P3", &["C"], None),
                make_entity("P4", &["Z"], None),
            ])
            .await
            .unwrap();
        store
            .upsert_edges_batch(&[edge("P1", "P2", 2.0 / 3.0), edge("P2", "P3", 1.0 / 3.0)])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn upsert_and_get_entity() {
        let store = SqliteStore::in_memory().unwrap();
        let entity = make_entity("P1", &["IPR1", "IPR2"], Some("2.7.11.1"));
        store.upsert_entity(&entity).await.unwrap();

        let fetched = store.get_entity("P1").await.unwrap().unwrap();
        assert_eq!(fetched, entity);
        assert!(store.get_entity("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entity_upsert_is_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        let mut entity = make_entity("P1", &["IPR1"], None);
        store.upsert_entity(&entity).await.unwrap();
        entity.labels = Some("3.1.1.1".into());
        store.upsert_entity(&entity).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_entities, 1);
        let fetched = store.get_entity("P1").await.unwrap().unwrap();
        assert_eq!(fetched.labels.as_deref(), Some("3.1.1.1"));
    }

    #[tokio::test]
    async fn edge_upsert_is_keyed_by_unordered_pair() {
        let store = seeded_store().await;
        // Reverse orientation, new weight: same pair
        store
            .upsert_edge(&SimilarityEdge {
                source: "P2".into(),
                target: "P1".into(),
                weight: 0.9,
            })
            .await
            .unwrap();
        let edges = store.incident_edges("P1").await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].key(), ("P1", "P2"));
        assert!((edges[0].weight - 0.9).abs() < 1e-12);
        assert_eq!(store.stats().await.unwrap().total_edges, 2);
    }

    #[tokio::test]
    async fn neighbors_are_undirected_and_sorted_by_weight() {
        let store = seeded_store().await;
        let neighbors = store.neighbors("P2").await.unwrap();
        let ids: Vec<_> = neighbors.iter().map(|n| n.entity.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P3"]);
        assert_eq!(neighbors[0].entity.labels.as_deref(), Some("1.1.1.1"));

        let neighbors = store.neighbors("P3").await.unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].entity.id, "P2");
        assert!(store.neighbors("P4").await.unwrap().is_empty());
        assert!(store.neighbors("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn degree_and_isolation() {
        let store = seeded_store().await;
        assert_eq!(store.degree("P2").await.unwrap(), Some(2));
        assert_eq!(store.degree("P4").await.unwrap(), Some(0));
        assert_eq!(store.degree("missing").await.unwrap(), None);

        let isolated = store.nodes_without_edges(None).await.unwrap();
        assert_eq!(isolated.len(), 1);
        assert_eq!(isolated[0].id, "P4");
        assert_eq!(store.count_isolated().await.unwrap(), 1);

        let distribution = store.degree_distribution().await.unwrap();
        let degrees: Vec<_> = distribution.iter().map(|d| d.degree).collect();
        assert_eq!(degrees, vec![1, 2, 1, 0]);
    }

    #[tokio::test]
    async fn label_presence_counts() {
        let store = seeded_store().await;
        assert_eq!(store.count_by_label_presence().await.unwrap(), (2, 2));
    }

    #[tokio::test]
    async fn lookup_modes() {
        let store = seeded_store().await;

        let by_id = store
            .find_entities(&EntityLookup::by_id("P2"), None)
            .await
            .unwrap();
        assert_eq!(by_id.len(), 1);

        let by_name = store
            .find_entities(&EntityLookup::by_name("Protein P3"), None)
            .await
            .unwrap();
        assert_eq!(by_name[0].id, "P3");
        let partial_name = store
            .find_entities(&EntityLookup::by_name("Protein"), None)
            .await
            .unwrap();
        assert!(partial_name.is_empty());

        let keyword = store
            .find_entities(&EntityLookup::by_keyword("protein"), Some(3))
            .await
            .unwrap();
        let ids: Vec<_> = keyword.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P2", "P3"]);

        let keyword = store
            .find_entities(&EntityLookup::by_keyword("p4_human"), None)
            .await
            .unwrap();
        assert_eq!(keyword[0].id, "P4");
    }

    #[tokio::test]
    async fn keyword_lookup_folds_ascii_case_only() {
        let store = SqliteStore::in_memory().unwrap();
        let mut entity = make_entity("P01234", &["A"], None);
        entity.description = Some("Ω-conotoxin-like".into());
        store.upsert_entity(&entity).await.unwrap();

        for (term, hit) in [("Ω-CONOTOXIN", true), ("ω-CONOTOXIN", false)] {
            let lookup = EntityLookup::by_keyword(term);
            let found = store.find_entities(&lookup, None).await.unwrap();
            assert_eq!(found.len() == 1, hit, "term {term}");
            assert_eq!(lookup.matches(&entity), hit, "term {term}");
        }
    }

    #[tokio::test]
    async fn keyword_lookup_treats_wildcards_literally() {
        let store = seeded_store().await;
        let hits = store
            .find_entities(&EntityLookup::by_keyword("%"), None)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn hide_and_restore_labels() {
        let store = seeded_store().await;
        let hidden = store
            .hide_labels(&["P1".to_string(), "P3".to_string()])
            .await
            .unwrap();
        // P3 has no label to hide
        assert_eq!(hidden, 1);
        assert!(store.get_entity("P1").await.unwrap().unwrap().labels.is_none());
        assert_eq!(store.count_by_label_presence().await.unwrap(), (1, 3));

        let ids = ["P1".to_string(), "P3".to_string()];
        let restored = store.restore_hidden_labels(&ids).await.unwrap();
        assert_eq!(restored, 1);
        assert_eq!(
            store.get_entity("P1").await.unwrap().unwrap().labels.as_deref(),
            Some("1.1.1.1")
        );
        assert_eq!(store.restore_hidden_labels(&ids).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn restore_only_touches_listed_ids() {
        let store = seeded_store().await;
        store
            .hide_labels(&["P1".to_string(), "P2".to_string()])
            .await
            .unwrap();
        let restored = store
            .restore_hidden_labels(&["P2".to_string()])
            .await
            .unwrap();
        assert_eq!(restored, 1);
        assert!(store.get_entity("P1").await.unwrap().unwrap().labels.is_none());
        assert!(store.get_entity("P2").await.unwrap().unwrap().labels.is_some());
    }

    #[tokio::test]
    async fn predictions_replace_and_filter_by_prefix() {
        let store = seeded_store().await;
        let votes = [
            LabelVote {
                label: "1.1.1.1".into(),
                weight: 0.8,
            },
            LabelVote {
                label: "2.2.2.2".into(),
                weight: 0.5,
            },
        ];
        store.replace_predictions("P3", &votes).await.unwrap();
        store.replace_predictions("P3", &votes[..1]).await.unwrap();
        store.replace_predictions("P4", &votes[1..]).await.unwrap();

        let all = store.predictions(None, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].entity_id, "P3");
        assert_eq!(all[0].rank, 1);

        let level_two = store.predictions(Some("2."), None).await.unwrap();
        assert_eq!(level_two.len(), 1);
        assert_eq!(level_two[0].entity_id, "P4");
        assert_eq!(store.stats().await.unwrap().predictions, 2);
    }

    #[tokio::test]
    async fn edges_touching_reports_each_edge_once() {
        let store = seeded_store().await;
        let edges = store
            .edges_touching(&["P1".to_string(), "P3".to_string()])
            .await
            .unwrap();
        let keys: Vec<_> = edges.iter().map(|e| (e.source.clone(), e.target.clone())).collect();
        assert_eq!(
            keys,
            vec![
                ("P1".to_string(), "P2".to_string()),
                ("P2".to_string(), "P3".to_string())
            ]
        );
        assert!(store.edges_touching(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_edges_keeps_entities() {
        let store = seeded_store().await;
        assert_eq!(store.clear_edges().await.unwrap(), 2);
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_edges, 0);
        assert_eq!(stats.total_entities, 4);
        assert_eq!(stats.isolated, 4);
    }

    #[tokio::test]
    async fn replace_graph_writes_everything() {
        let store = seeded_store().await;
        let written = store
            .replace_graph(
                &[make_entity("P5", &["A"], None)],
                &[edge("P1", "P5", 1.0)],
                true,
            )
            .await
            .unwrap();
        assert_eq!(
            written,
            GraphWrite {
                edges_removed: 2,
                entities_written: 1,
                edges_written: 1,
            }
        );
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_entities, 5);
        assert_eq!(stats.total_edges, 1);
    }

    #[tokio::test]
    async fn failed_replace_graph_changes_nothing() {
        let store = seeded_store().await;
        let before = store.list_edges(None).await.unwrap();
        // The edge's endpoint does not exist, so the write fails after the clear.
        let err = store
            .replace_graph(
                &[make_entity("P5", &["A"], None)],
                &[edge("P5", "X9", 1.0)],
                true,
            )
            .await
            .unwrap_err();
        assert!(!err.is_store_unavailable());
        assert!(store.get_entity("P5").await.unwrap().is_none());
        assert_eq!(store.list_edges(None).await.unwrap(), before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_survive_a_failed_replace() {
        let store = std::sync::Arc::new(seeded_store().await);
        let mut tasks = Vec::new();
        for i in 0..8 {
            let store = std::sync::Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                let bulk: Vec<Entity> = (0..50)
                    .map(|j| make_entity(&format!("B{i}_{j:02}"), &["A"], None))
                    .collect();
                let failed = store
                    .replace_graph(&bulk, &[edge("B0_00", "X9", 1.0)], true)
                    .await;
                assert!(failed.is_err());
                store
                    .upsert_entity(&make_entity(&format!("W{i}"), &["A"], None))
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        for i in 0..8 {
            assert!(store.get_entity(&format!("W{i}")).await.unwrap().is_some());
        }
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_entities, 12);
        assert_eq!(stats.total_edges, 2);
    }

    #[tokio::test]
    async fn edge_to_unknown_entity_is_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store.upsert_edge(&edge("X1", "X2", 0.5)).await.unwrap_err();
        assert!(!err.is_store_unavailable());
    }

    #[test]
    fn missing_database_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = SqliteStore::open_existing(&dir.path().join("absent.db")).unwrap_err();
        assert!(err.is_store_unavailable());
    }

    #[test]
    fn garbage_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-db.db");
        std::fs::write(&path, "not an sqlite database\n".repeat(256)).unwrap();
        let err = SqliteStore::open_existing(&path).unwrap_err();
        assert!(err.is_store_unavailable(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn reopen_existing_store_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .upsert_entity(&make_entity("P1", &["A"], None))
                .await
                .unwrap();
        }
        let store = SqliteStore::open_existing(&path).unwrap();
        assert!(store.get_entity("P1").await.unwrap().is_some());
        assert!(store.stats().await.unwrap().db_size_bytes > 0);
    }
}
