/// Current schema version.
pub const SCHEMA_VERSION: &str = "1";

/// Full SQL schema for the protgraph `SQLite` database.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS protgraph_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per protein, keyed by accession
CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    display_name TEXT,
    description TEXT,
    gene_names TEXT,
    labels TEXT,
    -- Parking slot for labels hidden during evaluation
    hidden_labels TEXT,
    domains TEXT NOT NULL DEFAULT '[]',
    loaded_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_entities_description ON entities(description);
CREATE INDEX IF NOT EXISTS idx_entities_labels ON entities(labels);

-- Undirected similarity edges, stored once per unordered pair
CREATE TABLE IF NOT EXISTS edges (
    source TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    target TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    weight REAL NOT NULL,
    PRIMARY KEY (source, target),
    CHECK (source < target)
);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target);

-- Ranked label predictions produced by propagation
CREATE TABLE IF NOT EXISTS predictions (
    entity_id TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    rank INTEGER NOT NULL,
    label TEXT NOT NULL,
    weight REAL NOT NULL,
    predicted_at TEXT NOT NULL,
    PRIMARY KEY (entity_id, rank)
);
CREATE INDEX IF NOT EXISTS idx_predictions_label ON predictions(label);
";

/// Projected views for common query patterns.
pub const VIEWS_SQL: &str = r"
-- Both orientations of every edge, for neighbor lookups
CREATE VIEW IF NOT EXISTS adjacency AS
SELECT source AS id, target AS neighbor_id, weight FROM edges
UNION ALL
SELECT target AS id, source AS neighbor_id, weight FROM edges;

-- Degree of every entity, zero for isolated ones
CREATE VIEW IF NOT EXISTS entity_degree AS
SELECT
    e.id AS id,
    (SELECT COUNT(*) FROM adjacency a WHERE a.id = e.id) AS degree
FROM entities e;
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_executes_on_in_memory_sqlite() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute_batch(VIEWS_SQL).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert!(tables.contains(&"entities".to_string()));
        assert!(tables.contains(&"edges".to_string()));
        assert!(tables.contains(&"predictions".to_string()));
        assert!(tables.contains(&"protgraph_meta".to_string()));
    }

    #[test]
    fn edge_orientation_is_enforced() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute_batch(
            "INSERT INTO entities (id, loaded_at) VALUES ('A', 'now'), ('B', 'now');",
        )
        .unwrap();
        assert!(
            conn.execute(
                "INSERT INTO edges (source, target, weight) VALUES ('B', 'A', 0.5)",
                [],
            )
            .is_err()
        );
        assert!(
            conn.execute(
                "INSERT INTO edges (source, target, weight) VALUES ('A', 'B', 0.5)",
                [],
            )
            .is_ok()
        );
    }

    #[test]
    fn schema_is_reentrant() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute_batch(VIEWS_SQL).unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute_batch(VIEWS_SQL).unwrap();
    }
}
