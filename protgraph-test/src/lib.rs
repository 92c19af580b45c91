// Integration test utilities and fixture tables for protgraph.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use protgraph_core::config::ProtGraphConfig;
use protgraph_core::pipeline::{PipelineReport, load_and_persist};
use protgraph_core::progress::NoopReporter;
use protgraph_core::store::sqlite::SqliteStore;

/// Header row of the exported protein table.
pub const HEADER: &str = "Entry\tEntry Name\tProtein names\tGene Names\tEC number\tInterPro";

/// One row of a fixture table. Empty strings become empty cells.
#[derive(Debug, Clone, Default)]
pub struct FixtureRow {
    pub entry: String,
    pub entry_name: String,
    pub protein_names: String,
    pub gene_names: String,
    pub ec_number: String,
    pub interpro: Vec<String>,
}

impl FixtureRow {
    pub fn new(entry: &str, ec_number: &str, interpro: &[&str]) -> Self {
        Self {
            entry: entry.to_string(),
            entry_name: format!("{entry}_HUMAN"),
            protein_names: format!("Protein {entry}"),
            gene_names: format!("G{entry}"),
            ec_number: ec_number.to_string(),
            interpro: interpro.iter().map(|d| (*d).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn named(mut self, protein_names: &str) -> Self {
        self.protein_names = protein_names.to_string();
        self
    }

    fn to_line(&self) -> String {
        // Exported tables end the InterPro list with a separator
        let interpro = if self.interpro.is_empty() {
            String::new()
        } else {
            format!("{};", self.interpro.join(";"))
        };
        [
            self.entry.as_str(),
            &self.entry_name,
            &self.protein_names,
            &self.gene_names,
            &self.ec_number,
            &interpro,
        ]
        .join("\t")
    }
}

/// A protein table written to a temporary directory.
#[derive(Debug)]
pub struct FixtureTable {
    pub dir: tempfile::TempDir,
    pub rows: Vec<FixtureRow>,
}

impl FixtureTable {
    pub fn from_rows(rows: Vec<FixtureRow>) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let mut text = String::from(HEADER);
        text.push('\n');
        for row in &rows {
            let _ = writeln!(text, "{}", row.to_line());
        }
        std::fs::write(dir.path().join("proteins.tsv"), text).expect("write fixture table");
        Self { dir, rows }
    }

    /// Write raw table text verbatim.
    pub fn raw(text: &str) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        std::fs::write(dir.path().join("proteins.tsv"), text).expect("write fixture table");
        Self {
            dir,
            rows: Vec::new(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("proteins.tsv")
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("protgraph.db")
    }

    /// P1={A,B,C}, P2={B,C,D}, P3={X,Y}. At threshold 0.3 only P1–P2 (0.5) links.
    pub fn three_proteins() -> Self {
        Self::from_rows(vec![
            FixtureRow::new("P1", "1.1.1.1", &["A", "B", "C"]),
            FixtureRow::new("P2", "", &["B", "C", "D"]),
            FixtureRow::new("P3", "", &["X", "Y"]),
        ])
    }

    /// Two enzyme families plus noise.
    ///
    /// Kinases (K1..K4) share IPR000719, ligases (L1..L3) share IPR012308.
    /// K4 and L3 are unlabeled; U1 has no domains and is dropped; Z1 shares
    /// nothing with anyone.
    pub fn enzyme_families() -> Self {
        Self::from_rows(vec![
            FixtureRow::new("K1", "2.7.11.1", &["IPR000719", "IPR008271", "IPR017441"])
                .named("Serine/threonine-protein kinase 1"),
            FixtureRow::new("K2", "2.7.11.1", &["IPR000719", "IPR008271", "IPR011009"])
                .named("Serine/threonine-protein kinase 2"),
            FixtureRow::new("K3", "2.7.11.1;2.7.10.2", &["IPR000719", "IPR017441"])
                .named("Dual specificity kinase"),
            FixtureRow::new("K4", "", &["IPR000719", "IPR008271", "IPR017441"])
                .named("Putative kinase"),
            FixtureRow::new("L1", "6.5.1.1", &["IPR012308", "IPR012309", "IPR016059"])
                .named("DNA ligase 1"),
            FixtureRow::new("L2", "6.5.1.1", &["IPR012308", "IPR012309"]).named("DNA ligase 3"),
            FixtureRow::new("L3", "", &["IPR012308", "IPR016059"]).named("DNA ligase-like"),
            FixtureRow::new("U1", "3.1.1.1", &[]).named("Uncharacterized protein"),
            FixtureRow::new("Z1", "", &["IPR999999"]).named("Orphan protein"),
        ])
    }
}

/// Open a file-backed store next to the table and load it.
pub async fn load_fixture(
    table: &FixtureTable,
    config: &ProtGraphConfig,
) -> anyhow::Result<(SqliteStore, PipelineReport)> {
    let store = SqliteStore::open(&table.db_path())?;
    let report = load_and_persist(&table.path(), config, &store, &NoopReporter).await?;
    Ok((store, report))
}

/// Load into an in-memory store.
pub async fn load_in_memory(
    path: &Path,
    config: &ProtGraphConfig,
) -> anyhow::Result<(SqliteStore, PipelineReport)> {
    let store = SqliteStore::in_memory()?;
    let report = load_and_persist(path, config, &store, &NoopReporter).await?;
    Ok((store, report))
}
