//! Record normalizer: turns raw table rows into [`Entity`] values.
//!
//! Rows without domains cannot take part in similarity comparison and are
//! dropped here. The label field is kept raw because the annotator splits it
//! itself.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::NormalizeError;
use crate::types::{Entity, FIELD_SEPARATOR};

/// Column names of the UniProt TSV export.
pub mod columns {
    pub const ENTRY: &str = "Entry";
    pub const ENTRY_NAME: &str = "Entry Name";
    pub const PROTEIN_NAMES: &str = "Protein names";
    pub const GENE_NAMES: &str = "Gene Names";
    pub const EC_NUMBER: &str = "EC number";
    pub const INTERPRO: &str = "InterPro";

    pub const REQUIRED: [&str; 6] = [
        ENTRY,
        ENTRY_NAME,
        PROTEIN_NAMES,
        GENE_NAMES,
        EC_NUMBER,
        INTERPRO,
    ];
}

/// A raw row before normalization. `None` means the cell was empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub gene_names: Option<String>,
    pub labels: Option<String>,
    pub domains: Option<String>,
}

/// Parse a `;`-joined domain field into a set. Empty tokens are discarded.
pub fn parse_domains(field: &str) -> BTreeSet<String> {
    field
        .trim()
        .trim_end_matches(FIELD_SEPARATOR)
        .split(FIELD_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize raw records, preserving input order.
///
/// Records with a missing id or an empty domain set are dropped, as are
/// repeated ids (first occurrence wins). `limit` keeps the first N survivors.
pub fn normalize<I>(records: I, limit: Option<usize>) -> Vec<Entity>
where
    I: IntoIterator<Item = RawRecord>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    let mut dropped_no_domains = 0usize;

    for raw in records {
        if limit.is_some_and(|n| out.len() >= n) {
            break;
        }
        let Some(id) = raw.id else {
            debug!("Skipping record without an id");
            continue;
        };
        let domains = raw.domains.as_deref().map(parse_domains).unwrap_or_default();
        if domains.is_empty() {
            dropped_no_domains += 1;
            continue;
        }
        if !seen.insert(id.clone()) {
            warn!(id = %id, "Duplicate entry id, keeping the first occurrence");
            continue;
        }
        out.push(Entity {
            id,
            display_name: raw.display_name,
            description: raw.description,
            gene_names: raw.gene_names,
            labels: raw.labels,
            domains,
        });
    }

    debug!(
        kept = out.len(),
        dropped_no_domains, "Normalized records"
    );
    out
}

/// Read a tab-separated table whose first line is the header.
pub fn read_tsv<R: BufRead>(reader: R) -> Result<Vec<RawRecord>, NormalizeError> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(NormalizeError::EmptyHeader),
    };
    let header = header.trim_end_matches(['\r', '\n']);
    if header.trim().is_empty() {
        return Err(NormalizeError::EmptyHeader);
    }

    let positions: HashMap<&str, usize> = header
        .split('\t')
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();
    let column = |name: &str| {
        positions
            .get(name)
            .copied()
            .ok_or_else(|| NormalizeError::MissingColumn(name.to_string()))
    };
    let layout = ColumnLayout {
        id: column(columns::ENTRY)?,
        display_name: column(columns::ENTRY_NAME)?,
        description: column(columns::PROTEIN_NAMES)?,
        gene_names: column(columns::GENE_NAMES)?,
        labels: column(columns::EC_NUMBER)?,
        domains: column(columns::INTERPRO)?,
    };

    let mut records = Vec::new();
    for line in lines {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split('\t').collect();
        records.push(layout.record(&cells));
    }
    Ok(records)
}

/// Read and normalize a TSV file in one step.
pub fn load_table(path: &Path, limit: Option<usize>) -> Result<(usize, Vec<Entity>), NormalizeError> {
    let file = std::fs::File::open(path)?;
    let raw = read_tsv(std::io::BufReader::new(file))?;
    let raw_count = raw.len();
    let entities = normalize(raw, limit);
    info!(
        path = %path.display(),
        raw = raw_count,
        normalized = entities.len(),
        "Loaded input table"
    );
    Ok((raw_count, entities))
}

#[derive(Debug)]
struct ColumnLayout {
    id: usize,
    display_name: usize,
    description: usize,
    gene_names: usize,
    labels: usize,
    domains: usize,
}

impl ColumnLayout {
    fn record(&self, cells: &[&str]) -> RawRecord {
        let cell = |i: usize| cells.get(i).and_then(|c| clean_cell(c));
        RawRecord {
            id: cell(self.id),
            display_name: cell(self.display_name),
            description: cell(self.description),
            gene_names: cell(self.gene_names),
            labels: cell(self.labels),
            domains: cell(self.domains),
        }
    }
}

/// Empty cells and the literal `NaN` are absent values.
fn clean_cell(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed == "NaN" {
        None
    } else {
        Some(trimmed.to_string())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_domain_field() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            Just(Some(";".to_string())),
            "(IPR[0-9]{3};){0,4}".prop_map(Some),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// No normalized entity ever has an empty domain set.
        #[test]
        fn normalized_entities_always_have_domains(
            fields in proptest::collection::vec(arb_domain_field(), 0..40),
        ) {
            let records = fields.into_iter().enumerate().map(|(i, domains)| RawRecord {
                id: Some(format!("P{i}")),
                domains,
                ..Default::default()
            });
            for entity in normalize(records, None) {
                prop_assert!(!entity.domains.is_empty());
            }
        }
    }
}
