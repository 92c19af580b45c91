use anyhow::Context;
use clap::{Args, ValueEnum};

use protgraph_core::query;
use protgraph_core::types::{EntityLookup, MatchMode};

use super::GlobalOpts;

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SearchBy {
    /// Exact accession
    Id,
    /// Exact protein names text
    Name,
    /// Case-insensitive substring of accession, entry name or protein names
    Keyword,
}

impl From<SearchBy> for MatchMode {
    fn from(by: SearchBy) -> Self {
        match by {
            SearchBy::Id => Self::ById,
            SearchBy::Name => Self::ByName,
            SearchBy::Keyword => Self::ByKeyword,
        }
    }
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search term
    pub term: String,

    /// How the term is matched
    #[arg(long, value_enum, default_value_t = SearchBy::Keyword)]
    pub by: SearchBy,

    /// Maximum number of results
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: SearchArgs, opts: &GlobalOpts) -> anyhow::Result<()> {
    let config = super::load_config(opts)?;
    let store = super::open_store(&super::resolve_db_path(opts, &config))?;

    let lookup = EntityLookup {
        mode: args.by.into(),
        term: args.term,
    };
    let hits = query::lookup(&store, &lookup, Some(args.limit))
        .await
        .context("Search failed")?;

    if args.json {
        return super::print_json(&hits);
    }

    if hits.is_empty() {
        println!("No protein found matching {} '{}'", lookup.mode, lookup.term);
        return Ok(());
    }
    for entity in &hits {
        println!(
            "{:<12} {:<16} {}",
            entity.id,
            entity.shown_name(),
            entity.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
