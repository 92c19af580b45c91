//! protgraph core library: protein similarity graphs and label propagation.
//!
//! [`pipeline::load_and_persist`] reads a protein table, builds the Jaccard
//! similarity graph over `InterPro` domain sets and writes it to a
//! [`store::GraphStore`]. [`annotate`] predicts EC numbers from neighbors and
//! measures how well that works; [`query`] serves lookups and statistics.

pub mod annotate;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod query;
pub mod similarity;
pub mod store;
pub mod types;
