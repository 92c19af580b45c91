// Benchmark SQLite store operations: bulk load, neighbor reads, degree stats.

use std::collections::BTreeSet;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use protgraph_core::store::GraphStore;
use protgraph_core::store::sqlite::SqliteStore;
use protgraph_core::types::{Entity, SimilarityEdge};

fn entity(i: usize) -> Entity {
    Entity {
        id: format!("P{i:06}"),
        display_name: Some(format!("PROT{i}_HUMAN")),
        description: Some(format!("Synthetic protein {i}")),
        gene_names: None,
        labels: (i % 3 == 0).then(|| format!("{}.1.1.{}", i % 6 + 1, i % 40)),
        domains: BTreeSet::from([format!("IPR{:06}", i % 97), format!("IPR{:06}", i % 31)]),
    }
}

/// Ring with chords: every node links to its next three ordinals.
fn edges(count: usize) -> Vec<SimilarityEdge> {
    (0..count)
        .flat_map(|i| {
            (1..=3).filter_map(move |step| {
                let j = (i + step) % count;
                SimilarityEdge::new(&format!("P{i:06}"), &format!("P{j:06}"), 0.5)
            })
        })
        .collect()
}

fn bench_bulk_load(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("store_bulk_load");
    group.sample_size(10);

    for count in [1_000, 5_000] {
        let entities: Vec<Entity> = (0..count).map(entity).collect();
        let edges = edges(count);
        group.bench_with_input(BenchmarkId::new("count", count), &count, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let store = SqliteStore::in_memory().unwrap();
                    store.upsert_entities_batch(&entities).await.unwrap();
                    store.upsert_edges_batch(&edges).await.unwrap();
                });
            });
        });
    }
    group.finish();
}

fn bench_reads(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let count = 5_000;
    let store = rt.block_on(async {
        let store = SqliteStore::in_memory().unwrap();
        let entities: Vec<Entity> = (0..count).map(entity).collect();
        store.upsert_entities_batch(&entities).await.unwrap();
        store.upsert_edges_batch(&edges(count)).await.unwrap();
        store
    });

    c.bench_function("store_neighbors", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let id = format!("P{:06}", i % count);
            i += 1;
            rt.block_on(store.neighbors(&id)).unwrap()
        });
    });

    c.bench_function("store_degree_distribution", |b| {
        b.iter(|| rt.block_on(store.degree_distribution()).unwrap());
    });
}

criterion_group!(benches, bench_bulk_load, bench_reads);
criterion_main!(benches);
