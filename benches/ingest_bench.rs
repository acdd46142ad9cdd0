//! Ingestion pipeline benchmarks: parse, derive level, store.
//!
//! Compares inline parsing against chunked parallel parsing for the same
//! batch.
//!
//! # Viewing results
//!
//! ```sh
//! cargo bench --bench ingest_bench
//! ```

use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use logmill_core::clock::FixedClock;
use logmill_core::config::Config;
use logmill_core::ingest::Ingestor;
use logmill_core::store::MemoryStore;
use logmill_core::Id;
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

fn batch(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!(r#"{{"level":"info","i":{i},"user":{{"id":{i}}},"msg":"request served"}}"#))
        .collect()
}

fn ingest_bench(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("ingest_lines");
    let lines = batch(5_000);
    let app_id = Id::new().to_string();
    let cancel = CancellationToken::new();

    group.throughput(Throughput::Elements(lines.len() as u64));
    for chunk in [usize::MAX, 512, 128] {
        let mut config = Config::defaults().ingest;
        config.parallel_chunk_size = chunk;
        let label = if chunk == usize::MAX { "inline".to_string() } else { chunk.to_string() };

        group.bench_with_input(BenchmarkId::new("chunk", label), &config, |b, config| {
            b.to_async(&rt).iter(|| async {
                let ingestor = Ingestor::new(
                    Arc::new(MemoryStore::new()),
                    Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())),
                    config.clone(),
                );
                black_box(
                    ingestor
                        .ingest_lines(&app_id, lines.clone(), None, &cancel)
                        .await
                        .unwrap(),
                )
            })
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Criterion registration
// ---------------------------------------------------------------------------

criterion_group!(ingest_benches, ingest_bench);
criterion_main!(ingest_benches);
