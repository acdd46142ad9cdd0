#![allow(unused)]
//! Ingestion integration harness.
//!
//! # What this covers
//!
//! - **Best-effort batches**: malformed lines are stored with their raw text
//!   and no data; the rest of the batch is unaffected.
//! - **Order**: stored order equals input order, including for batches
//!   parsed in parallel chunks (proptest over sizes and chunk widths).
//! - **Ingest time** comes from the injected clock.
//! - **Pre-structured documents** bypass the parser.
//! - **Batch atomicity**: a store failure stores nothing and surfaces as
//!   `Infrastructure`.
//!
//! # Running
//!
//! ```sh
//! cargo test --test ingest_harness
//! ```

mod common;
use common::*;

use logmill_core::clock::FixedClock;
use logmill_core::config::Config;
use logmill_core::ingest::{IngestAck, Ingestor};
use logmill_core::normalizer::LogFormat;
use logmill_core::store::MemoryStore;
use logmill_core::{AttributeTree, Error};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn malformed_json_is_stored_raw_with_no_data() {
    let seeded = Seeded::new(&["api"]).await;
    let app = seeded.app("api").id.to_string();
    let lines: Vec<String> = MALFORMED_JSON.iter().map(|l| l.to_string()).collect();

    let ack = seeded
        .ingestor_at(day(2024, 3, 1))
        .ingest_lines(&app, lines.clone(), Some(LogFormat::Json), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ack, IngestAck { stored: 4, parse_failures: 4 });
    let stored = seeded.store.snapshot().await;
    for (log, line) in stored.iter().zip(&lines) {
        assert_eq!(&log.raw, line);
        assert!(log.data.is_none());
        assert_eq!(log.level, "");
    }
}

#[tokio::test]
async fn one_bad_line_does_not_block_the_batch() {
    let seeded = Seeded::new(&["api"]).await;
    let mut lines: Vec<String> = CORPUS_JSON.iter().map(|l| l.to_string()).collect();
    lines.insert(2, "{oops".to_string());

    let ack = seeded
        .ingestor_at(day(2024, 3, 1))
        .ingest_lines(&seeded.app("api").id.to_string(), lines, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ack.stored, CORPUS_JSON.len() + 1);
    assert_eq!(ack.parse_failures, 1);
    let levels: Vec<String> = seeded.store.snapshot().await.into_iter().map(|l| l.level).collect();
    assert_eq!(levels, vec!["INFO", "ERROR", "", "WARNING", "INFO", "ERROR"]);
}

#[tokio::test]
async fn ingest_time_comes_from_the_clock() {
    let seeded = Seeded::new(&["web"]).await;
    seeded
        .ingestor_at(day(2030, 6, 1))
        .ingest_lines(
            &seeded.app("web").id.to_string(),
            CORPUS_APACHE.iter().map(|l| l.to_string()).collect(),
            Some(LogFormat::ApacheCommonLog),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let stored = seeded.store.snapshot().await;
    assert!(stored.iter().all(|l| l.timestamp == day(2030, 6, 1)));
    // The line's own time is kept in data, not promoted.
    assert_eq!(
        stored[0].data.as_ref().unwrap().get("timestamp").and_then(AttributeTree::as_str),
        Some("2000-10-10T20:55:36Z")
    );
}

#[tokio::test]
async fn documents_bypass_the_parser() {
    let seeded = Seeded::new(&["api"]).await;
    let doc: AttributeTree = json!({"level": "warn", "user": {"id": 7}}).into();

    let ack = seeded
        .ingestor_at(day(2024, 3, 1))
        .ingest_documents(&seeded.app("api").id.to_string(), vec![doc.clone()], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ack, IngestAck { stored: 1, parse_failures: 0 });
    let stored = &seeded.store.snapshot().await[0];
    assert_eq!(stored.data.as_ref(), Some(&doc));
    assert_eq!(stored.level, "WARNING");
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&stored.raw).unwrap(),
        json!({"level": "warn", "user": {"id": 7}})
    );
}

#[tokio::test]
async fn store_failure_aborts_the_whole_batch() {
    let seeded = Seeded::new(&["api"]).await;
    seeded.store.set_offline(true);

    let err = seeded
        .ingestor_at(day(2024, 3, 1))
        .ingest_lines(
            &seeded.app("api").id.to_string(),
            vec!["{}".into(), "{}".into()],
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Infrastructure(_)));
    seeded.store.set_offline(false);
    assert!(seeded.store.is_empty().await);
}

#[tokio::test]
async fn cancelled_ingestion_stores_nothing() {
    let seeded = Seeded::new(&["api"]).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = seeded
        .ingestor_at(day(2024, 3, 1))
        .ingest_lines(&seeded.app("api").id.to_string(), vec!["{}".into()], None, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(seeded.store.is_empty().await);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever the batch size and chunk width, stored order is input order.
    #[test]
    fn stored_order_is_input_order(n in 0usize..200, chunk in 1usize..40) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let raws = runtime.block_on(async {
            let store = Arc::new(MemoryStore::new());
            let mut config = Config::defaults().ingest;
            config.parallel_chunk_size = chunk;
            let ingestor = Ingestor::new(store.clone(), Arc::new(FixedClock(day(2024, 1, 1))), config);
            let lines: Vec<String> = (0..n)
                .map(|i| if i % 7 == 0 { format!("bad {i}") } else { format!(r#"{{"i":{i}}}"#) })
                .collect();
            ingestor
                .ingest_lines(&logmill_core::Id::new().to_string(), lines, None, &CancellationToken::new())
                .await
                .unwrap();
            store.snapshot().await.into_iter().map(|l| l.raw).collect::<Vec<_>>()
        });
        let expected: Vec<String> = (0..n)
            .map(|i| if i % 7 == 0 { format!("bad {i}") } else { format!(r#"{{"i":{i}}}"#) })
            .collect();
        prop_assert_eq!(raws, expected);
    }
}
