#![allow(unused)]
//! Schema inference integration harness.
//!
//! # What this covers
//!
//! - **Flattening**: the two-level rule over single and multiple documents,
//!   including the explicit cap at depth two.
//! - **Scope**: owner scope, explicit app selection (which replaces the
//!   owner scope), inclusive time ranges.
//! - **Errors**: malformed identifiers fail before the store is touched;
//!   store outages surface as `Infrastructure`; cancellation returns
//!   `Cancelled`, never a partial report.
//!
//! # Running
//!
//! ```sh
//! cargo test --test schema_harness
//! ```

mod common;
use common::*;

use logmill_core::schema::{SchemaEngine, SchemaQuery, SchemaReport};
use logmill_core::{Error, TimeRange};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn query(seeded: &Seeded) -> SchemaQuery {
    SchemaQuery {
        owner_id: seeded.owner.to_string(),
        ..Default::default()
    }
}

async fn infer(seeded: &Seeded, query: &SchemaQuery) -> Result<SchemaReport, Error> {
    SchemaEngine::new(seeded.store.clone())
        .infer_schema(query, &CancellationToken::new())
        .await
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_document_flattens_to_exact_paths() {
    let seeded = Seeded::new(&["api"]).await;
    let app = seeded.app("api").id;
    seeded
        .insert(vec![ParsedLogBuilder::new(app)
            .data(json!({"a": {"b": 1, "c": 2}, "d": 3}))
            .build()])
        .await;

    let report = infer(&seeded, &query(&seeded)).await.unwrap();
    assert_eq!(report.total, 1);
    assert_schema!(report, {"a.b" => 1, "a.c" => 1, "d" => 1});
}

#[tokio::test]
async fn counts_are_per_document() {
    let seeded = Seeded::new(&["api"]).await;
    let app = seeded.app("api").id;
    seeded
        .insert(vec![
            ParsedLogBuilder::new(app).data(json!({"user": {"id": 1}, "msg": "a"})).build(),
            ParsedLogBuilder::new(app).data(json!({"user": {"id": 2, "name": "x"}})).build(),
            ParsedLogBuilder::new(app).raw("{broken").build(),
        ])
        .await;

    let report = infer(&seeded, &query(&seeded)).await.unwrap();
    assert_eq!(report.total, 3);
    assert_schema!(report, {"msg" => 1, "user.id" => 2, "user.name" => 1});
}

#[tokio::test]
async fn third_level_is_capped() {
    let seeded = Seeded::new(&["api"]).await;
    let app = seeded.app("api").id;
    seeded
        .insert(vec![ParsedLogBuilder::new(app)
            .data(json!({"http": {"request": {"headers": {"host": "x"}}}}))
            .build()])
        .await;

    let report = infer(&seeded, &query(&seeded)).await.unwrap();
    assert_schema!(report, {"http.request" => 1});
}

#[tokio::test]
async fn empty_scope_is_an_empty_report() {
    let seeded = Seeded::new(&["api"]).await;
    let report = infer(&seeded, &query(&seeded)).await.unwrap();
    assert_eq!(report, SchemaReport::default());
    assert_eq!(serde_json::to_value(&report).unwrap(), json!({"total": 0, "schema": {}}));
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

#[tokio::test]
async fn app_ids_narrow_the_owner_scope() {
    let seeded = Seeded::new(&["api", "worker"]).await;
    let api = seeded.app("api").id;
    let worker = seeded.app("worker").id;
    seeded
        .insert(vec![
            ParsedLogBuilder::new(api).data(json!({"route": "/"})).build(),
            ParsedLogBuilder::new(worker).data(json!({"job": "x"})).build(),
        ])
        .await;

    let mut q = query(&seeded);
    q.app_ids = vec![worker.to_string()];
    let report = infer(&seeded, &q).await.unwrap();
    assert_eq!(report.total, 1);
    assert_schema!(report, {"job" => 1});
}

#[tokio::test]
async fn app_ids_select_apps_regardless_of_owner() {
    let seeded = Seeded::new(&["api"]).await;
    let api = seeded.app("api").id;
    let foreign = seeded.foreign_app("theirs").await;
    seeded
        .insert(vec![
            ParsedLogBuilder::new(api).data(json!({"route": "/"})).build(),
            ParsedLogBuilder::new(foreign.id).data(json!({"x": 1})).build(),
        ])
        .await;

    let mut q = query(&seeded);
    q.app_ids = vec![foreign.id.to_string()];
    let report = infer(&seeded, &q).await.unwrap();
    assert_eq!(report.total, 1);
    assert_schema!(report, {"x" => 1});
}

#[tokio::test]
async fn foreign_apps_stay_hidden_without_app_ids() {
    let seeded = Seeded::new(&["api"]).await;
    let foreign = seeded.foreign_app("theirs").await;
    seeded
        .insert(vec![ParsedLogBuilder::new(foreign.id).data(json!({"secret": 1})).build()])
        .await;

    let report = infer(&seeded, &query(&seeded)).await.unwrap();
    assert_eq!(report, SchemaReport::default());
}

#[tokio::test]
async fn time_range_is_inclusive() {
    let seeded = Seeded::new(&["api"]).await;
    let app = seeded.app("api").id;
    seeded
        .insert(vec![
            ParsedLogBuilder::new(app).at(day(2024, 1, 1)).data(json!({"a": 1})).build(),
            ParsedLogBuilder::new(app).at(day(2024, 1, 31)).data(json!({"b": 1})).build(),
            ParsedLogBuilder::new(app).at(day(2024, 2, 1)).data(json!({"c": 1})).build(),
        ])
        .await;

    let mut q = query(&seeded);
    q.range = Some(TimeRange::new(day(2024, 1, 1), day(2024, 1, 31)));
    let report = infer(&seeded, &q).await.unwrap();
    assert_eq!(report.total, 2);
    assert_schema!(report, {"a" => 1, "b" => 1});
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_ids_fail_before_store_access() {
    let seeded = Seeded::new(&["api"]).await;
    seeded.store.set_offline(true);

    let mut q = query(&seeded);
    q.app_ids = vec!["not-an-id".into()];
    let err = infer(&seeded, &q).await.unwrap_err();
    assert!(matches!(err, Error::InvalidIdentifier { ref value } if value == "not-an-id"));
}

#[tokio::test]
async fn store_outage_is_an_infrastructure_error() {
    let seeded = Seeded::new(&["api"]).await;
    seeded.store.set_offline(true);
    let err = infer(&seeded, &query(&seeded)).await.unwrap_err();
    assert!(matches!(err, Error::Infrastructure(_)));
}

#[tokio::test]
async fn cancelled_request_returns_no_report() {
    let seeded = Seeded::new(&["api"]).await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = SchemaEngine::new(seeded.store.clone())
        .infer_schema(&query(&seeded), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
