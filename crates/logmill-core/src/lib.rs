//! logmill-core — log ingestion and analytics engine.
//!
//! This crate holds every layer between a raw log line and an answer about
//! the logs: parsing, storage contract, querying and aggregation.
//!
//! # Architecture
//!
//! ```text
//! raw lines ──► normalizer ──► Ingestor ──► LogStore
//!                                              ▲
//!   SearchRequest ──► criteria ──► QueryPlan ──┤
//!   SchemaQuery ─────► SchemaEngine ───────────┤  (one faceted call)
//!   DashboardQuery ──► DashboardEngine ────────┘  (one faceted call)
//! ```
//!
//! The store is a trait; [`store::MemoryStore`] is the bundled
//! implementation. Every store-touching operation takes a
//! `CancellationToken` and returns [`Error::Cancelled`] rather than a partial
//! result when it fires.

pub mod clock;
pub mod config;
pub mod criteria;
pub mod dashboard;
pub mod error;
pub mod ingest;
pub mod normalizer;
pub mod schema;
pub mod search;
pub mod store;
pub mod types;

pub use error::{Error, ParseError, StoreError};
pub use types::{App, AttributeTree, Id, ParsedLog, Period, TimeRange};
